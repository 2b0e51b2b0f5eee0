//! Transaction normalization and validation.
//!
//! Validation runs in two phases: a presence check over the required field
//! list, then independent per-field content checks. A request with missing
//! fields is reported on presence alone; content errors are only ever
//! reported when every required field is present.

use crate::types::report::{FieldError, ValidationReport};
use crate::types::transaction::{Channel, NormalizedTransaction};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Fields a transaction object must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 12] = [
    "transaction_id",
    "event_time_utc",
    "amount",
    "currency",
    "merchant_category",
    "channel",
    "country",
    "customer_age",
    "account_age_days",
    "transactions_last_24h",
    "avg_amount_last_7d",
    "is_international",
];

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern"));
static COUNTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("country pattern"));

/// Pull the caller's request id out of the envelope, or mint one.
///
/// A missing, non-string, or empty `request_id` yields a fresh UUIDv4 so
/// every response carries an identifier.
pub fn request_id_for(payload: &Value) -> String {
    match payload.get("request_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Validate a request envelope and normalize its transaction.
pub fn validate_request(payload: &Value) -> ValidationReport {
    let request_id = request_id_for(payload);

    let envelope_errors = check_envelope(payload);
    if !envelope_errors.is_empty() {
        return ValidationReport::invalid(request_id, envelope_errors);
    }

    // check_envelope guarantees an object here
    let Some(txn) = payload.get("transaction").and_then(Value::as_object) else {
        return ValidationReport::invalid(
            request_id,
            vec![FieldError::new("transaction", "transaction must be an object")],
        );
    };

    let mut fields = txn.clone();

    let mut errors = missing_field_errors(&fields);
    if errors.is_empty() {
        errors = normalize_fields(&mut fields);
    }

    let normalized = if errors.is_empty() {
        NormalizedTransaction::from_field_map(&fields)
    } else {
        None
    };

    let is_valid = normalized.is_some() && errors.is_empty();
    ValidationReport {
        request_id,
        is_valid,
        normalized_transaction: normalized,
        validation_errors: errors,
    }
}

/// Top-level shape check: the envelope must be an object with a `transaction`
/// object inside. Each violation is terminal and reported alone.
fn check_envelope(payload: &Value) -> Vec<FieldError> {
    let Some(envelope) = payload.as_object() else {
        return vec![FieldError::new("request", "request must be a JSON object")];
    };

    match envelope.get("transaction") {
        None => vec![FieldError::new(
            "transaction",
            "Missing required field: transaction",
        )],
        Some(txn) if !txn.is_object() => {
            vec![FieldError::new("transaction", "transaction must be an object")]
        }
        Some(_) => Vec::new(),
    }
}

/// Presence phase: one error per missing required field.
fn missing_field_errors(fields: &Map<String, Value>) -> Vec<FieldError> {
    REQUIRED_FIELDS
        .iter()
        .filter(|name| !fields.contains_key(**name))
        .map(|name| {
            FieldError::new(
                format!("transaction.{name}"),
                format!("Missing required field: {name}"),
            )
        })
        .collect()
}

/// Content phase: check every field independently and normalize values in
/// place. Normalization is applied to any field that passes its type check,
/// even when the field (or another field) is also flagged invalid.
pub(crate) fn normalize_fields(fields: &mut Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    // transaction_id
    match fields.get("transaction_id").cloned() {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            fields.insert(
                "transaction_id".to_string(),
                Value::String(s.trim().to_string()),
            );
        }
        _ => errors.push(FieldError::new(
            "transaction.transaction_id",
            "transaction_id must be a non-empty string",
        )),
    }

    // event_time_utc
    match fields.get("event_time_utc").cloned() {
        Some(Value::String(s)) => match normalize_utc_timestamp(s.trim()) {
            Some(canonical) => {
                fields.insert("event_time_utc".to_string(), Value::String(canonical));
            }
            None => errors.push(FieldError::new(
                "transaction.event_time_utc",
                "event_time_utc must be ISO 8601 (e.g., 2026-01-05T21:15:00Z)",
            )),
        },
        _ => errors.push(FieldError::new(
            "transaction.event_time_utc",
            "event_time_utc must be a string",
        )),
    }

    // amount
    match fields.get("amount").and_then(Value::as_f64) {
        Some(amount) => {
            if amount <= 0.0 {
                errors.push(FieldError::new("transaction.amount", "amount must be > 0"));
            }
            if let Some(n) = Number::from_f64(amount) {
                fields.insert("amount".to_string(), Value::Number(n));
            }
        }
        None => errors.push(FieldError::new(
            "transaction.amount",
            "amount must be a number",
        )),
    }

    // currency
    match fields.get("currency").cloned() {
        Some(Value::String(s)) => {
            let code = s.trim().to_uppercase();
            if !CURRENCY_RE.is_match(&code) {
                errors.push(FieldError::new(
                    "transaction.currency",
                    "currency must be a 3-letter uppercase code (e.g., CAD)",
                ));
            }
            fields.insert("currency".to_string(), Value::String(code));
        }
        _ => errors.push(FieldError::new(
            "transaction.currency",
            "currency must be a string",
        )),
    }

    // merchant_category
    match fields.get("merchant_category").cloned() {
        Some(Value::String(s)) => {
            let category = s.trim().to_lowercase();
            if category.is_empty() {
                errors.push(FieldError::new(
                    "transaction.merchant_category",
                    "merchant_category must not be empty",
                ));
            }
            fields.insert("merchant_category".to_string(), Value::String(category));
        }
        _ => errors.push(FieldError::new(
            "transaction.merchant_category",
            "merchant_category must be a string",
        )),
    }

    // channel
    match fields.get("channel").cloned() {
        Some(Value::String(s)) => {
            let channel = s.trim().to_lowercase();
            if Channel::parse(&channel).is_none() {
                let accepted: Vec<&str> = Channel::ALL.iter().map(|c| c.as_str()).collect();
                errors.push(FieldError::new(
                    "transaction.channel",
                    format!("channel must be one of: {}", accepted.join(", ")),
                ));
            }
            fields.insert("channel".to_string(), Value::String(channel));
        }
        _ => errors.push(FieldError::new(
            "transaction.channel",
            "channel must be a string",
        )),
    }

    // country
    match fields.get("country").cloned() {
        Some(Value::String(s)) => {
            let code = s.trim().to_uppercase();
            if !COUNTRY_RE.is_match(&code) {
                errors.push(FieldError::new(
                    "transaction.country",
                    "country must be a 2-letter uppercase code (e.g., CA)",
                ));
            }
            fields.insert("country".to_string(), Value::String(code));
        }
        _ => errors.push(FieldError::new(
            "transaction.country",
            "country must be a string",
        )),
    }

    // customer_age
    match fields.get("customer_age").and_then(Value::as_i64) {
        Some(age) => {
            if !(13..=120).contains(&age) {
                errors.push(FieldError::new(
                    "transaction.customer_age",
                    "customer_age must be between 13 and 120",
                ));
            }
        }
        None => errors.push(FieldError::new(
            "transaction.customer_age",
            "customer_age must be an integer",
        )),
    }

    // account_age_days
    match fields.get("account_age_days").and_then(Value::as_i64) {
        Some(days) => {
            if days < 0 {
                errors.push(FieldError::new(
                    "transaction.account_age_days",
                    "account_age_days must be >= 0",
                ));
            }
        }
        None => errors.push(FieldError::new(
            "transaction.account_age_days",
            "account_age_days must be an integer",
        )),
    }

    // transactions_last_24h
    match fields.get("transactions_last_24h").and_then(Value::as_i64) {
        Some(count) => {
            if count < 0 {
                errors.push(FieldError::new(
                    "transaction.transactions_last_24h",
                    "transactions_last_24h must be >= 0",
                ));
            }
        }
        None => errors.push(FieldError::new(
            "transaction.transactions_last_24h",
            "transactions_last_24h must be an integer",
        )),
    }

    // avg_amount_last_7d
    match fields.get("avg_amount_last_7d").and_then(Value::as_f64) {
        Some(avg) => {
            if avg < 0.0 {
                errors.push(FieldError::new(
                    "transaction.avg_amount_last_7d",
                    "avg_amount_last_7d must be >= 0",
                ));
            }
            if let Some(n) = Number::from_f64(avg) {
                fields.insert("avg_amount_last_7d".to_string(), Value::Number(n));
            }
        }
        None => errors.push(FieldError::new(
            "transaction.avg_amount_last_7d",
            "avg_amount_last_7d must be a number",
        )),
    }

    // is_international
    if fields.get("is_international").and_then(Value::as_bool).is_none() {
        errors.push(FieldError::new(
            "transaction.is_international",
            "is_international must be a boolean",
        ));
    }

    errors
}

/// Parse an ISO-8601 timestamp, convert to UTC, truncate to whole seconds,
/// and re-serialize with a trailing `Z`.
///
/// A timestamp without an offset is taken as UTC. A bare date is taken as
/// midnight UTC.
fn normalize_utc_timestamp(raw: &str) -> Option<String> {
    let utc: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)?.and_utc()
    } else {
        return None;
    };

    Some(utc.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
