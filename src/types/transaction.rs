//! Canonical transaction record produced by the validation engine

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Channel a transaction was initiated through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Atm,
    CardNotPresent,
    CardPresent,
    Online,
    Transfer,
}

impl Channel {
    /// All accepted channels, in name order.
    pub const ALL: [Channel; 5] = [
        Channel::Atm,
        Channel::CardNotPresent,
        Channel::CardPresent,
        Channel::Online,
        Channel::Transfer,
    ];

    /// Parse an already lower-cased channel string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "atm" => Some(Channel::Atm),
            "card_not_present" => Some(Channel::CardNotPresent),
            "card_present" => Some(Channel::CardPresent),
            "online" => Some(Channel::Online),
            "transfer" => Some(Channel::Transfer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Atm => "atm",
            Channel::CardNotPresent => "card_not_present",
            Channel::CardPresent => "card_present",
            Channel::Online => "online",
            Channel::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction that passed validation, with every field coerced to its
/// canonical type and casing.
///
/// Exists iff validation produced zero field errors; constructed once per
/// request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Non-empty, whitespace-trimmed identifier
    pub transaction_id: String,

    /// UTC timestamp at second precision, `Z`-suffixed
    pub event_time_utc: String,

    /// Transaction amount, strictly positive
    pub amount: f64,

    /// 3-letter uppercase currency code
    pub currency: String,

    /// Lowercase, trimmed, non-empty merchant category
    pub merchant_category: String,

    /// Initiation channel
    pub channel: Channel,

    /// 2-letter uppercase country code
    pub country: String,

    /// Customer age in years, within [13, 120]
    pub customer_age: i64,

    /// Account age in days, non-negative
    pub account_age_days: i64,

    /// Transactions seen in the trailing 24 hours
    pub transactions_last_24h: i64,

    /// Average amount over the trailing 7 days
    pub avg_amount_last_7d: f64,

    /// Whether the transaction crosses the account's home country
    pub is_international: bool,
}

impl NormalizedTransaction {
    /// Build a record from a field map whose values already passed
    /// normalization. Returns `None` if any field is absent or off-type.
    pub(crate) fn from_field_map(fields: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            transaction_id: fields.get("transaction_id")?.as_str()?.to_string(),
            event_time_utc: fields.get("event_time_utc")?.as_str()?.to_string(),
            amount: fields.get("amount")?.as_f64()?,
            currency: fields.get("currency")?.as_str()?.to_string(),
            merchant_category: fields.get("merchant_category")?.as_str()?.to_string(),
            channel: Channel::parse(fields.get("channel")?.as_str()?)?,
            country: fields.get("country")?.as_str()?.to_string(),
            customer_age: fields.get("customer_age")?.as_i64()?,
            account_age_days: fields.get("account_age_days")?.as_i64()?,
            transactions_last_24h: fields.get("transactions_last_24h")?.as_i64()?,
            avg_amount_last_7d: fields.get("avg_amount_last_7d")?.as_f64()?,
            is_international: fields.get("is_international")?.as_bool()?,
        })
    }

    /// Render the record back into a JSON field map, the shape the feature
    /// encoder consumes.
    pub fn to_field_map(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "transaction_id".to_string(),
            Value::String(self.transaction_id.clone()),
        );
        fields.insert(
            "event_time_utc".to_string(),
            Value::String(self.event_time_utc.clone()),
        );
        fields.insert("amount".to_string(), json!(self.amount));
        fields.insert("currency".to_string(), Value::String(self.currency.clone()));
        fields.insert(
            "merchant_category".to_string(),
            Value::String(self.merchant_category.clone()),
        );
        fields.insert(
            "channel".to_string(),
            Value::String(self.channel.as_str().to_string()),
        );
        fields.insert("country".to_string(), Value::String(self.country.clone()));
        fields.insert("customer_age".to_string(), json!(self.customer_age));
        fields.insert("account_age_days".to_string(), json!(self.account_age_days));
        fields.insert(
            "transactions_last_24h".to_string(),
            json!(self.transactions_last_24h),
        );
        fields.insert(
            "avg_amount_last_7d".to_string(),
            json!(self.avg_amount_last_7d),
        );
        fields.insert("is_international".to_string(), json!(self.is_international));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NormalizedTransaction {
        NormalizedTransaction {
            transaction_id: "t1".to_string(),
            event_time_utc: "2026-01-05T21:15:00Z".to_string(),
            amount: 120.5,
            currency: "CAD".to_string(),
            merchant_category: "grocery".to_string(),
            channel: Channel::CardPresent,
            country: "CA".to_string(),
            customer_age: 34,
            account_age_days: 900,
            transactions_last_24h: 2,
            avg_amount_last_7d: 80.0,
            is_international: false,
        }
    }

    #[test]
    fn test_channel_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::parse(channel.as_str()), Some(channel));
        }
        assert_eq!(Channel::parse("wire"), None);
    }

    #[test]
    fn test_channel_serde_uses_snake_case() {
        let json = serde_json::to_string(&Channel::CardNotPresent).unwrap();
        assert_eq!(json, "\"card_not_present\"");
    }

    #[test]
    fn test_field_map_round_trip() {
        let tx = sample();
        let map = tx.to_field_map();

        assert_eq!(map.len(), 12);
        assert_eq!(map["channel"], Value::String("card_present".to_string()));

        let rebuilt = NormalizedTransaction::from_field_map(&map).unwrap();
        assert_eq!(rebuilt, tx);
    }

    #[test]
    fn test_transaction_serialization() {
        let tx = sample();

        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: NormalizedTransaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx, deserialized);
    }
}
