//! Test Request Producer
//!
//! Generates and publishes scoring request envelopes to NATS for service
//! testing.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Transaction structure matching the service's expected schema
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionPayload {
    transaction_id: String,
    event_time_utc: String,
    amount: f64,
    currency: String,
    merchant_category: String,
    channel: String,
    country: String,
    customer_age: i64,
    account_age_days: i64,
    transactions_last_24h: i64,
    avg_amount_last_7d: f64,
    is_international: bool,
}

/// Envelope wrapping a transaction for the scoring and validation flows
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestEnvelope {
    request_id: String,
    transaction: TransactionPayload,
}

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    /// Generate a random ordinary-looking request
    fn generate_ordinary(&mut self) -> RequestEnvelope {
        self.request_counter += 1;

        let transaction = TransactionPayload {
            transaction_id: format!("tx_{:012}", self.request_counter),
            event_time_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            amount: self.rng.gen_range(10.0..500.0),
            currency: self.random_choice(&["USD", "EUR", "GBP", "CAD"]).to_string(),
            merchant_category: self
                .random_choice(&["grocery", "restaurant", "fuel", "pharmacy", "retail"])
                .to_string(),
            channel: self
                .random_choice(&["card_present", "card_not_present", "online"])
                .to_string(),
            country: self.random_choice(&["US", "GB", "CA", "DE", "FR"]).to_string(),
            customer_age: self.rng.gen_range(18..75),
            account_age_days: self.rng.gen_range(30..3000),
            transactions_last_24h: self.rng.gen_range(0..5),
            avg_amount_last_7d: self.rng.gen_range(20.0..300.0),
            is_international: self.rng.gen_bool(0.1),
        };

        RequestEnvelope {
            request_id: format!("req_{:012}", self.request_counter),
            transaction,
        }
    }

    /// Generate a suspicious-looking request
    fn generate_suspicious(&mut self) -> RequestEnvelope {
        self.request_counter += 1;

        let transaction = TransactionPayload {
            transaction_id: format!("tx_{:012}", self.request_counter),
            event_time_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            amount: self.rng.gen_range(1000.0..10000.0), // High amount
            currency: self.random_choice(&["USD", "EUR"]).to_string(),
            merchant_category: self
                .random_choice(&["electronics", "jewelry", "gift_cards"])
                .to_string(),
            channel: self
                .random_choice(&["online", "card_not_present"])
                .to_string(),
            country: self.random_choice(&["RO", "NG", "US"]).to_string(),
            customer_age: self.rng.gen_range(18..40),
            account_age_days: self.rng.gen_range(0..30), // New account
            transactions_last_24h: self.rng.gen_range(10..50), // High velocity
            avg_amount_last_7d: self.rng.gen_range(20.0..100.0),
            is_international: true,
        };

        RequestEnvelope {
            request_id: format!("req_{:012}", self.request_counter),
            transaction,
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("transactions.score");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let suspicious_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        suspicious_rate = suspicious_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, suspicious_rate, delay_ms).await;
        }
    };

    // Generate and publish requests
    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} requests...", count);

    let mut ordinary_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let envelope = if rng.gen_bool(suspicious_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            ordinary_count += 1;
            generator.generate_ordinary()
        };

        let payload = serde_json::to_vec(&envelope)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} ordinary, {} suspicious)",
                i + 1,
                count,
                ordinary_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Published {} requests ({} ordinary, {} suspicious)",
        count, ordinary_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, suspicious_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let envelope = if rng.gen_bool(suspicious_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_ordinary()
        };

        let json = serde_json::to_string_pretty(&envelope)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
