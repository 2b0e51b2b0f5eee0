//! NATS message producer for validation reports and score results

use anyhow::Result;
use async_nats::Client;
use serde::Serialize;
use tracing::debug;

/// Producer for publishing request results to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    /// Create a new result producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a result to the configured result subject
    pub async fn publish<T: Serialize>(&self, result: &T) -> Result<()> {
        let payload = serde_json::to_vec(result)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(subject = %self.subject, "Published result");

        Ok(())
    }

    /// Send a result to a request's reply subject
    pub async fn respond<T: Serialize>(&self, reply_subject: String, result: &T) -> Result<()> {
        let payload = serde_json::to_vec(result)?;

        self.client
            .publish(reply_subject.clone(), payload.into())
            .await?;

        debug!(subject = %reply_subject, "Replied with result");

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
