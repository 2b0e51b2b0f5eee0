//! NATS subscriptions for the validation and scoring request subjects

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::stream::{self, Select};
use tracing::info;

/// Which engine an inbound envelope is destined for, decided by the subject
/// it arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFlow {
    Validation,
    Scoring,
}

/// Consumer over both request subjects of the service.
pub struct RequestConsumer {
    client: Client,
    validation_subject: String,
    scoring_subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, validation_subject: &str, scoring_subject: &str) -> Self {
        Self {
            client,
            validation_subject: validation_subject.to_string(),
            scoring_subject: scoring_subject.to_string(),
        }
    }

    /// Subscribe to both request subjects, merged into a single stream.
    pub async fn subscribe(&self) -> Result<Select<Subscriber, Subscriber>> {
        let validation = self
            .client
            .subscribe(self.validation_subject.clone())
            .await?;
        let scoring = self.client.subscribe(self.scoring_subject.clone()).await?;
        info!(
            validation_subject = %self.validation_subject,
            scoring_subject = %self.scoring_subject,
            "Subscribed to request subjects"
        );
        Ok(stream::select(validation, scoring))
    }

    /// Classify a message by its subject. Anything that is not the scoring
    /// subject came through the validation subscription.
    pub fn flow_of(&self, subject: &str) -> RequestFlow {
        if subject == self.scoring_subject {
            RequestFlow::Scoring
        } else {
            RequestFlow::Validation
        }
    }

    pub fn validation_subject(&self) -> &str {
        &self.validation_subject
    }

    pub fn scoring_subject(&self) -> &str {
        &self.scoring_subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
