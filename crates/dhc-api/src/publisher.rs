//! Event bus seam
//!
//! The broker client is an external collaborator; the pipelines only need a
//! publish call that completes after the message record is committed. The
//! default wired implementation logs the payload, which is enough for
//! environments without a broker.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Routing key for inbound clinical messages (SCTID 24891000000101,
/// EDI message record artifact)
pub const INBOUND_ROUTING_KEY: &str = "dhos.24891000000101";

#[derive(Error, Debug)]
#[error("Failed to publish event: {0}")]
pub struct PublishError(pub String);

/// Publisher of internal platform events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, body: &Value) -> Result<(), PublishError>;
}

/// Publisher that writes the event to the log and discards it
#[derive(Default)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, routing_key: &str, body: &Value) -> Result<(), PublishError> {
        tracing::info!(routing_key, %body, "Publishing internal event");
        Ok(())
    }
}
