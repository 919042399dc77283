//! Messaging seam: announces stored collections to downstream consumers.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::collection::DataCollectedMessage;
use crate::error::{IngestionError, Result};

pub const DEFAULT_EXCHANGE: &str = "data_collected";
pub const DEFAULT_ROUTING_KEY: &str = "data.collected";

#[async_trait]
pub trait CollectionPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, message: &DataCollectedMessage) -> Result<()>;
}

/// A message as it left the publisher: already serialised, tagged with its route.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Value,
}

/// Fans messages out over a tokio broadcast channel. Having no subscribers is fine.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    exchange: String,
    tx: broadcast::Sender<PublishedMessage>,
}

impl BroadcastPublisher {
    pub fn new(exchange: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            exchange: exchange.into(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EXCHANGE, 256)
    }
}

#[async_trait]
impl CollectionPublisher for BroadcastPublisher {
    async fn publish(&self, routing_key: &str, message: &DataCollectedMessage) -> Result<()> {
        let payload = serde_json::to_value(message)
            .map_err(|e| IngestionError::Publish(format!("failed to serialise message: {}", e)))?;

        let published = PublishedMessage {
            exchange: self.exchange.clone(),
            routing_key: routing_key.to_string(),
            payload,
        };

        match self.tx.send(published) {
            Ok(receivers) => info!(
                collection_id = %message.collection_id,
                source_type = %message.source_type,
                exchange = %self.exchange,
                routing_key,
                receivers,
                "Published data-collected message"
            ),
            Err(_) => debug!(
                collection_id = %message.collection_id,
                "No subscribers for data-collected message"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use uuid::Uuid;

    fn message() -> DataCollectedMessage {
        DataCollectedMessage {
            content: "text".into(),
            metadata: Metadata::new(),
            collection_id: Uuid::new_v4(),
            source_type: "pubmed".into(),
            generation_params: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_payload() {
        let publisher = BroadcastPublisher::default();
        let mut rx = publisher.subscribe();
        let msg = message();
        publisher.publish(DEFAULT_ROUTING_KEY, &msg).await.unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.exchange, "data_collected");
        assert_eq!(got.routing_key, "data.collected");
        assert_eq!(got.payload["source_type"], "pubmed");
        assert_eq!(got.payload["collection_id"], serde_json::json!(msg.collection_id));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new("x", 0);
        assert!(publisher.publish("k", &message()).await.is_ok());
    }
}
