//! Named event publication

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

pub const NODE_CREATED: &str = "node.created";
pub const NODE_UPDATED: &str = "node.updated";
pub const EDGE_CREATED: &str = "edge.created";
pub const IMPORT_COMPLETED: &str = "import.completed";

/// "Publish named event with payload" capability
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &str, payload: serde_json::Value);
}

/// Publishes events as structured log lines
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &str, payload: serde_json::Value) {
        info!(event, payload = %payload, "event published");
    }
}

/// Discards every event
#[derive(Debug, Clone, Default)]
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish(&self, _event: &str, _payload: serde_json::Value) {}
}

/// A captured event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

/// Keeps every event in memory, in publication order
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<PublishedEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().await.clone()
    }

    /// Number of captured events with the given name
    pub async fn count(&self, name: &str) -> usize {
        self.events.lock().await.iter().filter(|e| e.name == name).count()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &str, payload: serde_json::Value) {
        self.events.lock().await.push(PublishedEvent {
            name: event.to_string(),
            payload,
            published_at: Utc::now(),
        });
    }
}
