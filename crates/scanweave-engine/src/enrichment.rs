//! Live-activity enrichment hook

use crate::topology::to_payload;
use scanweave_core::model::{NetworkNode, NodeStatus, NodeUpsert};
use scanweave_store::events::{EventPublisher, NODE_CREATED, NODE_UPDATED};
use scanweave_store::store::{GraphStore, StoreError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Applies "node observed active" signals through the same merge-upsert as imports
pub struct Enricher {
    store: Arc<dyn GraphStore>,
    events: Arc<dyn EventPublisher>,
}

impl Enricher {
    pub fn new(store: Arc<dyn GraphStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Mark the node at `address` alive, creating it if it is not known yet
    pub async fn observe_active(
        &self,
        network_id: &str,
        address: &str,
        source: &str,
    ) -> Result<NetworkNode, StoreError> {
        self.observe_with(network_id, address, source, Map::new()).await
    }

    /// Same as [`Enricher::observe_active`], merging extra attributes from the signal
    pub async fn observe_with(
        &self,
        network_id: &str,
        address: &str,
        source: &str,
        attributes: Map<String, Value>,
    ) -> Result<NetworkNode, StoreError> {
        let mut upsert = NodeUpsert::new(address).with_status(NodeStatus::Alive);
        upsert.attributes = attributes;

        let outcome = self.store.upsert_node(network_id, upsert, source).await?;
        info!(network = network_id, address, source, created = outcome.created, "node observed active");

        let event = if outcome.created { NODE_CREATED } else { NODE_UPDATED };
        self.events.publish(event, to_payload(&outcome.node)).await;

        Ok(outcome.node)
    }
}
