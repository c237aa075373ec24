//! Node and edge store with merge-upsert semantics

use crate::provenance::apply_upsert;
use async_trait::async_trait;
use chrono::Utc;
use scanweave_core::model::{NetworkEdge, NetworkNode, NewEdge, NodeUpsert};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Result of a node merge-upsert
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub node: NetworkNode,
    pub created: bool,
    /// Top-level fields written by this upsert
    pub touched: Vec<String>,
}

/// Result of an existence-checked edge insert
#[derive(Debug, Clone)]
pub struct EdgeOutcome {
    pub edge: NetworkEdge,
    pub created: bool,
}

/// Store operation errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Node {node_id} not found in network '{network_id}'")]
    NodeNotFound { network_id: String, node_id: Uuid },

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence collaborator for network graphs.
///
/// Both write paths are idempotent: nodes are keyed by (network, address) and
/// edges by (network, source, target), so concurrent writers cannot create
/// duplicates.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merge incoming facts into the node at `upsert.address`, creating it if absent
    async fn upsert_node(
        &self,
        network_id: &str,
        upsert: NodeUpsert,
        source: &str,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn get_node_by_address(
        &self,
        network_id: &str,
        address: &str,
    ) -> Result<Option<NetworkNode>, StoreError>;

    async fn list_nodes(&self, network_id: &str) -> Result<Vec<NetworkNode>, StoreError>;

    /// Insert an edge unless one with the same (source, target) already exists
    async fn create_edge(&self, network_id: &str, edge: NewEdge) -> Result<EdgeOutcome, StoreError>;

    async fn list_edges(&self, network_id: &str) -> Result<Vec<NetworkEdge>, StoreError>;

    /// Configured CIDR ranges for a network
    async fn network_subnets(&self, network_id: &str) -> Result<Vec<String>, StoreError>;
}

/// Per-network graph state
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    pub subnets: Vec<String>,
    /// Nodes keyed by address
    pub nodes: HashMap<String, NetworkNode>,
    /// Edges keyed by (source, target)
    pub edges: HashMap<(Uuid, Uuid), NetworkEdge>,
    /// Ids of every node in `nodes`
    node_ids: HashSet<Uuid>,
}

impl NetworkGraph {
    /// Build a graph from stored nodes and edges
    pub fn from_parts(
        subnets: Vec<String>,
        nodes: impl IntoIterator<Item = NetworkNode>,
        edges: impl IntoIterator<Item = NetworkEdge>,
    ) -> Self {
        let nodes: HashMap<String, NetworkNode> = nodes.into_iter().map(|n| (n.address.clone(), n)).collect();
        let node_ids = nodes.values().map(|n| n.id).collect();
        Self {
            subnets,
            nodes,
            edges: edges.into_iter().map(|e| ((e.source_id, e.target_id), e)).collect(),
            node_ids,
        }
    }

    fn contains_node(&self, node_id: Uuid) -> bool {
        self.node_ids.contains(&node_id)
    }
}

/// In-memory graph store
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    pub(crate) networks: RwLock<HashMap<String, NetworkGraph>>,
}

impl MemoryGraphStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            networks: RwLock::new(HashMap::new()),
        }
    }

    /// Configure the address ranges used for subnet edge synthesis
    pub async fn set_network_subnets(&self, network_id: &str, subnets: Vec<String>) {
        let mut networks = self.networks.write().await;
        networks.entry(network_id.to_string()).or_default().subnets = subnets;
    }

    /// Get statistics
    pub async fn statistics(&self) -> StoreStatistics {
        let networks = self.networks.read().await;
        StoreStatistics {
            network_count: networks.len(),
            total_nodes: networks.values().map(|g| g.nodes.len()).sum(),
            total_edges: networks.values().map(|g| g.edges.len()).sum(),
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_node(
        &self,
        network_id: &str,
        upsert: NodeUpsert,
        source: &str,
    ) -> Result<UpsertOutcome, StoreError> {
        let address = upsert.address.trim().to_string();
        if address.is_empty() {
            return Err(StoreError::InvalidNode("empty address".to_string()));
        }

        let mut networks = self.networks.write().await;
        let graph = networks.entry(network_id.to_string()).or_default();

        let created = !graph.nodes.contains_key(&address);
        let node = graph
            .nodes
            .entry(address.clone())
            .or_insert_with(|| NetworkNode::new(network_id, &address));
        let touched = apply_upsert(node, upsert, source, created, Utc::now());
        let node = node.clone();
        if created {
            graph.node_ids.insert(node.id);
        }

        debug!(network = network_id, address = %address, created, "node upserted");

        Ok(UpsertOutcome {
            node,
            created,
            touched,
        })
    }

    async fn get_node_by_address(
        &self,
        network_id: &str,
        address: &str,
    ) -> Result<Option<NetworkNode>, StoreError> {
        let networks = self.networks.read().await;
        Ok(networks
            .get(network_id)
            .and_then(|g| g.nodes.get(address.trim()))
            .cloned())
    }

    async fn list_nodes(&self, network_id: &str) -> Result<Vec<NetworkNode>, StoreError> {
        let networks = self.networks.read().await;
        let mut nodes: Vec<NetworkNode> = networks
            .get(network_id)
            .map(|g| g.nodes.values().cloned().collect())
            .unwrap_or_default();
        nodes.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(nodes)
    }

    async fn create_edge(&self, network_id: &str, edge: NewEdge) -> Result<EdgeOutcome, StoreError> {
        if edge.source_id == edge.target_id {
            return Err(StoreError::InvalidEdge("self-loop".to_string()));
        }

        let mut networks = self.networks.write().await;
        let graph = networks.entry(network_id.to_string()).or_default();

        for node_id in [edge.source_id, edge.target_id] {
            if !graph.contains_node(node_id) {
                return Err(StoreError::NodeNotFound {
                    network_id: network_id.to_string(),
                    node_id,
                });
            }
        }

        let key = (edge.source_id, edge.target_id);
        if let Some(existing) = graph.edges.get(&key) {
            return Ok(EdgeOutcome {
                edge: existing.clone(),
                created: false,
            });
        }

        let stored = NetworkEdge {
            id: Uuid::new_v4(),
            network_id: network_id.to_string(),
            source_id: edge.source_id,
            target_id: edge.target_id,
            kind: edge.kind,
            label: edge.label,
            confidence: edge.confidence,
            source: edge.source,
            created_at: Utc::now(),
        };
        graph.edges.insert(key, stored.clone());

        Ok(EdgeOutcome {
            edge: stored,
            created: true,
        })
    }

    async fn list_edges(&self, network_id: &str) -> Result<Vec<NetworkEdge>, StoreError> {
        let networks = self.networks.read().await;
        let mut edges: Vec<NetworkEdge> = networks
            .get(network_id)
            .map(|g| g.edges.values().cloned().collect())
            .unwrap_or_default();
        edges.sort_by_key(|e| e.created_at);
        Ok(edges)
    }

    async fn network_subnets(&self, network_id: &str) -> Result<Vec<String>, StoreError> {
        let networks = self.networks.read().await;
        Ok(networks
            .get(network_id)
            .map(|g| g.subnets.clone())
            .unwrap_or_default())
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub network_count: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
}
