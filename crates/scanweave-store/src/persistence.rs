//! JSON snapshot persistence for the in-memory store

use crate::store::{MemoryGraphStore, NetworkGraph};
use anyhow::{Context, Result};
use scanweave_core::model::{NetworkEdge, NetworkNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Serializable form of one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub id: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub edges: Vec<NetworkEdge>,
}

/// Serializable form of the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub networks: Vec<NetworkSnapshot>,
}

impl MemoryGraphStore {
    /// Capture the current state, networks and nodes sorted for stable output
    pub async fn snapshot(&self) -> GraphSnapshot {
        let networks = self.networks.read().await;
        let mut snapshot = GraphSnapshot {
            networks: networks
                .iter()
                .map(|(id, graph)| {
                    let mut nodes: Vec<NetworkNode> = graph.nodes.values().cloned().collect();
                    nodes.sort_by(|a, b| a.address.cmp(&b.address));
                    let mut edges: Vec<NetworkEdge> = graph.edges.values().cloned().collect();
                    edges.sort_by_key(|e| e.created_at);
                    NetworkSnapshot {
                        id: id.clone(),
                        subnets: graph.subnets.clone(),
                        nodes,
                        edges,
                    }
                })
                .collect(),
        };
        snapshot.networks.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut networks = HashMap::new();
        for network in snapshot.networks {
            let graph = NetworkGraph::from_parts(network.subnets, network.nodes, network.edges);
            networks.insert(network.id, graph);
        }
        Self {
            networks: RwLock::new(networks),
        }
    }
}

/// Save the store to a JSON snapshot file
pub async fn save_snapshot(store: &MemoryGraphStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let snapshot = store.snapshot().await;
    let json = serde_json::to_string_pretty(&snapshot)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    Ok(())
}

/// Load a store from a JSON snapshot file; a missing file yields an empty store
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<MemoryGraphStore> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(MemoryGraphStore::new());
    }
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
    let snapshot: GraphSnapshot =
        serde_json::from_str(&json).with_context(|| format!("invalid snapshot in {}", path.display()))?;
    Ok(MemoryGraphStore::from_snapshot(snapshot))
}
