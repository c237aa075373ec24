//! Topology inference sweep
//!
//! Runs once per import after every record is persisted:
//! - trace-derived edges between adjacent hops of each ordered sequence
//! - subnet synthesis from the network's configured ranges (hub or star)
//! - connection-pair edges between two extracted address fields
//!
//! Every edge write is existence-checked by the store, so a hop pair seen in
//! several traces, or a re-run of the same import, never duplicates an edge.

use crate::config::TopologyConfig;
use ipnet::IpNet;
use scanweave_core::definition::EdgeMapping;
use scanweave_core::model::{is_placeholder, DeviceType, EdgeKind, EdgeSource, NetworkNode, NewEdge, NodeStatus, NodeUpsert};
use scanweave_import::TraceSequence;
use scanweave_store::events::{EventPublisher, EDGE_CREATED, NODE_CREATED};
use scanweave_store::store::{GraphStore, StoreError};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Counters produced by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    pub edges_created: usize,
    /// Nodes created for hops or pair endpoints that were not in the store
    pub nodes_created: usize,
    /// Adjacent hop pairs considered, created or not
    pub trace_pairs: usize,
    pub subnet_groups: usize,
    /// Hub-less groups left without edges by the size guard
    pub groups_suppressed: usize,
}

/// A trace observed on one record, with the address of the record it came from
#[derive(Debug, Clone)]
pub struct ObservedTrace {
    pub target: String,
    pub sequence: TraceSequence,
}

/// How the subnet pass connects one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPlan {
    /// Router/firewall member at this index connects to all others
    Hub(usize),
    /// Lowest-address member at this index is the star center
    Star(usize),
    /// Too few members to connect
    Isolated,
    /// Large hub-less group: no edges
    Suppressed,
}

/// Decide how a subnet group is connected; members must be sorted by address
pub fn plan_group(members: &[NetworkNode], star_threshold: usize) -> GroupPlan {
    if members.len() < 2 {
        return GroupPlan::Isolated;
    }
    if let Some(hub) = members.iter().position(|n| n.device_type.is_gateway()) {
        return GroupPlan::Hub(hub);
    }
    if members.len() < star_threshold {
        GroupPlan::Star(0)
    } else {
        GroupPlan::Suppressed
    }
}

/// Graph writes for the sweep, sharing counters across passes
pub struct TopologySweep<'a> {
    store: &'a dyn GraphStore,
    events: &'a dyn EventPublisher,
    config: &'a TopologyConfig,
    network_id: &'a str,
    source_tag: &'a str,
    stats: SweepStats,
}

impl<'a> TopologySweep<'a> {
    pub fn new(
        store: &'a dyn GraphStore,
        events: &'a dyn EventPublisher,
        config: &'a TopologyConfig,
        network_id: &'a str,
        source_tag: &'a str,
    ) -> Self {
        Self {
            store,
            events,
            config,
            network_id,
            source_tag,
            stats: SweepStats::default(),
        }
    }

    pub fn stats(&self) -> SweepStats {
        self.stats
    }

    /// Materialize edges between adjacent hops; a placeholder hop breaks the chain
    pub async fn trace_edges(&mut self, traces: &[ObservedTrace], mappings: &[EdgeMapping]) {
        for trace in traces {
            let Some(mapping) = mappings.get(trace.sequence.mapping_index) else {
                continue;
            };

            let mut hops = trace.sequence.hops.clone();
            if mapping.include_target && hops.last().is_some_and(|last| last.trim() != trace.target) {
                hops.push(trace.target.clone());
            }

            let hop_type = mapping.hop_type.unwrap_or(self.config.default_hop_type);
            let confidence = mapping.confidence.unwrap_or(self.config.trace_confidence);

            for pair in hops.windows(2) {
                let (from, to) = (pair[0].trim(), pair[1].trim());
                if is_placeholder(from) || is_placeholder(to) || from == to {
                    continue;
                }
                self.stats.trace_pairs += 1;

                let Some(source) = self.ensure_node(from, hop_type).await else {
                    continue;
                };
                let Some(target) = self.ensure_node(to, hop_type).await else {
                    continue;
                };

                let mut edge = NewEdge::new(source.id, target.id, confidence)
                    .with_kind(mapping.kind)
                    .with_source(EdgeSource::Import);
                if let Some(label) = &mapping.label {
                    edge = edge.with_label(label.clone());
                }
                self.create_edge(edge).await;
            }
        }
    }

    /// Connect nodes inside each configured range through a hub or a small star
    pub async fn subnet_edges(&mut self) -> Result<(), StoreError> {
        let subnets = self.store.network_subnets(self.network_id).await?;
        if subnets.is_empty() {
            return Ok(());
        }
        let nodes = self.store.list_nodes(self.network_id).await?;

        for subnet in &subnets {
            let net: IpNet = match subnet.trim().parse() {
                Ok(net) => net,
                Err(e) => {
                    warn!(network = self.network_id, subnet = %subnet, error = %e, "ignoring invalid subnet");
                    continue;
                }
            };

            let mut members: Vec<(IpAddr, &NetworkNode)> = nodes
                .iter()
                .filter_map(|node| node.address.parse::<IpAddr>().ok().map(|ip| (ip, node)))
                .filter(|(ip, _)| net.contains(ip))
                .collect();
            members.sort_by_key(|(ip, _)| *ip);
            let members: Vec<NetworkNode> = members.into_iter().map(|(_, node)| node.clone()).collect();

            self.stats.subnet_groups += 1;
            let (center, confidence, label) = match plan_group(&members, self.config.star_threshold) {
                GroupPlan::Hub(index) => (index, self.config.hub_confidence, "subnet-gateway"),
                GroupPlan::Star(index) => (index, self.config.star_confidence, "subnet-star"),
                GroupPlan::Isolated => continue,
                GroupPlan::Suppressed => {
                    debug!(
                        network = self.network_id,
                        subnet = %net,
                        members = members.len(),
                        "no gateway in large subnet, skipping edge synthesis"
                    );
                    self.stats.groups_suppressed += 1;
                    continue;
                }
            };

            let hub = members[center].id;
            for member in members.iter().filter(|m| m.id != hub) {
                let edge = NewEdge::new(hub, member.id, confidence)
                    .with_kind(EdgeKind::Adjacency)
                    .with_label(label)
                    .with_source(EdgeSource::Import);
                self.create_edge(edge).await;
            }
        }

        Ok(())
    }

    /// One edge per (source, target) address pair; unseen endpoints become unknown nodes
    pub async fn pair_edges(&mut self, pairs: &[(String, String)], kind: EdgeKind, confidence: Option<f64>, label: Option<&str>) {
        let confidence = confidence.unwrap_or(self.config.pair_confidence);
        for (from, to) in pairs {
            let (from, to) = (from.trim(), to.trim());
            if is_placeholder(from) || is_placeholder(to) || from == to {
                continue;
            }
            let Some(source) = self.ensure_node(from, DeviceType::Unknown).await else {
                continue;
            };
            let Some(target) = self.ensure_node(to, DeviceType::Unknown).await else {
                continue;
            };

            let mut edge = NewEdge::new(source.id, target.id, confidence)
                .with_kind(kind)
                .with_source(EdgeSource::Import);
            if let Some(label) = label {
                edge = edge.with_label(label);
            }
            self.create_edge(edge).await;
        }
    }

    /// Look a node up by address, creating a discovered node of the given type if absent
    async fn ensure_node(&mut self, address: &str, device_type: DeviceType) -> Option<NetworkNode> {
        match self.store.get_node_by_address(self.network_id, address).await {
            Ok(Some(node)) => return Some(node),
            Ok(None) => {}
            Err(e) => {
                warn!(network = self.network_id, address, error = %e, "node lookup failed");
                return None;
            }
        }

        let upsert = NodeUpsert::new(address)
            .with_status(NodeStatus::Discovered)
            .with_device_type(device_type);
        match self.store.upsert_node(self.network_id, upsert, self.source_tag).await {
            Ok(outcome) => {
                if outcome.created {
                    self.stats.nodes_created += 1;
                    self.events.publish(NODE_CREATED, to_payload(&outcome.node)).await;
                }
                Some(outcome.node)
            }
            Err(e) => {
                warn!(network = self.network_id, address, error = %e, "failed to create inferred node");
                None
            }
        }
    }

    async fn create_edge(&mut self, edge: NewEdge) -> Option<Uuid> {
        match self.store.create_edge(self.network_id, edge).await {
            Ok(outcome) if outcome.created => {
                self.stats.edges_created += 1;
                self.events.publish(EDGE_CREATED, to_payload(&outcome.edge)).await;
                Some(outcome.edge.id)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(network = self.network_id, error = %e, "edge creation failed");
                None
            }
        }
    }

    pub fn log_summary(&self) {
        info!(
            network = self.network_id,
            edges_created = self.stats.edges_created,
            nodes_created = self.stats.nodes_created,
            trace_pairs = self.stats.trace_pairs,
            subnet_groups = self.stats.subnet_groups,
            groups_suppressed = self.stats.groups_suppressed,
            "topology sweep complete"
        );
    }
}

pub(crate) fn to_payload<T: Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
}
