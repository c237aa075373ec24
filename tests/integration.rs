// Integration tests for scanweave components
// These tests run imports end to end across the store, import and engine crates

#![cfg(test)]

use scanweave_core::model::{DeviceType, NodeStatus};
use scanweave_engine::{Enricher, ImportEngine, ImportRequest};
use scanweave_store::events::{NODE_CREATED, NODE_UPDATED};
use scanweave_store::{
    load_snapshot, save_snapshot, EventPublisher, GraphStore, InMemoryDefinitionStore, MemoryGraphStore,
    RecordingEventPublisher,
};
use std::sync::Arc;

const NMAP_SCAN: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap" args="nmap -sV --traceroute 10.0.0.0/24">
  <host>
    <status state="up"/>
    <address addr="10.0.0.1" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="179"><state state="open"/><service name="bgp"/></port></ports>
  </host>
  <host>
    <status state="up"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <hostnames><hostname name="db01"/></hostnames>
    <ports>
      <port protocol="tcp" portid="22"><state state="open"/><service name="ssh" product="OpenSSH"/></port>
      <port protocol="tcp" portid="5432"><state state="open"/><service name="postgresql"/></port>
    </ports>
    <trace>
      <hop ttl="2" ipaddr="10.0.0.5"/>
      <hop ttl="1" ipaddr="10.0.0.1"/>
    </trace>
  </host>
</nmaprun>
"#;

const INVENTORY_DEFINITION: &str = r#"{
    "id": "cmdb-json",
    "name": "CMDB export",
    "grammar": "json",
    "root_path": "assets",
    "field_mappings": [
        {"source": "ip", "target": "ip_address"},
        {"source": "name", "target": "hostname"},
        {"source": "state", "target": "status"},
        {"source": "owner", "target": "owner"},
        {"source": "role", "target": "device_type"}
    ]
}"#;

fn engine(store: Arc<MemoryGraphStore>, events: Arc<RecordingEventPublisher>) -> ImportEngine {
    let definitions = InMemoryDefinitionStore::from_json_str(INVENTORY_DEFINITION).unwrap();
    ImportEngine::new(store, Arc::new(definitions), events)
}

#[tokio::test]
async fn test_end_to_end_nmap_import_with_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("graph.json");

    let store = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(RecordingEventPublisher::new());
    let summary = engine(store.clone(), events.clone())
        .import(ImportRequest::new("lab", NMAP_SCAN))
        .await
        .unwrap();

    assert_eq!(summary.definition_id, "builtin-nmap-xml");
    assert_eq!(summary.nodes_created, 2);
    assert_eq!(summary.edges_created, 1);
    assert_eq!(events.count(NODE_CREATED).await, 2);

    save_snapshot(&store, &snapshot_path).await.unwrap();
    let restored = Arc::new(load_snapshot(&snapshot_path).await.unwrap());

    let db = restored.get_node_by_address("lab", "10.0.0.5").await.unwrap().unwrap();
    assert_eq!(db.hostname.as_deref(), Some("db01"));
    assert_eq!(db.device_type, DeviceType::Server);
    assert_eq!(db.services.len(), 2);

    let router = restored.get_node_by_address("lab", "10.0.0.1").await.unwrap().unwrap();
    assert_eq!(router.device_type, DeviceType::Router);

    let edges = restored.list_edges("lab").await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_id, router.id);
    assert_eq!(edges[0].target_id, db.id);

    // Importing the same scan into the restored state changes nothing structural
    let events = Arc::new(RecordingEventPublisher::new());
    let again = engine(restored.clone(), events.clone())
        .import(ImportRequest::new("lab", NMAP_SCAN))
        .await
        .unwrap();
    assert_eq!(again.nodes_created, 0);
    assert_eq!(again.nodes_updated, 2);
    assert_eq!(again.edges_created, 0);
    assert_eq!(events.count(NODE_UPDATED).await, 2);
    assert_eq!(restored.list_edges("lab").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_source_merges_into_scanned_nodes() {
    let store = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(RecordingEventPublisher::new());
    let engine = engine(store.clone(), events);

    engine.import(ImportRequest::new("lab", NMAP_SCAN)).await.unwrap();

    let inventory = serde_json::json!({
        "assets": [
            {"ip": "10.0.0.5", "name": "db01.corp", "owner": "dba-team", "role": "server"},
            {"ip": "10.0.0.77", "name": "spare", "state": "down"}
        ]
    })
    .to_string();
    let summary = engine
        .import(ImportRequest::new("lab", inventory).with_parser("cmdb-json"))
        .await
        .unwrap();

    assert_eq!(summary.nodes_created, 1);
    assert_eq!(summary.nodes_updated, 1);

    let db = store.get_node_by_address("lab", "10.0.0.5").await.unwrap().unwrap();
    assert_eq!(db.hostname.as_deref(), Some("db01.corp"));
    assert_eq!(db.services.len(), 2, "services survive an import that carries none");
    assert_eq!(db.status, NodeStatus::Alive);
    assert_eq!(db.device_type, DeviceType::Server);
    assert_eq!(db.attributes["owner"], "dba-team");
    assert_eq!(db.provenance.len(), 2);

    let spare = store.get_node_by_address("lab", "10.0.0.77").await.unwrap().unwrap();
    assert_eq!(spare.status, NodeStatus::Offline);
    assert_eq!(spare.device_type, DeviceType::Host);
}

#[tokio::test]
async fn test_enrichment_revives_offline_node() {
    let store = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(RecordingEventPublisher::new());
    let engine = engine(store.clone(), events.clone());

    let inventory = r#"{"assets": [{"ip": "10.0.0.77", "name": "spare", "state": "down"}]}"#;
    engine
        .import(ImportRequest::new("lab", inventory).with_parser("cmdb-json"))
        .await
        .unwrap();

    let publisher: Arc<dyn EventPublisher> = events.clone();
    let enricher = Enricher::new(store.clone(), publisher);
    let node = enricher.observe_active("lab", "10.0.0.77", "flow-monitor").await.unwrap();

    assert_eq!(node.status, NodeStatus::Alive);
    assert_eq!(node.hostname.as_deref(), Some("spare"));
    assert_eq!(node.provenance.last().map(|p| p.source.as_str()), Some("flow-monitor"));
    assert_eq!(events.count(NODE_UPDATED).await, 1);

    let stats = store.statistics().await;
    assert_eq!(stats.network_count, 1);
    assert_eq!(stats.total_nodes, 1);
}

#[tokio::test]
async fn test_networks_are_isolated() {
    let store = Arc::new(MemoryGraphStore::new());
    let engine = engine(store.clone(), Arc::new(RecordingEventPublisher::new()));

    engine.import(ImportRequest::new("site-a", NMAP_SCAN)).await.unwrap();
    let summary = engine.import(ImportRequest::new("site-b", NMAP_SCAN)).await.unwrap();

    assert_eq!(summary.nodes_created, 2);
    assert_eq!(store.list_nodes("site-a").await.unwrap().len(), 2);
    assert_eq!(store.list_nodes("site-b").await.unwrap().len(), 2);

    let a = store.get_node_by_address("site-a", "10.0.0.5").await.unwrap().unwrap();
    let b = store.get_node_by_address("site-b", "10.0.0.5").await.unwrap().unwrap();
    assert_ne!(a.id, b.id);
}
