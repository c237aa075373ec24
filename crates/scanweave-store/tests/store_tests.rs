//! Tests for the scanweave-store crate

use scanweave_core::definition::{Grammar, ParserDefinition};
use scanweave_core::model::{DeviceType, NewEdge, NodeStatus, NodeUpsert, ServiceRecord};
use scanweave_store::*;

fn create_test_upsert(address: &str, hostname: &str) -> NodeUpsert {
    let mut upsert = NodeUpsert::new(address).with_status(NodeStatus::Alive);
    upsert.hostname = Some(hostname.to_string());
    upsert
}

#[tokio::test]
async fn test_upsert_creates_then_updates() {
    let store = MemoryGraphStore::new();

    let first = store
        .upsert_node("lab", create_test_upsert("10.0.0.5", "web01"), "import")
        .await
        .unwrap();
    assert!(first.created);

    let second = store
        .upsert_node("lab", create_test_upsert("10.0.0.5", "web01.corp"), "import")
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.node.id, first.node.id);
    assert_eq!(second.node.hostname.as_deref(), Some("web01.corp"));
    assert_eq!(second.node.provenance.len(), 2);

    let nodes = store.list_nodes("lab").await.unwrap();
    assert_eq!(nodes.len(), 1);
}

#[tokio::test]
async fn test_same_address_in_different_networks_is_not_merged() {
    let store = MemoryGraphStore::new();
    store.upsert_node("lab", NodeUpsert::new("10.0.0.5"), "import").await.unwrap();
    store.upsert_node("prod", NodeUpsert::new("10.0.0.5"), "import").await.unwrap();

    assert_eq!(store.statistics().await.total_nodes, 2);
    assert_eq!(store.statistics().await.network_count, 2);
}

#[tokio::test]
async fn test_empty_address_is_rejected() {
    let store = MemoryGraphStore::new();
    let result = store.upsert_node("lab", NodeUpsert::new("  "), "import").await;
    assert!(matches!(result, Err(StoreError::InvalidNode(_))));
}

#[tokio::test]
async fn test_edge_creation_is_existence_checked() {
    let store = MemoryGraphStore::new();
    let a = store.upsert_node("lab", NodeUpsert::new("10.0.0.1"), "import").await.unwrap().node;
    let b = store.upsert_node("lab", NodeUpsert::new("10.0.0.2"), "import").await.unwrap().node;

    let first = store
        .create_edge("lab", NewEdge::new(a.id, b.id, 0.95).with_label("hop"))
        .await
        .unwrap();
    assert!(first.created);

    // second writer for the same pair leaves the first edge untouched
    let second = store
        .create_edge("lab", NewEdge::new(a.id, b.id, 0.5).with_label("other"))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.edge.confidence, 0.95);
    assert_eq!(second.edge.label.as_deref(), Some("hop"));

    // the reverse direction is a distinct identity
    let reverse = store.create_edge("lab", NewEdge::new(b.id, a.id, 0.7)).await.unwrap();
    assert!(reverse.created);
    assert_eq!(store.list_edges("lab").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_edge_requires_known_endpoints() {
    let store = MemoryGraphStore::new();
    let a = store.upsert_node("lab", NodeUpsert::new("10.0.0.1"), "import").await.unwrap().node;

    let result = store.create_edge("lab", NewEdge::new(a.id, uuid::Uuid::new_v4(), 0.7)).await;
    assert!(matches!(result, Err(StoreError::NodeNotFound { .. })));

    let result = store.create_edge("lab", NewEdge::new(a.id, a.id, 0.7)).await;
    assert!(matches!(result, Err(StoreError::InvalidEdge(_))));
}

#[tokio::test]
async fn test_snapshot_round_trip_preserves_graph() {
    let store = MemoryGraphStore::new();
    store.set_network_subnets("lab", vec!["10.0.0.0/24".to_string()]).await;
    let services = vec![ServiceRecord {
        port: 22,
        protocol: "tcp".to_string(),
        state: "open".to_string(),
        service: "ssh".to_string(),
        ..Default::default()
    }];
    let a = store
        .upsert_node(
            "lab",
            NodeUpsert::new("10.0.0.1").with_device_type(DeviceType::Router).with_services(services),
            "import",
        )
        .await
        .unwrap()
        .node;
    let b = store.upsert_node("lab", NodeUpsert::new("10.0.0.2"), "import").await.unwrap().node;
    store.create_edge("lab", NewEdge::new(a.id, b.id, 0.7)).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    save_snapshot(&store, &path).await.unwrap();
    let restored = load_snapshot(&path).await.unwrap();

    assert_eq!(restored.network_subnets("lab").await.unwrap(), vec!["10.0.0.0/24".to_string()]);
    let router = restored.get_node_by_address("lab", "10.0.0.1").await.unwrap().unwrap();
    assert_eq!(router.device_type, DeviceType::Router);
    assert_eq!(router.services.len(), 1);

    // restored edge identity still deduplicates
    let again = restored.create_edge("lab", NewEdge::new(a.id, b.id, 0.7)).await.unwrap();
    assert!(!again.created);
}

#[tokio::test]
async fn test_restored_store_knows_old_and_new_nodes() {
    let store = MemoryGraphStore::new();
    let gateway = store.upsert_node("lab", NodeUpsert::new("10.0.0.1"), "import").await.unwrap().node;

    let restored = MemoryGraphStore::from_snapshot(store.snapshot().await);
    let host = restored.upsert_node("lab", NodeUpsert::new("10.0.0.2"), "import").await.unwrap().node;

    let outcome = restored.create_edge("lab", NewEdge::new(gateway.id, host.id, 0.7)).await.unwrap();
    assert!(outcome.created);
}

#[tokio::test]
async fn test_hub_over_large_network() {
    let store = MemoryGraphStore::new();
    let gateway = store.upsert_node("lab", NodeUpsert::new("10.0.0.1"), "import").await.unwrap().node;

    let mut created = 0;
    for i in 0..3000u32 {
        let address = format!("10.{}.{}.{}", 1 + i / 65536, (i / 256) % 256, i % 256);
        let member = store.upsert_node("lab", NodeUpsert::new(address), "import").await.unwrap();
        // re-upserting an existing node keeps it addressable
        store.upsert_node("lab", NodeUpsert::new(member.node.address.clone()), "import").await.unwrap();
        if store
            .create_edge("lab", NewEdge::new(gateway.id, member.node.id, 0.7))
            .await
            .unwrap()
            .created
        {
            created += 1;
        }
    }

    assert_eq!(created, 3000);
    assert_eq!(store.statistics().await.total_edges, 3000);
}

#[tokio::test]
async fn test_missing_snapshot_yields_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_snapshot(dir.path().join("absent.json")).await.unwrap();
    assert_eq!(store.statistics().await.total_nodes, 0);
}

#[tokio::test]
async fn test_definition_store_lookup() {
    let mut xml_default = ParserDefinition::new("nmap-custom", Grammar::Markup);
    xml_default.is_default = true;
    let json_plain = ParserDefinition::new("masscan", Grammar::Object);
    let store = InMemoryDefinitionStore::with_definitions(vec![xml_default, json_plain]);

    assert!(store.get_definition("masscan").await.unwrap().is_some());
    assert!(store.get_definition("missing").await.unwrap().is_none());
    assert_eq!(
        store.default_for(Grammar::Markup).await.unwrap().map(|d| d.id),
        Some("nmap-custom".to_string())
    );
    assert!(store.default_for(Grammar::Object).await.unwrap().is_none());
}

#[tokio::test]
async fn test_definition_store_accepts_single_object_or_array() {
    let single = r#"{"id": "a", "grammar": "csv"}"#;
    let many = r#"[{"id": "a", "grammar": "csv"}, {"id": "b", "grammar": "json"}]"#;

    assert_eq!(InMemoryDefinitionStore::from_json_str(single).unwrap().len().await, 1);
    assert_eq!(InMemoryDefinitionStore::from_json_str(many).unwrap().len().await, 2);
    assert!(InMemoryDefinitionStore::from_json_str("not json").is_err());
}

#[tokio::test]
async fn test_recording_publisher_counts_events() {
    let publisher = RecordingEventPublisher::new();
    publisher.publish(events::NODE_CREATED, serde_json::json!({"address": "10.0.0.1"})).await;
    publisher.publish(events::NODE_CREATED, serde_json::json!({"address": "10.0.0.2"})).await;
    publisher.publish(events::EDGE_CREATED, serde_json::json!({})).await;

    assert_eq!(publisher.count(events::NODE_CREATED).await, 2);
    assert_eq!(publisher.events().await.len(), 3);
}

mod merge_properties {
    use super::*;
    use proptest::prelude::*;
    use scanweave_core::model::is_placeholder;

    fn hostname_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,8}(\\.corp)?",
            Just("unknown".to_string()),
            Just("-".to_string()),
            Just(String::new()),
        ]
    }

    proptest! {
        #[test]
        fn prop_last_informative_hostname_wins(hostnames in prop::collection::vec(hostname_strategy(), 1..12)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let node = rt.block_on(async {
                let store = MemoryGraphStore::new();
                let mut last = None;
                for hostname in &hostnames {
                    last = Some(
                        store
                            .upsert_node("lab", create_test_upsert("10.0.0.5", hostname), "scan")
                            .await
                            .unwrap()
                            .node,
                    );
                }
                last.unwrap()
            });

            let expected = hostnames.iter().rev().find(|h| !is_placeholder(h)).cloned();
            prop_assert_eq!(node.hostname, expected);
            prop_assert_eq!(node.provenance.len(), hostnames.len());
        }
    }
}
