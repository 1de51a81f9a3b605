//! Cluster and consensus facade integration tests against the mock
//! backend, including the WASM rejection paths.

mod common;

use common::{mock_context, native_context};

use ruvector_bridge::{
    BackendKind, ClusterConfig, ClusterManager, ClusterNode, ConsensusEngine, NodeStatus,
    Transaction,
};

fn node(id: &str, status: NodeStatus) -> ClusterNode {
    ClusterNode {
        id: id.to_string(),
        address: format!("10.0.0.{}:7700", id.len()),
        status,
    }
}

fn tx(id: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        kind: "put".to_string(),
        payload: serde_json::json!({ "id": id }),
    }
}

// =============================================================================
// Cluster
// =============================================================================

#[test]
fn test_cluster_membership_and_health() {
    let (_, ctx) = native_context();
    let mut cluster = ClusterManager::new(ClusterConfig::default()).unwrap();
    cluster.init_with(ctx).unwrap();

    cluster.add_node(node("a", NodeStatus::Healthy)).unwrap();
    cluster.add_node(node("bb", NodeStatus::Degraded)).unwrap();
    cluster.add_node(node("ccc", NodeStatus::Offline)).unwrap();

    assert_eq!(cluster.list_nodes().unwrap().len(), 3);
    let healthy = cluster.healthy_nodes().unwrap();
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].id, "a");

    assert!(cluster.remove_node("bb").unwrap());
    assert!(!cluster.remove_node("bb").unwrap());
    assert!(cluster.get_node("bb").unwrap().is_none());
}

#[test]
fn test_cluster_shard_assignment_and_stats() {
    let (_, ctx) = native_context();
    let config = ClusterConfig {
        replication_factor: 3,
        shard_count: 8,
    };
    let mut cluster = ClusterManager::new(config).unwrap();
    cluster.init_with(ctx).unwrap();
    cluster.start().unwrap();

    cluster.add_node(node("a", NodeStatus::Healthy)).unwrap();
    cluster.assign_shard(0, "a").unwrap();
    // Assigning to an unregistered node is a backend error
    assert!(cluster.assign_shard(1, "ghost").is_err());

    let stats = cluster.stats().unwrap();
    assert_eq!(stats.node_count, 1);
    assert_eq!(stats.healthy_count, 1);
    assert_eq!(stats.shard_count, 8);
    assert_eq!(stats.replication_factor, 3);
}

#[test]
fn test_cluster_init_on_wasm_backend_rejected() {
    let (backend, ctx) = mock_context(BackendKind::Wasm);
    let calls_before = backend.call_count();

    let mut cluster = ClusterManager::new(ClusterConfig::default()).unwrap();
    let err = cluster.init_with(ctx).unwrap_err();
    assert!(err.is_unsupported());
    // Rejected before any backend dispatch
    assert_eq!(backend.call_count(), calls_before);
}

// =============================================================================
// Consensus
// =============================================================================

#[test]
fn test_consensus_submit_finalize_order() {
    let (_, ctx) = native_context();
    let mut engine = ConsensusEngine::new();
    engine.init_with(ctx).unwrap();

    let v1 = engine.submit(tx("t1")).unwrap();
    let v2 = engine.submit(tx("t2")).unwrap();
    assert_ne!(v1, v2);

    assert!(!engine.is_finalized(&v1).unwrap());
    assert!(engine.finalize(&v2).unwrap());
    assert!(engine.finalize(&v1).unwrap());
    // Already finalized stays true
    assert!(engine.finalize(&v1).unwrap());

    assert!(engine.is_finalized(&v1).unwrap());
    assert_eq!(engine.finalized_order().unwrap(), vec![v2, v1]);
}

#[test]
fn test_consensus_finalize_unknown_vertex_is_false() {
    let (_, ctx) = native_context();
    let mut engine = ConsensusEngine::new();
    engine.init_with(ctx).unwrap();

    assert!(!engine.finalize("vx-unknown").unwrap());
    assert!(engine.finalized_order().unwrap().is_empty());
}

#[test]
fn test_consensus_init_on_wasm_backend_rejected() {
    let (backend, ctx) = mock_context(BackendKind::Wasm);
    let calls_before = backend.call_count();

    let mut engine = ConsensusEngine::new();
    let err = engine.init_with(ctx).unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(backend.call_count(), calls_before);
}

#[test]
fn test_cluster_and_consensus_close_release_handles() {
    let (backend, ctx) = native_context();

    let mut cluster = ClusterManager::new(ClusterConfig::default()).unwrap();
    cluster.init_with(ctx.clone()).unwrap();
    let mut engine = ConsensusEngine::new();
    engine.init_with(ctx.clone()).unwrap();
    assert_eq!(ctx.registry().live_count(), 2);

    cluster.close().unwrap();
    engine.close().unwrap();
    assert_eq!(ctx.registry().live_count(), 0);
    assert_eq!(backend.close_count(), 2);
}
