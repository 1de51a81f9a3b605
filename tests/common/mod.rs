//! Shared test fixtures.
//!
//! [`MockBackend`] is a fully in-memory [`Backend`] implementation used to
//! exercise the facades without any module file on disk. It mimics the
//! engine's observable behavior: cosine-distance search ordered ascending,
//! tagged-absent gets, boolean existence results, and a monotonically
//! increasing raw handle space.

// Not every test binary uses every fixture
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ruvector_bridge::backend::{Backend, RawHandle};
use ruvector_bridge::{
    AliasBinding, BackendContext, BackendKind, ClusterConfig, ClusterNode, ClusterStats,
    CollectionConfig, CollectionInfo, IndexMatch, IndexStats, NodeStatus, Result, RuvectorError,
    SearchQuery, SearchResult, Transaction, VectorEntry,
};

// =============================================================================
// Mock state
// =============================================================================

#[derive(Default)]
struct StoreState {
    entries: BTreeMap<String, VectorEntry>,
}

struct IndexState {
    dimensions: usize,
    m: usize,
    ef_construction: usize,
    items: BTreeMap<u64, Vec<f32>>,
}

#[derive(Default)]
struct ManagerState {
    collections: BTreeMap<String, CollectionInfo>,
    aliases: BTreeMap<String, String>,
}

struct ClusterState {
    config: ClusterConfig,
    nodes: BTreeMap<String, ClusterNode>,
    shards: HashMap<u32, String>,
}

#[derive(Default)]
struct ConsensusState {
    submitted: Vec<String>,
    finalized: Vec<String>,
}

#[derive(Default)]
struct MockState {
    next_handle: RawHandle,
    stores: HashMap<RawHandle, StoreState>,
    indexes: HashMap<RawHandle, IndexState>,
    managers: HashMap<RawHandle, ManagerState>,
    clusters: HashMap<RawHandle, ClusterState>,
    engines: HashMap<RawHandle, ConsensusState>,
}

impl MockState {
    fn issue(&mut self) -> RawHandle {
        self.next_handle += 1;
        self.next_handle
    }
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-memory backend double with call counting.
pub struct MockBackend {
    kind: BackendKind,
    state: Mutex<MockState>,
    calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockBackend {
    pub fn native() -> Self {
        Self::with_kind(BackendKind::Native)
    }

    pub fn wasm() -> Self {
        Self::with_kind(BackendKind::Wasm)
    }

    pub fn with_kind(kind: BackendKind) -> Self {
        Self {
            kind,
            state: Mutex::new(MockState::default()),
            calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Total backend calls dispatched, constructors included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `*_close` calls dispatched.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }
}

/// Builds a context around a fresh mock, returning both.
pub fn mock_context(kind: BackendKind) -> (Arc<MockBackend>, Arc<BackendContext>) {
    let backend = Arc::new(MockBackend::with_kind(kind));
    let ctx = Arc::new(BackendContext::with_backend(backend.clone()));
    (backend, ctx)
}

/// Builds a native-kind mock context.
pub fn native_context() -> (Arc<MockBackend>, Arc<BackendContext>) {
    mock_context(BackendKind::Native)
}

fn unknown(handle: RawHandle) -> RuvectorError {
    RuvectorError::backend(format!("unknown raw handle {handle}"))
}

/// Cosine distance: 0.0 for identical direction, up to 2.0 for opposite.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

fn matches_filter(entry: &VectorEntry, filter: &Option<ruvector_bridge::Metadata>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter
            .iter()
            .all(|(key, value)| entry.metadata.get(key) == Some(value)),
    }
}

// =============================================================================
// Backend implementation
// =============================================================================

impl Backend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    // ------------------------------------------------------------------- store

    fn vector_create(&self, _options: &ruvector_bridge::DbOptions) -> Result<RawHandle> {
        self.tick();
        let mut state = self.lock();
        let handle = state.issue();
        state.stores.insert(handle, StoreState::default());
        Ok(handle)
    }

    fn vector_insert(&self, handle: RawHandle, entry: &VectorEntry) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let store = state.stores.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        store.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn vector_insert_batch(&self, handle: RawHandle, entries: &[VectorEntry]) -> Result<usize> {
        self.tick();
        let mut state = self.lock();
        let store = state.stores.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        for entry in entries {
            store.entries.insert(entry.id.clone(), entry.clone());
        }
        Ok(entries.len())
    }

    fn vector_search(&self, handle: RawHandle, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.tick();
        let state = self.lock();
        let store = state.stores.get(&handle).ok_or_else(|| unknown(handle))?;

        let mut results: Vec<SearchResult> = store
            .entries
            .values()
            .filter(|entry| matches_filter(entry, &query.filter))
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                score: cosine_distance(&entry.vector, &query.vector),
                metadata: entry.metadata.clone(),
                vector: None,
            })
            .collect();
        results.sort_by(|a, b| a.score.total_cmp(&b.score));
        results.truncate(query.k);
        Ok(results)
    }

    fn vector_delete(&self, handle: RawHandle, id: &str) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let store = state.stores.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        Ok(store.entries.remove(id).is_some())
    }

    fn vector_get(&self, handle: RawHandle, id: &str) -> Result<Option<VectorEntry>> {
        self.tick();
        let state = self.lock();
        let store = state.stores.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(store.entries.get(id).cloned())
    }

    fn vector_len(&self, handle: RawHandle) -> Result<usize> {
        self.tick();
        let state = self.lock();
        let store = state.stores.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(store.entries.len())
    }

    fn vector_close(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.stores.remove(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    // ------------------------------------------------------------------- index

    fn index_create(
        &self,
        dimensions: usize,
        config: &ruvector_bridge::HnswConfig,
    ) -> Result<RawHandle> {
        self.tick();
        let mut state = self.lock();
        let handle = state.issue();
        state.indexes.insert(
            handle,
            IndexState {
                dimensions,
                m: config.m,
                ef_construction: config.ef_construction,
                items: BTreeMap::new(),
            },
        );
        Ok(handle)
    }

    fn index_build(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        let state = self.lock();
        state.indexes.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    fn index_add(&self, handle: RawHandle, id: u64, vector: &[f32]) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let index = state.indexes.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        index.items.insert(id, vector.to_vec());
        Ok(())
    }

    fn index_add_batch(&self, handle: RawHandle, items: &[(u64, Vec<f32>)]) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let index = state.indexes.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        for (id, vector) in items {
            index.items.insert(*id, vector.clone());
        }
        Ok(())
    }

    fn index_search(&self, handle: RawHandle, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.tick();
        let state = self.lock();
        let index = state.indexes.get(&handle).ok_or_else(|| unknown(handle))?;

        let mut matches: Vec<IndexMatch> = index
            .items
            .iter()
            .map(|(id, item)| IndexMatch {
                id: *id,
                distance: euclidean_distance(item, vector),
            })
            .collect();
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);
        Ok(matches)
    }

    fn index_remove(&self, handle: RawHandle, id: u64) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let index = state.indexes.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        Ok(index.items.remove(&id).is_some())
    }

    fn index_stats(&self, handle: RawHandle) -> Result<IndexStats> {
        self.tick();
        let state = self.lock();
        let index = state.indexes.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(IndexStats {
            size: index.items.len(),
            dimensions: index.dimensions,
            m: index.m,
            ef_construction: index.ef_construction,
        })
    }

    fn index_close(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.indexes.remove(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    // -------------------------------------------------------------- collection

    fn collection_manager_new(&self) -> Result<RawHandle> {
        self.tick();
        let mut state = self.lock();
        let handle = state.issue();
        state.managers.insert(handle, ManagerState::default());
        Ok(handle)
    }

    fn collection_create(&self, handle: RawHandle, config: &CollectionConfig) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let manager = state.managers.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        if manager.collections.contains_key(&config.name) {
            return Err(RuvectorError::backend(format!(
                "collection '{}' already exists",
                config.name
            )));
        }
        manager.collections.insert(
            config.name.clone(),
            CollectionInfo {
                name: config.name.clone(),
                dimensions: config.dimensions,
                metric: config.metric,
                vector_count: 0,
            },
        );
        Ok(())
    }

    fn collection_delete(&self, handle: RawHandle, name: &str) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let manager = state.managers.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        let existed = manager.collections.remove(name).is_some();
        if existed {
            manager.aliases.retain(|_, target| target != name);
        }
        Ok(existed)
    }

    fn collection_list(&self, handle: RawHandle) -> Result<Vec<CollectionInfo>> {
        self.tick();
        let state = self.lock();
        let manager = state.managers.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(manager.collections.values().cloned().collect())
    }

    fn collection_get(&self, handle: RawHandle, name: &str) -> Result<Option<CollectionInfo>> {
        self.tick();
        let state = self.lock();
        let manager = state.managers.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(manager.collections.get(name).cloned())
    }

    fn collection_exists(&self, handle: RawHandle, name: &str) -> Result<bool> {
        self.tick();
        let state = self.lock();
        let manager = state.managers.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(manager.collections.contains_key(name))
    }

    fn alias_create(&self, handle: RawHandle, alias: &str, collection: &str) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let manager = state.managers.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        if !manager.collections.contains_key(collection) {
            return Err(RuvectorError::backend(format!(
                "collection '{collection}' does not exist"
            )));
        }
        manager.aliases.insert(alias.to_string(), collection.to_string());
        Ok(())
    }

    fn alias_delete(&self, handle: RawHandle, alias: &str) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let manager = state.managers.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        Ok(manager.aliases.remove(alias).is_some())
    }

    fn alias_list(&self, handle: RawHandle) -> Result<Vec<AliasBinding>> {
        self.tick();
        let state = self.lock();
        let manager = state.managers.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(manager
            .aliases
            .iter()
            .map(|(alias, collection)| AliasBinding {
                alias: alias.clone(),
                collection: collection.clone(),
            })
            .collect())
    }

    fn collection_manager_close(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.managers.remove(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    // ----------------------------------------------------------------- cluster

    fn cluster_new(&self, config: &ClusterConfig) -> Result<RawHandle> {
        self.tick();
        let mut state = self.lock();
        let handle = state.issue();
        state.clusters.insert(
            handle,
            ClusterState {
                config: config.clone(),
                nodes: BTreeMap::new(),
                shards: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn cluster_add_node(&self, handle: RawHandle, node: &ClusterNode) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let cluster = state.clusters.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        cluster.nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    fn cluster_remove_node(&self, handle: RawHandle, node_id: &str) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let cluster = state.clusters.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        Ok(cluster.nodes.remove(node_id).is_some())
    }

    fn cluster_get_node(&self, handle: RawHandle, node_id: &str) -> Result<Option<ClusterNode>> {
        self.tick();
        let state = self.lock();
        let cluster = state.clusters.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(cluster.nodes.get(node_id).cloned())
    }

    fn cluster_list_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.tick();
        let state = self.lock();
        let cluster = state.clusters.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(cluster.nodes.values().cloned().collect())
    }

    fn cluster_healthy_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.tick();
        let state = self.lock();
        let cluster = state.clusters.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(cluster
            .nodes
            .values()
            .filter(|node| node.status == NodeStatus::Healthy)
            .cloned()
            .collect())
    }

    fn cluster_assign_shard(&self, handle: RawHandle, shard_id: u32, node_id: &str) -> Result<()> {
        self.tick();
        let mut state = self.lock();
        let cluster = state.clusters.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        if !cluster.nodes.contains_key(node_id) {
            return Err(RuvectorError::backend(format!(
                "node '{node_id}' is not registered"
            )));
        }
        cluster.shards.insert(shard_id, node_id.to_string());
        Ok(())
    }

    fn cluster_stats(&self, handle: RawHandle) -> Result<ClusterStats> {
        self.tick();
        let state = self.lock();
        let cluster = state.clusters.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(ClusterStats {
            node_count: cluster.nodes.len(),
            healthy_count: cluster
                .nodes
                .values()
                .filter(|node| node.status == NodeStatus::Healthy)
                .count(),
            shard_count: cluster.config.shard_count,
            replication_factor: cluster.config.replication_factor,
        })
    }

    fn cluster_start(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        let state = self.lock();
        state.clusters.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    fn cluster_close(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.clusters.remove(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }

    // --------------------------------------------------------------- consensus

    fn consensus_new(&self) -> Result<RawHandle> {
        self.tick();
        let mut state = self.lock();
        let handle = state.issue();
        state.engines.insert(handle, ConsensusState::default());
        Ok(handle)
    }

    fn consensus_submit(&self, handle: RawHandle, transaction: &Transaction) -> Result<String> {
        self.tick();
        let mut state = self.lock();
        let engine = state.engines.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        let vertex_id = format!("vx-{}-{}", engine.submitted.len(), transaction.id);
        engine.submitted.push(vertex_id.clone());
        Ok(vertex_id)
    }

    fn consensus_finalize(&self, handle: RawHandle, vertex_id: &str) -> Result<bool> {
        self.tick();
        let mut state = self.lock();
        let engine = state.engines.get_mut(&handle).ok_or_else(|| unknown(handle))?;
        if !engine.submitted.iter().any(|id| id == vertex_id) {
            return Ok(false);
        }
        if !engine.finalized.iter().any(|id| id == vertex_id) {
            engine.finalized.push(vertex_id.to_string());
        }
        Ok(true)
    }

    fn consensus_get_order(&self, handle: RawHandle) -> Result<Vec<String>> {
        self.tick();
        let state = self.lock();
        let engine = state.engines.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(engine.finalized.clone())
    }

    fn consensus_is_finalized(&self, handle: RawHandle, vertex_id: &str) -> Result<bool> {
        self.tick();
        let state = self.lock();
        let engine = state.engines.get(&handle).ok_or_else(|| unknown(handle))?;
        Ok(engine.finalized.iter().any(|id| id == vertex_id))
    }

    fn consensus_close(&self, handle: RawHandle) -> Result<()> {
        self.tick();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.engines.remove(&handle).ok_or_else(|| unknown(handle))?;
        Ok(())
    }
}
