//! The operation contract both execution backends implement.
//!
//! [`Backend`] is the fixed dispatch surface: ~40 handle-taking operations
//! across five domains (vector, index, collection, cluster, consensus).
//! Two implementations exist:
//!
//! - [`NativeBackend`] — pass-through to an in-process shared module over
//!   a C ABI (requires the `native` feature)
//! - [`WasmBackend`] — marshaled calls into a WebAssembly module's linear
//!   memory (requires the `wasm` feature)
//!
//! Both implement every method. The WASM backend answers every cluster and
//! consensus method with an explicit unsupported-operation error rather
//! than omitting them; callers rely on the full surface existing.
//!
//! # Wire encoding
//!
//! Structured arguments and results cross the boundary as UTF-8 JSON; bare
//! strings (ids, names) as raw UTF-8 bytes without JSON quoting. Numeric
//! vectors travel as JSON arrays of numbers.

#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "wasm")]
pub mod wasm;

pub(crate) mod wire;

#[cfg(feature = "native")]
pub use native::NativeBackend;
#[cfg(feature = "wasm")]
pub use wasm::WasmBackend;

use crate::config::{ClusterConfig, CollectionConfig, DbOptions, HnswConfig};
use crate::error::Result;
use crate::types::{
    AliasBinding, BackendKind, ClusterNode, ClusterStats, CollectionInfo, IndexMatch, IndexStats,
    SearchQuery, SearchResult, Transaction, VectorEntry,
};

/// Raw handle issued by a backend for one of its live objects.
///
/// Meaningful only to the backend that issued it. Facade code never sees
/// these directly; it works with generation-checked
/// [`crate::Handle`]s instead.
pub type RawHandle = u64;

/// Wire operation names, shared by both backends.
///
/// The WASM module exports one function per name; the native module
/// exposes one C symbol per name.
pub mod ops {
    /// Creates a vector store.
    pub const VECTOR_CREATE: &str = "vectordb_new";
    /// Inserts one entry.
    pub const VECTOR_INSERT: &str = "vectordb_insert";
    /// Inserts a batch of entries.
    pub const VECTOR_INSERT_BATCH: &str = "vectordb_insert_batch";
    /// Runs a similarity search.
    pub const VECTOR_SEARCH: &str = "vectordb_search";
    /// Deletes an entry by id.
    pub const VECTOR_DELETE: &str = "vectordb_delete";
    /// Fetches an entry by id.
    pub const VECTOR_GET: &str = "vectordb_get";
    /// Counts stored entries.
    pub const VECTOR_LEN: &str = "vectordb_len";
    /// Closes a vector store.
    pub const VECTOR_CLOSE: &str = "vectordb_close";

    /// Creates an ANN index.
    pub const INDEX_CREATE: &str = "hnsw_new";
    /// Finalizes graph construction.
    pub const INDEX_BUILD: &str = "hnsw_build";
    /// Adds one item.
    pub const INDEX_ADD: &str = "hnsw_add";
    /// Adds a batch of items.
    pub const INDEX_ADD_BATCH: &str = "hnsw_add_batch";
    /// Searches the index.
    pub const INDEX_SEARCH: &str = "hnsw_search";
    /// Removes an item.
    pub const INDEX_REMOVE: &str = "hnsw_remove";
    /// Reports index statistics.
    pub const INDEX_STATS: &str = "hnsw_stats";
    /// Closes an index.
    pub const INDEX_CLOSE: &str = "hnsw_close";

    /// Creates a collection manager.
    pub const COLLECTION_MANAGER_NEW: &str = "collection_manager_new";
    /// Creates a collection.
    pub const COLLECTION_CREATE: &str = "collection_create";
    /// Deletes a collection.
    pub const COLLECTION_DELETE: &str = "collection_delete";
    /// Lists collections.
    pub const COLLECTION_LIST: &str = "collection_list";
    /// Fetches one collection's info.
    pub const COLLECTION_GET: &str = "collection_get";
    /// Tests collection existence.
    pub const COLLECTION_EXISTS: &str = "collection_exists";
    /// Creates an alias.
    pub const ALIAS_CREATE: &str = "collection_alias_create";
    /// Deletes an alias.
    pub const ALIAS_DELETE: &str = "collection_alias_delete";
    /// Lists aliases.
    pub const ALIAS_LIST: &str = "collection_alias_list";
    /// Closes a collection manager.
    pub const COLLECTION_MANAGER_CLOSE: &str = "collection_manager_close";

    /// Creates a cluster manager.
    pub const CLUSTER_NEW: &str = "cluster_new";
    /// Registers a node.
    pub const CLUSTER_ADD_NODE: &str = "cluster_add_node";
    /// Removes a node.
    pub const CLUSTER_REMOVE_NODE: &str = "cluster_remove_node";
    /// Fetches one node.
    pub const CLUSTER_GET_NODE: &str = "cluster_get_node";
    /// Lists all nodes.
    pub const CLUSTER_LIST_NODES: &str = "cluster_list_nodes";
    /// Lists healthy nodes.
    pub const CLUSTER_HEALTHY_NODES: &str = "cluster_healthy_nodes";
    /// Assigns a shard to a node.
    pub const CLUSTER_ASSIGN_SHARD: &str = "cluster_assign_shard";
    /// Reports cluster statistics.
    pub const CLUSTER_STATS: &str = "cluster_stats";
    /// Starts the cluster.
    pub const CLUSTER_START: &str = "cluster_start";
    /// Closes a cluster manager.
    pub const CLUSTER_CLOSE: &str = "cluster_close";

    /// Creates a consensus engine.
    pub const CONSENSUS_NEW: &str = "consensus_new";
    /// Submits a transaction to the DAG.
    pub const CONSENSUS_SUBMIT: &str = "consensus_submit";
    /// Finalizes a vertex.
    pub const CONSENSUS_FINALIZE: &str = "consensus_finalize";
    /// Reports the finalized order.
    pub const CONSENSUS_GET_ORDER: &str = "consensus_get_order";
    /// Tests whether a vertex is finalized.
    pub const CONSENSUS_IS_FINALIZED: &str = "consensus_is_finalized";
    /// Closes a consensus engine.
    pub const CONSENSUS_CLOSE: &str = "consensus_close";
}

/// Payload for `hnsw_add`.
#[derive(serde::Serialize)]
pub(crate) struct IndexAddPayload<'a> {
    pub id: u64,
    pub vector: &'a [f32],
}

/// Payload for `hnsw_search`.
#[derive(serde::Serialize)]
pub(crate) struct IndexSearchPayload<'a> {
    pub vector: &'a [f32],
    pub k: usize,
}

/// Payload for `cluster_assign_shard`.
#[derive(serde::Serialize)]
pub(crate) struct AssignShardPayload<'a> {
    pub shard_id: u32,
    pub node_id: &'a str,
}

/// Payload for `collection_alias_create`.
#[derive(serde::Serialize)]
pub(crate) struct AliasCreatePayload<'a> {
    pub alias: &'a str,
    pub collection: &'a str,
}

/// The dispatch contract a backend must satisfy.
///
/// Every method blocks for the duration of the backend-side work; there is
/// no internal asynchrony or cancellation at this layer. Implementations
/// must be `Send + Sync`; the WASM implementation serializes calls
/// internally because its linear memory and result slot are shared.
pub trait Backend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    // =========================================================================
    // Vector store
    // =========================================================================

    /// Creates a vector store and returns its raw handle.
    fn vector_create(&self, options: &DbOptions) -> Result<RawHandle>;
    /// Inserts one entry.
    fn vector_insert(&self, handle: RawHandle, entry: &VectorEntry) -> Result<()>;
    /// Inserts a batch of entries, returning how many were stored.
    fn vector_insert_batch(&self, handle: RawHandle, entries: &[VectorEntry]) -> Result<usize>;
    /// Runs a similarity search.
    fn vector_search(&self, handle: RawHandle, query: &SearchQuery) -> Result<Vec<SearchResult>>;
    /// Deletes an entry by id; returns whether it existed.
    fn vector_delete(&self, handle: RawHandle, id: &str) -> Result<bool>;
    /// Fetches an entry by id.
    fn vector_get(&self, handle: RawHandle, id: &str) -> Result<Option<VectorEntry>>;
    /// Counts stored entries.
    fn vector_len(&self, handle: RawHandle) -> Result<usize>;
    /// Closes the store, releasing the raw handle.
    fn vector_close(&self, handle: RawHandle) -> Result<()>;

    // =========================================================================
    // ANN index
    // =========================================================================

    /// Creates an ANN index and returns its raw handle.
    fn index_create(&self, dimensions: usize, config: &HnswConfig) -> Result<RawHandle>;
    /// Finalizes graph construction after bulk adds.
    fn index_build(&self, handle: RawHandle) -> Result<()>;
    /// Adds one item under a numeric label.
    fn index_add(&self, handle: RawHandle, id: u64, vector: &[f32]) -> Result<()>;
    /// Adds a batch of items.
    fn index_add_batch(&self, handle: RawHandle, items: &[(u64, Vec<f32>)]) -> Result<()>;
    /// Searches for the `k` nearest items.
    fn index_search(&self, handle: RawHandle, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>>;
    /// Removes an item; returns whether it existed.
    fn index_remove(&self, handle: RawHandle, id: u64) -> Result<bool>;
    /// Reports index statistics.
    fn index_stats(&self, handle: RawHandle) -> Result<IndexStats>;
    /// Closes the index, releasing the raw handle.
    fn index_close(&self, handle: RawHandle) -> Result<()>;

    // =========================================================================
    // Collection manager
    // =========================================================================

    /// Creates a collection manager and returns its raw handle.
    fn collection_manager_new(&self) -> Result<RawHandle>;
    /// Creates a collection. Names are unique within a manager.
    fn collection_create(&self, handle: RawHandle, config: &CollectionConfig) -> Result<()>;
    /// Deletes a collection; returns whether it existed.
    fn collection_delete(&self, handle: RawHandle, name: &str) -> Result<bool>;
    /// Lists all collections.
    fn collection_list(&self, handle: RawHandle) -> Result<Vec<CollectionInfo>>;
    /// Fetches one collection's info, or `None` if absent.
    fn collection_get(&self, handle: RawHandle, name: &str) -> Result<Option<CollectionInfo>>;
    /// Tests whether a collection exists.
    fn collection_exists(&self, handle: RawHandle, name: &str) -> Result<bool>;
    /// Binds an alias to a collection.
    fn alias_create(&self, handle: RawHandle, alias: &str, collection: &str) -> Result<()>;
    /// Removes an alias; returns whether it existed.
    fn alias_delete(&self, handle: RawHandle, alias: &str) -> Result<bool>;
    /// Lists all alias bindings.
    fn alias_list(&self, handle: RawHandle) -> Result<Vec<AliasBinding>>;
    /// Closes the manager, releasing the raw handle.
    fn collection_manager_close(&self, handle: RawHandle) -> Result<()>;

    // =========================================================================
    // Cluster (native only; WASM rejects with Unsupported)
    // =========================================================================

    /// Creates a cluster manager and returns its raw handle.
    fn cluster_new(&self, config: &ClusterConfig) -> Result<RawHandle>;
    /// Registers a node in the topology.
    fn cluster_add_node(&self, handle: RawHandle, node: &ClusterNode) -> Result<()>;
    /// Removes a node; returns whether it existed.
    fn cluster_remove_node(&self, handle: RawHandle, node_id: &str) -> Result<bool>;
    /// Fetches one node, or `None` if unknown.
    fn cluster_get_node(&self, handle: RawHandle, node_id: &str) -> Result<Option<ClusterNode>>;
    /// Lists all registered nodes.
    fn cluster_list_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>>;
    /// Lists nodes currently reporting healthy.
    fn cluster_healthy_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>>;
    /// Assigns a shard's primary to a node.
    fn cluster_assign_shard(&self, handle: RawHandle, shard_id: u32, node_id: &str) -> Result<()>;
    /// Reports aggregate cluster statistics.
    fn cluster_stats(&self, handle: RawHandle) -> Result<ClusterStats>;
    /// Starts cluster operation.
    fn cluster_start(&self, handle: RawHandle) -> Result<()>;
    /// Closes the cluster manager, releasing the raw handle.
    fn cluster_close(&self, handle: RawHandle) -> Result<()>;

    // =========================================================================
    // Consensus (native only; WASM rejects with Unsupported)
    // =========================================================================

    /// Creates a consensus engine and returns its raw handle.
    fn consensus_new(&self) -> Result<RawHandle>;
    /// Submits a transaction; returns the id of the DAG vertex created.
    fn consensus_submit(&self, handle: RawHandle, transaction: &Transaction) -> Result<String>;
    /// Attempts to finalize a vertex; returns whether it finalized.
    fn consensus_finalize(&self, handle: RawHandle, vertex_id: &str) -> Result<bool>;
    /// Reports the finalized vertex order.
    fn consensus_get_order(&self, handle: RawHandle) -> Result<Vec<String>>;
    /// Tests whether a vertex is finalized.
    fn consensus_is_finalized(&self, handle: RawHandle, vertex_id: &str) -> Result<bool>;
    /// Closes the consensus engine, releasing the raw handle.
    fn consensus_close(&self, handle: RawHandle) -> Result<()>;
}
