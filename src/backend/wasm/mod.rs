//! WebAssembly execution backend.
//!
//! Loads a compiled module with `wasmtime` and marshals every operation
//! through the module's linear memory via the [`Arena`]. The module exports
//! one function per wire operation name plus the marshaling primitives
//! (`memory`, `alloc`, `dealloc`, `get_result_ptr`, `get_result_len`).
//!
//! The result slot is per-instance state, so the arena sits behind a mutex
//! and calls never overlap. Cluster and consensus operations are not
//! compiled into the WASM artifact; every one of them returns an explicit
//! unsupported-operation error without touching the module.

mod arena;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};
use wasmtime::Engine;

use crate::backend::{ops, wire, Backend, RawHandle};
use crate::backend::{AliasCreatePayload, IndexAddPayload, IndexSearchPayload};
use crate::config::{ClusterConfig, CollectionConfig, DbOptions, HnswConfig};
use crate::error::{Result, RuvectorError};
use crate::types::{
    AliasBinding, BackendKind, ClusterNode, ClusterStats, CollectionInfo, IndexMatch, IndexStats,
    SearchQuery, SearchResult, Transaction, VectorEntry,
};

use arena::Arena;

/// Backend that executes operations inside a WebAssembly module.
pub struct WasmBackend {
    arena: Mutex<Arena>,
    path: PathBuf,
}

impl std::fmt::Debug for WasmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WasmBackend {
    /// Loads and instantiates the module at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModuleError::LoadFailure`] if the file fails to
    /// parse or instantiate, or [`crate::ModuleError::MissingExport`] if a
    /// required marshaling export is absent.
    #[instrument(skip(engine))]
    pub fn load(engine: &Engine, path: &Path) -> Result<Self> {
        let arena = Arena::instantiate(engine, path)?;
        info!(path = %path.display(), "wasm module instantiated");
        Ok(Self {
            arena: Mutex::new(arena),
            path: path.to_path_buf(),
        })
    }

    /// Path of the loaded module.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_arena<T>(&self, f: impl FnOnce(&mut Arena) -> Result<T>) -> Result<T> {
        // The arena holds no cross-call state beyond the result slot, so a
        // lock poisoned by a panicking thread is still safe to reuse
        let mut arena = self
            .arena
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut arena)
    }

    fn ctor(&self, op: &'static str, payload: &[u8]) -> Result<RawHandle> {
        let raw = self.with_arena(|arena| arena.invoke_ctor(op, payload))?;
        Ok(RawHandle::from(raw))
    }

    /// Fire-and-forget operation; any result payload is ignored.
    fn op_unit<T: Serialize + ?Sized>(
        &self,
        op: &'static str,
        handle: RawHandle,
        payload: &T,
    ) -> Result<()> {
        let bytes = wire::encode(op, payload)?;
        self.with_arena(|arena| arena.invoke_op(op, handle as u32, &bytes))?;
        Ok(())
    }

    /// Structured-payload operation with a required structured result.
    fn op_json<P: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        op: &'static str,
        handle: RawHandle,
        payload: &P,
    ) -> Result<R> {
        let bytes = wire::encode(op, payload)?;
        let result = self.with_arena(|arena| arena.invoke_op(op, handle as u32, &bytes))?;
        wire::decode(op, &wire::require(op, result)?)
    }

    /// Bare-string-payload operation with a required structured result.
    fn op_str_json<R: DeserializeOwned>(
        &self,
        op: &'static str,
        handle: RawHandle,
        arg: &str,
    ) -> Result<R> {
        let result =
            self.with_arena(|arena| arena.invoke_op(op, handle as u32, arg.as_bytes()))?;
        wire::decode(op, &wire::require(op, result)?)
    }

    /// Bare-string-payload operation whose result, if any, is a JSON value.
    fn op_str_optional<R: DeserializeOwned>(
        &self,
        op: &'static str,
        handle: RawHandle,
        arg: &str,
    ) -> Result<Option<R>> {
        let result =
            self.with_arena(|arena| arena.invoke_op(op, handle as u32, arg.as_bytes()))?;
        match result {
            Some(bytes) => Ok(Some(wire::decode(op, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Empty-payload operation with a required structured result.
    fn op_result<R: DeserializeOwned>(&self, op: &'static str, handle: RawHandle) -> Result<R> {
        let result = self.with_arena(|arena| arena.invoke_op(op, handle as u32, &[]))?;
        wire::decode(op, &wire::require(op, result)?)
    }

    /// Empty-payload operation; any result payload is ignored.
    fn op_empty(&self, op: &'static str, handle: RawHandle) -> Result<()> {
        self.with_arena(|arena| arena.invoke_op(op, handle as u32, &[]))?;
        Ok(())
    }

    fn unsupported<T>(&self, op: &'static str) -> Result<T> {
        Err(RuvectorError::unsupported(op, BackendKind::Wasm))
    }
}

impl Backend for WasmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Wasm
    }

    // =========================================================================
    // Vector store
    // =========================================================================

    fn vector_create(&self, options: &DbOptions) -> Result<RawHandle> {
        self.ctor(ops::VECTOR_CREATE, &wire::encode(ops::VECTOR_CREATE, options)?)
    }

    fn vector_insert(&self, handle: RawHandle, entry: &VectorEntry) -> Result<()> {
        self.op_unit(ops::VECTOR_INSERT, handle, entry)
    }

    fn vector_insert_batch(&self, handle: RawHandle, entries: &[VectorEntry]) -> Result<usize> {
        self.op_json(ops::VECTOR_INSERT_BATCH, handle, entries)
    }

    fn vector_search(&self, handle: RawHandle, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.op_json(ops::VECTOR_SEARCH, handle, query)
    }

    fn vector_delete(&self, handle: RawHandle, id: &str) -> Result<bool> {
        self.op_str_json(ops::VECTOR_DELETE, handle, id)
    }

    fn vector_get(&self, handle: RawHandle, id: &str) -> Result<Option<VectorEntry>> {
        self.op_str_optional(ops::VECTOR_GET, handle, id)
    }

    fn vector_len(&self, handle: RawHandle) -> Result<usize> {
        self.op_result(ops::VECTOR_LEN, handle)
    }

    fn vector_close(&self, handle: RawHandle) -> Result<()> {
        self.op_empty(ops::VECTOR_CLOSE, handle)
    }

    // =========================================================================
    // ANN index
    // =========================================================================

    fn index_create(&self, dimensions: usize, config: &HnswConfig) -> Result<RawHandle> {
        let payload = json!({ "dimensions": dimensions, "config": config });
        self.ctor(ops::INDEX_CREATE, &wire::encode(ops::INDEX_CREATE, &payload)?)
    }

    fn index_build(&self, handle: RawHandle) -> Result<()> {
        self.op_empty(ops::INDEX_BUILD, handle)
    }

    fn index_add(&self, handle: RawHandle, id: u64, vector: &[f32]) -> Result<()> {
        self.op_unit(ops::INDEX_ADD, handle, &IndexAddPayload { id, vector })
    }

    fn index_add_batch(&self, handle: RawHandle, items: &[(u64, Vec<f32>)]) -> Result<()> {
        // The WASM artifact has no batch export; add items one at a time
        for (id, vector) in items {
            self.index_add(handle, *id, vector)?;
        }
        Ok(())
    }

    fn index_search(&self, handle: RawHandle, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.op_json(ops::INDEX_SEARCH, handle, &IndexSearchPayload { vector, k })
    }

    fn index_remove(&self, handle: RawHandle, id: u64) -> Result<bool> {
        self.op_json(ops::INDEX_REMOVE, handle, &id)
    }

    fn index_stats(&self, handle: RawHandle) -> Result<IndexStats> {
        self.op_result(ops::INDEX_STATS, handle)
    }

    fn index_close(&self, handle: RawHandle) -> Result<()> {
        self.op_empty(ops::INDEX_CLOSE, handle)
    }

    // =========================================================================
    // Collection manager
    // =========================================================================

    fn collection_manager_new(&self) -> Result<RawHandle> {
        self.ctor(ops::COLLECTION_MANAGER_NEW, &[])
    }

    fn collection_create(&self, handle: RawHandle, config: &CollectionConfig) -> Result<()> {
        self.op_unit(ops::COLLECTION_CREATE, handle, config)
    }

    fn collection_delete(&self, handle: RawHandle, name: &str) -> Result<bool> {
        self.op_str_json(ops::COLLECTION_DELETE, handle, name)
    }

    fn collection_list(&self, handle: RawHandle) -> Result<Vec<CollectionInfo>> {
        self.op_result(ops::COLLECTION_LIST, handle)
    }

    fn collection_get(&self, handle: RawHandle, name: &str) -> Result<Option<CollectionInfo>> {
        self.op_str_optional(ops::COLLECTION_GET, handle, name)
    }

    fn collection_exists(&self, handle: RawHandle, name: &str) -> Result<bool> {
        self.op_str_json(ops::COLLECTION_EXISTS, handle, name)
    }

    fn alias_create(&self, handle: RawHandle, alias: &str, collection: &str) -> Result<()> {
        self.op_unit(
            ops::ALIAS_CREATE,
            handle,
            &AliasCreatePayload { alias, collection },
        )
    }

    fn alias_delete(&self, handle: RawHandle, alias: &str) -> Result<bool> {
        self.op_str_json(ops::ALIAS_DELETE, handle, alias)
    }

    fn alias_list(&self, handle: RawHandle) -> Result<Vec<AliasBinding>> {
        self.op_result(ops::ALIAS_LIST, handle)
    }

    fn collection_manager_close(&self, handle: RawHandle) -> Result<()> {
        self.op_empty(ops::COLLECTION_MANAGER_CLOSE, handle)
    }

    // =========================================================================
    // Cluster — not compiled into the WASM artifact
    // =========================================================================

    fn cluster_new(&self, _config: &ClusterConfig) -> Result<RawHandle> {
        self.unsupported(ops::CLUSTER_NEW)
    }

    fn cluster_add_node(&self, _handle: RawHandle, _node: &ClusterNode) -> Result<()> {
        self.unsupported(ops::CLUSTER_ADD_NODE)
    }

    fn cluster_remove_node(&self, _handle: RawHandle, _node_id: &str) -> Result<bool> {
        self.unsupported(ops::CLUSTER_REMOVE_NODE)
    }

    fn cluster_get_node(&self, _handle: RawHandle, _node_id: &str) -> Result<Option<ClusterNode>> {
        self.unsupported(ops::CLUSTER_GET_NODE)
    }

    fn cluster_list_nodes(&self, _handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.unsupported(ops::CLUSTER_LIST_NODES)
    }

    fn cluster_healthy_nodes(&self, _handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.unsupported(ops::CLUSTER_HEALTHY_NODES)
    }

    fn cluster_assign_shard(
        &self,
        _handle: RawHandle,
        _shard_id: u32,
        _node_id: &str,
    ) -> Result<()> {
        self.unsupported(ops::CLUSTER_ASSIGN_SHARD)
    }

    fn cluster_stats(&self, _handle: RawHandle) -> Result<ClusterStats> {
        self.unsupported(ops::CLUSTER_STATS)
    }

    fn cluster_start(&self, _handle: RawHandle) -> Result<()> {
        self.unsupported(ops::CLUSTER_START)
    }

    fn cluster_close(&self, _handle: RawHandle) -> Result<()> {
        self.unsupported(ops::CLUSTER_CLOSE)
    }

    // =========================================================================
    // Consensus — not compiled into the WASM artifact
    // =========================================================================

    fn consensus_new(&self) -> Result<RawHandle> {
        self.unsupported(ops::CONSENSUS_NEW)
    }

    fn consensus_submit(&self, _handle: RawHandle, _transaction: &Transaction) -> Result<String> {
        self.unsupported(ops::CONSENSUS_SUBMIT)
    }

    fn consensus_finalize(&self, _handle: RawHandle, _vertex_id: &str) -> Result<bool> {
        self.unsupported(ops::CONSENSUS_FINALIZE)
    }

    fn consensus_get_order(&self, _handle: RawHandle) -> Result<Vec<String>> {
        self.unsupported(ops::CONSENSUS_GET_ORDER)
    }

    fn consensus_is_finalized(&self, _handle: RawHandle, _vertex_id: &str) -> Result<bool> {
        self.unsupported(ops::CONSENSUS_IS_FINALIZED)
    }

    fn consensus_close(&self, _handle: RawHandle) -> Result<()> {
        self.unsupported(ops::CONSENSUS_CLOSE)
    }
}
