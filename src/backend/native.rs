//! Native pass-through backend.
//!
//! Loads the engine's platform shared module (`.node` artifact) with
//! `libloading` and resolves one C symbol per wire operation. Payloads use
//! the same encoding as the WASM path (JSON for structured values, raw
//! UTF-8 for bare strings); the difference is the transport: arguments are
//! passed as `(ptr, len)` pairs into the caller's address space and results
//! come back in an engine-allocated [`RawBuf`] that must be released with
//! `rv_buf_free` exactly once.
//!
//! # C ABI
//!
//! ```text
//! ops:          fn(handle: u64, ptr: *const u8, len: u32, out: *mut RawBuf) -> i32
//! constructors: fn(ptr: *const u8, len: u32, out_handle: *mut u64) -> i32
//! release:      fn(buf: RawBuf)
//! ```
//!
//! Status codes: `0` success without payload, `1` success with payload in
//! `out`; negative codes map onto the bridge error taxonomy.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, instrument};

use crate::backend::{ops, wire, Backend, RawHandle};
use crate::config::{ClusterConfig, CollectionConfig, DbOptions, HnswConfig};
use crate::error::{ModuleError, Result, RuvectorError};
use crate::types::{
    AliasBinding, BackendKind, ClusterNode, ClusterStats, CollectionInfo, IndexMatch, IndexStats,
    SearchQuery, SearchResult, Transaction, VectorEntry,
};

/// Engine-allocated result buffer.
///
/// Populated by an op on status `1`; ownership passes to the caller, who
/// must hand it back to `rv_buf_free` after copying the bytes out.
#[repr(C)]
struct RawBuf {
    ptr: *mut u8,
    len: u32,
    cap: u32,
}

impl RawBuf {
    const fn empty() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }
}

type OpFn = unsafe extern "C" fn(u64, *const u8, u32, *mut RawBuf) -> i32;
type CtorFn = unsafe extern "C" fn(*const u8, u32, *mut u64) -> i32;
type BufFreeFn = unsafe extern "C" fn(RawBuf);

const RV_OK: i32 = 0;
const RV_OK_RESULT: i32 = 1;
const RV_ERR: i32 = -1;
const RV_ERR_HANDLE: i32 = -2;
const RV_ERR_UNSUPPORTED: i32 = -3;
const RV_ERR_DECODE: i32 = -4;
const RV_ERR_OOM: i32 = -5;

const BUF_FREE_SYMBOL: &[u8] = b"rv_buf_free\0";

/// Backend that dispatches into an in-process native module.
///
/// The native module implements all five domains, including cluster and
/// consensus. Symbols are resolved per call; the module stays mapped for
/// the lifetime of this value.
pub struct NativeBackend {
    lib: Library,
    path: PathBuf,
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeBackend {
    /// Loads the native module at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::LoadFailure`] if the module cannot be mapped,
    /// or [`ModuleError::MissingExport`] if it lacks the result-buffer
    /// release symbol (checked eagerly; op symbols are resolved per call).
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let lib = unsafe { Library::new(path) }
            .map_err(|e| ModuleError::load_failure(path, e.to_string()))?;

        // The release symbol is required by every result-bearing call;
        // fail at load time instead of on the first search.
        unsafe { lib.get::<BufFreeFn>(BUF_FREE_SYMBOL) }
            .map_err(|_| ModuleError::missing_export("rv_buf_free"))?;

        debug!(path = %path.display(), "native module loaded");
        Ok(Self {
            lib,
            path: path.to_path_buf(),
        })
    }

    /// Path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn op_symbol(&self, name: &str) -> Result<Symbol<'_, OpFn>> {
        unsafe { self.lib.get(name.as_bytes()) }
            .map_err(|_| ModuleError::missing_export(name).into())
    }

    fn ctor_symbol(&self, name: &str) -> Result<Symbol<'_, CtorFn>> {
        unsafe { self.lib.get(name.as_bytes()) }
            .map_err(|_| ModuleError::missing_export(name).into())
    }

    /// Invokes a constructor, returning the raw handle it produced.
    fn ctor(&self, op: &str, payload: &[u8]) -> Result<RawHandle> {
        let func = self.ctor_symbol(op)?;
        let (ptr, len) = payload_parts(payload);
        let mut handle: u64 = 0;
        let status = unsafe { func(ptr, len, &mut handle) };
        if status == RV_OK {
            Ok(handle)
        } else {
            Err(status_error(op, status))
        }
    }

    /// Invokes an op, returning its result payload if one was produced.
    fn call(&self, op: &str, handle: RawHandle, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let func = self.op_symbol(op)?;
        let (ptr, len) = payload_parts(payload);
        let mut out = RawBuf::empty();
        let status = unsafe { func(handle, ptr, len, &mut out) };

        match status {
            RV_OK => Ok(None),
            RV_OK_RESULT => {
                let bytes = if out.ptr.is_null() {
                    Vec::new()
                } else {
                    unsafe { std::slice::from_raw_parts(out.ptr, out.len as usize) }.to_vec()
                };
                self.free_buf(out);
                if bytes.is_empty() {
                    Err(crate::error::MarshalError::missing_result(op).into())
                } else {
                    Ok(Some(bytes))
                }
            }
            other => Err(status_error(op, other)),
        }
    }

    /// Returns an engine-allocated buffer to the module.
    fn free_buf(&self, buf: RawBuf) {
        if buf.ptr.is_null() {
            return;
        }
        // Verified present at load time
        if let Ok(free) = unsafe { self.lib.get::<BufFreeFn>(BUF_FREE_SYMBOL) } {
            unsafe { free(buf) };
        }
    }

    /// Op that produces no payload.
    fn op_unit<T: serde::Serialize + ?Sized>(
        &self,
        op: &str,
        handle: RawHandle,
        arg: &T,
    ) -> Result<()> {
        self.call(op, handle, &wire::encode(op, arg)?)?;
        Ok(())
    }

    /// Op with a JSON argument and a required JSON result.
    fn op_json<T, R>(&self, op: &str, handle: RawHandle, arg: &T) -> Result<R>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let payload = wire::encode(op, arg)?;
        let result = wire::require(op, self.call(op, handle, &payload)?)?;
        wire::decode(op, &result)
    }

    /// Op with a bare-string argument and a required JSON result.
    fn op_str_json<R: serde::de::DeserializeOwned>(
        &self,
        op: &str,
        handle: RawHandle,
        arg: &str,
    ) -> Result<R> {
        let result = wire::require(op, self.call(op, handle, arg.as_bytes())?)?;
        wire::decode(op, &result)
    }

    /// Op with no argument and a required JSON result.
    fn op_result<R: serde::de::DeserializeOwned>(&self, op: &str, handle: RawHandle) -> Result<R> {
        let result = wire::require(op, self.call(op, handle, &[])?)?;
        wire::decode(op, &result)
    }
}

fn payload_parts(payload: &[u8]) -> (*const u8, u32) {
    if payload.is_empty() {
        (std::ptr::null(), 0)
    } else {
        (payload.as_ptr(), payload.len() as u32)
    }
}

fn status_error(op: &str, status: i32) -> RuvectorError {
    match status {
        RV_ERR_HANDLE => RuvectorError::handle_invalid(format!("{op}: backend rejected handle")),
        RV_ERR_UNSUPPORTED => RuvectorError::unsupported(op, BackendKind::Native),
        RV_ERR_DECODE => crate::error::MarshalError::decode(op, "backend rejected payload").into(),
        RV_ERR_OOM => crate::error::MarshalError::OutOfMemory { requested: 0 }.into(),
        RV_ERR => RuvectorError::backend(format!("{op}: engine reported failure")),
        other => RuvectorError::backend(format!("{op}: unknown status {other}")),
    }
}

impl Backend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    // ------------------------------------------------------------------ vector

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
        match self.call(ops::VECTOR_GET, handle, id.as_bytes())? {
            Some(bytes) => Ok(Some(wire::decode(ops::VECTOR_GET, &bytes)?)),
            None => Ok(None),
        }
    }

    fn vector_len(&self, handle: RawHandle) -> Result<usize> {
        self.op_result(ops::VECTOR_LEN, handle)
    }

    fn vector_close(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::VECTOR_CLOSE, handle, &[])?;
        Ok(())
    }

    // ------------------------------------------------------------------- index

    fn index_create(&self, dimensions: usize, config: &HnswConfig) -> Result<RawHandle> {
        let payload = serde_json::json!({ "dimensions": dimensions, "config": config });
        self.ctor(ops::INDEX_CREATE, &wire::encode(ops::INDEX_CREATE, &payload)?)
    }

    fn index_build(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::INDEX_BUILD, handle, &[])?;
        Ok(())
    }

    fn index_add(&self, handle: RawHandle, id: u64, vector: &[f32]) -> Result<()> {
        self.op_unit(
            ops::INDEX_ADD,
            handle,
            &crate::backend::IndexAddPayload { id, vector },
        )
    }

    fn index_add_batch(&self, handle: RawHandle, items: &[(u64, Vec<f32>)]) -> Result<()> {
        self.op_unit(ops::INDEX_ADD_BATCH, handle, items)
    }

    fn index_search(&self, handle: RawHandle, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.op_json(
            ops::INDEX_SEARCH,
            handle,
            &crate::backend::IndexSearchPayload { vector, k },
        )
    }

    fn index_remove(&self, handle: RawHandle, id: u64) -> Result<bool> {
        self.op_json(ops::INDEX_REMOVE, handle, &id)
    }

    fn index_stats(&self, handle: RawHandle) -> Result<IndexStats> {
        self.op_result(ops::INDEX_STATS, handle)
    }

    fn index_close(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::INDEX_CLOSE, handle, &[])?;
        Ok(())
    }

    // -------------------------------------------------------------- collection

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
        match self.call(ops::COLLECTION_GET, handle, name.as_bytes())? {
            Some(bytes) => Ok(Some(wire::decode(ops::COLLECTION_GET, &bytes)?)),
            None => Ok(None),
        }
    }

    fn collection_exists(&self, handle: RawHandle, name: &str) -> Result<bool> {
        self.op_str_json(ops::COLLECTION_EXISTS, handle, name)
    }

    fn alias_create(&self, handle: RawHandle, alias: &str, collection: &str) -> Result<()> {
        self.op_unit(
            ops::ALIAS_CREATE,
            handle,
            &crate::backend::AliasCreatePayload { alias, collection },
        )
    }

    fn alias_delete(&self, handle: RawHandle, alias: &str) -> Result<bool> {
        self.op_str_json(ops::ALIAS_DELETE, handle, alias)
    }

    fn alias_list(&self, handle: RawHandle) -> Result<Vec<AliasBinding>> {
        self.op_result(ops::ALIAS_LIST, handle)
    }

    fn collection_manager_close(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::COLLECTION_MANAGER_CLOSE, handle, &[])?;
        Ok(())
    }

    // ----------------------------------------------------------------- cluster

    fn cluster_new(&self, config: &ClusterConfig) -> Result<RawHandle> {
        self.ctor(ops::CLUSTER_NEW, &wire::encode(ops::CLUSTER_NEW, config)?)
    }

    fn cluster_add_node(&self, handle: RawHandle, node: &ClusterNode) -> Result<()> {
        self.op_unit(ops::CLUSTER_ADD_NODE, handle, node)
    }

    fn cluster_remove_node(&self, handle: RawHandle, node_id: &str) -> Result<bool> {
        self.op_str_json(ops::CLUSTER_REMOVE_NODE, handle, node_id)
    }

    fn cluster_get_node(&self, handle: RawHandle, node_id: &str) -> Result<Option<ClusterNode>> {
        match self.call(ops::CLUSTER_GET_NODE, handle, node_id.as_bytes())? {
            Some(bytes) => Ok(Some(wire::decode(ops::CLUSTER_GET_NODE, &bytes)?)),
            None => Ok(None),
        }
    }

    fn cluster_list_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.op_result(ops::CLUSTER_LIST_NODES, handle)
    }

    fn cluster_healthy_nodes(&self, handle: RawHandle) -> Result<Vec<ClusterNode>> {
        self.op_result(ops::CLUSTER_HEALTHY_NODES, handle)
    }

    fn cluster_assign_shard(&self, handle: RawHandle, shard_id: u32, node_id: &str) -> Result<()> {
        self.op_unit(
            ops::CLUSTER_ASSIGN_SHARD,
            handle,
            &crate::backend::AssignShardPayload { shard_id, node_id },
        )
    }

    fn cluster_stats(&self, handle: RawHandle) -> Result<ClusterStats> {
        self.op_result(ops::CLUSTER_STATS, handle)
    }

    fn cluster_start(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::CLUSTER_START, handle, &[])?;
        Ok(())
    }

    fn cluster_close(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::CLUSTER_CLOSE, handle, &[])?;
        Ok(())
    }

    // --------------------------------------------------------------- consensus

    fn consensus_new(&self) -> Result<RawHandle> {
        self.ctor(ops::CONSENSUS_NEW, &[])
    }

    fn consensus_submit(&self, handle: RawHandle, transaction: &Transaction) -> Result<String> {
        let payload = wire::encode(ops::CONSENSUS_SUBMIT, transaction)?;
        let result = wire::require(
            ops::CONSENSUS_SUBMIT,
            self.call(ops::CONSENSUS_SUBMIT, handle, &payload)?,
        )?;
        // Vertex ids come back as bare strings, not JSON
        wire::decode_text(ops::CONSENSUS_SUBMIT, result)
    }

    fn consensus_finalize(&self, handle: RawHandle, vertex_id: &str) -> Result<bool> {
        self.op_str_json(ops::CONSENSUS_FINALIZE, handle, vertex_id)
    }

    fn consensus_get_order(&self, handle: RawHandle) -> Result<Vec<String>> {
        self.op_result(ops::CONSENSUS_GET_ORDER, handle)
    }

    fn consensus_is_finalized(&self, handle: RawHandle, vertex_id: &str) -> Result<bool> {
        self.op_str_json(ops::CONSENSUS_IS_FINALIZED, handle, vertex_id)
    }

    fn consensus_close(&self, handle: RawHandle) -> Result<()> {
        self.call(ops::CONSENSUS_CLOSE, handle, &[])?;
        Ok(())
    }
}
