//! # ruvector-bridge
//!
//! A dual-backend bridge to the ruvector vector database engine: one
//! handle-based API surface dispatching to either a **native** in-process
//! module (loaded over a C ABI) or a **WebAssembly** module (executed with
//! `wasmtime` and marshaled through linear memory).
//!
//! ## Features
//!
//! - **Vector store**: insert, batch insert, similarity search, delete,
//!   get, count — over id'd vectors with JSON metadata
//! - **ANN index**: standalone HNSW index over numeric labels
//! - **Collections**: named collections with per-collection config, plus
//!   an alias layer for atomic re-pointing
//! - **Cluster**: node membership, health views, shard assignment
//!   (native backend only)
//! - **Consensus**: DAG transaction submission and finality
//!   (native backend only)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ruvector_bridge::{DbOptions, SearchQuery, VectorEntry, VectorStore};
//!
//! fn main() -> ruvector_bridge::Result<()> {
//!     // Backend selection (native first, WASM fallback) happens on init
//!     let mut store = VectorStore::new(DbOptions::new(384))?;
//!     store.init()?;
//!
//!     store.insert(VectorEntry::new("doc-1", vec![0.1; 384]))?;
//!     let hits = store.search(SearchQuery::new(vec![0.1; 384], 5))?;
//!     println!("{} hits", hits.len());
//!
//!     store.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Backend selection
//!
//! [`BackendContext::shared`] probes for a native module first and falls
//! back to WASM, memoizing the outcome for the life of the process.
//! Facades accept an explicit [`BackendContext`] via `init_with` for
//! isolation in tests and for embedders that manage module paths
//! themselves.
//!
//! ## Feature flags
//!
//! - `native` (default) — native module loading via `libloading`
//! - `wasm` (default) — WASM module execution via `wasmtime`

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod backend;
mod cluster;
mod collection;
mod config;
mod consensus;
mod error;
mod handle;
mod index;
pub mod probe;
mod selector;
mod store;
mod types;

pub use cluster::ClusterManager;
pub use collection::CollectionManager;
pub use config::{
    ClusterConfig, CollectionConfig, DbOptions, HnswConfig, QuantizationConfig, QuantizationMode,
    MAX_DIMENSIONS,
};
pub use consensus::ConsensusEngine;
pub use error::{
    LifecycleError, MarshalError, ModuleError, Result, RuvectorError, ValidationError,
};
pub use handle::{Domain, Handle, HandleRegistry};
pub use index::AnnIndex;
pub use selector::{BackendContext, SelectorOptions};
pub use store::VectorStore;
pub use types::{
    AliasBinding, BackendKind, ClusterNode, ClusterStats, CollectionInfo, DagVertex,
    DistanceMetric, IndexMatch, IndexStats, Metadata, NodeStatus, SearchQuery, SearchResult,
    ShardInfo, Transaction, VectorEntry,
};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::{
        AnnIndex, BackendContext, BackendKind, ClusterConfig, ClusterManager, CollectionConfig,
        CollectionManager, ConsensusEngine, DbOptions, DistanceMetric, HnswConfig, Result,
        RuvectorError, SearchQuery, SearchResult, VectorEntry, VectorStore,
    };
}
