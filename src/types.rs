//! Core data types exchanged with the ruvector engine.
//!
//! Everything here crosses the backend boundary as UTF-8 JSON, so every
//! type derives `Serialize`/`Deserialize`. The structures are the wire
//! contract: both the native and WASM modules produce and consume these
//! exact shapes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata attached to a stored vector: arbitrary JSON key/value pairs.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Which execution backend is serving dispatch calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// In-process native module (`.node` shared library).
    Native,
    /// WebAssembly module with marshaled calls.
    Wasm,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Wasm => write!(f, "wasm"),
        }
    }
}

/// Distance metric for vector similarity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity). The engine default.
    #[default]
    Cosine,
    /// Euclidean distance (L2).
    Euclidean,
    /// Negated dot product.
    DotProduct,
    /// Manhattan distance (L1).
    Manhattan,
}

/// A stored vector with its identifier and metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Unique identifier within the store.
    pub id: String,
    /// Vector data. Length must equal the store's configured dimensions.
    pub vector: Vec<f32>,
    /// Arbitrary JSON metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorEntry {
    /// Creates an entry with empty metadata.
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: Metadata::new(),
        }
    }
}

/// A similarity search request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query vector. Length must equal the store's configured dimensions.
    pub vector: Vec<f32>,
    /// Number of results to return. Must be greater than zero.
    pub k: usize,
    /// Optional metadata filter: every key must match exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Metadata>,
    /// Optional per-query `ef_search` override for HNSW-backed stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ef_search: Option<usize>,
}

impl SearchQuery {
    /// Creates an unfiltered query.
    pub fn new(vector: Vec<f32>, k: usize) -> Self {
        Self {
            vector,
            k,
            filter: None,
            ef_search: None,
        }
    }
}

/// One hit from a similarity search.
///
/// Results are ordered by ascending distance (or descending similarity,
/// depending on the configured metric) as produced by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matched vector.
    pub id: String,
    /// Distance or similarity score under the store's metric.
    pub score: f32,
    /// Metadata of the matched vector.
    #[serde(default)]
    pub metadata: Metadata,
    /// The matched vector itself, when the engine was asked to return it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// One hit from a raw ANN index search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Numeric label of the matched item.
    pub id: u64,
    /// Distance under the index metric.
    pub distance: f32,
}

/// Statistics reported by an ANN index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of items currently in the index.
    pub size: usize,
    /// Dimensionality of indexed vectors.
    pub dimensions: usize,
    /// HNSW `m` parameter (connections per node).
    pub m: usize,
    /// HNSW `ef_construction` parameter.
    pub ef_construction: usize,
}

/// Description of an existing collection, as reported by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name (unique within a manager).
    pub name: String,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Distance metric in effect.
    pub metric: DistanceMetric,
    /// Number of vectors currently stored.
    pub vector_count: usize,
}

/// An alias → collection binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasBinding {
    /// Alias name.
    pub alias: String,
    /// Name of the collection the alias resolves to.
    pub collection: String,
}

/// Health status of a cluster node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Node is reachable and serving.
    Healthy,
    /// Node is reachable but impaired.
    Degraded,
    /// Node is unreachable.
    Offline,
}

/// One node in a cluster topology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Unique node identifier.
    pub id: String,
    /// Network address (`host:port`).
    pub address: String,
    /// Current health status.
    pub status: NodeStatus,
}

/// Assignment of one shard to cluster nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Shard identifier.
    pub id: u32,
    /// Node holding the primary replica.
    pub primary: String,
    /// Nodes holding secondary replicas.
    #[serde(default)]
    pub replicas: Vec<String>,
}

/// Aggregate cluster statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    /// Total registered nodes.
    pub node_count: usize,
    /// Nodes currently reporting healthy.
    pub healthy_count: usize,
    /// Configured shard count.
    pub shard_count: usize,
    /// Configured replication factor.
    pub replication_factor: usize,
}

/// A consensus-ordered operation submitted to the DAG.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-assigned transaction identifier.
    pub id: String,
    /// Operation type tag, interpreted by the engine.
    pub kind: String,
    /// Opaque JSON payload.
    pub payload: serde_json::Value,
}

/// A vertex in the consensus DAG, as reported by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DagVertex {
    /// Vertex identifier.
    pub id: String,
    /// Parent vertex identifiers.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Vector clock at vertex creation.
    #[serde(default)]
    pub vector_clock: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Native.to_string(), "native");
        assert_eq!(BackendKind::Wasm.to_string(), "wasm");
    }

    #[test]
    fn test_vector_entry_json_round_trip() {
        let mut entry = VectorEntry::new("v1", vec![0.1, 0.2, 0.3]);
        entry
            .metadata
            .insert("source".to_string(), serde_json::json!("unit-test"));

        let bytes = serde_json::to_vec(&entry).unwrap();
        let restored: VectorEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entry, restored);
    }

    #[test]
    fn test_search_query_omits_empty_options() {
        let query = SearchQuery::new(vec![1.0, 0.0], 5);
        let json = serde_json::to_string(&query).unwrap();
        assert!(!json.contains("filter"));
        assert!(!json.contains("ef_search"));
    }

    #[test]
    fn test_search_result_tolerates_missing_optional_fields() {
        let result: SearchResult =
            serde_json::from_str(r#"{"id":"v1","score":0.0}"#).unwrap();
        assert_eq!(result.id, "v1");
        assert!(result.metadata.is_empty());
        assert!(result.vector.is_none());
    }

    #[test]
    fn test_default_metric_is_cosine() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Cosine);
    }
}
