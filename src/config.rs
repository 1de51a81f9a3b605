//! Creation-time configuration for backend-side objects.
//!
//! All configuration is immutable once the corresponding handle has been
//! created: the engine snapshots it at `*_new` time and there is no
//! reconfiguration call on the wire.
//!
//! # Example
//! ```rust
//! use ruvector_bridge::{DbOptions, DistanceMetric, HnswConfig};
//!
//! // Defaults tuned for 384-dimension embeddings
//! let options = DbOptions::new(384);
//!
//! // Customize for a recall-heavy workload
//! let options = DbOptions {
//!     metric: DistanceMetric::Euclidean,
//!     hnsw: HnswConfig {
//!         ef_search: 200,
//!         ..Default::default()
//!     },
//!     ..DbOptions::new(768)
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::DistanceMetric;

/// Upper bound on vector dimensionality accepted by the engine.
pub const MAX_DIMENSIONS: usize = 4096;

/// Options for creating a vector store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DbOptions {
    /// Vector dimensionality. Every inserted or queried vector must have
    /// exactly this length.
    pub dimensions: usize,
    /// Distance metric used for search.
    pub metric: DistanceMetric,
    /// HNSW index tuning parameters.
    pub hnsw: HnswConfig,
    /// Vector quantization settings.
    pub quantization: QuantizationConfig,
}

impl DbOptions {
    /// Creates options for the given dimensionality with engine defaults.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            metric: DistanceMetric::default(),
            hnsw: HnswConfig::default(),
            quantization: QuantizationConfig::default(),
        }
    }

    /// Validates the options.
    ///
    /// Called automatically by the facades at construction time.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `dimensions` is 0 or exceeds [`MAX_DIMENSIONS`]
    /// - the HNSW parameters are inconsistent (see [`HnswConfig::validate`])
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimensions(self.dimensions)?;
        self.hnsw.validate()?;
        self.quantization.validate()
    }
}

/// HNSW graph tuning parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Connections per node (`M`).
    pub m: usize,
    /// Candidate list size during construction.
    pub ef_construction: usize,
    /// Default candidate list size during search; can be overridden per
    /// query via [`crate::SearchQuery::ef_search`].
    pub ef_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        // Engine defaults: favor recall over build speed
        Self {
            m: 32,
            ef_construction: 200,
            ef_search: 100,
        }
    }
}

impl HnswConfig {
    /// Validates the HNSW parameters.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `m < 2` (graph would be degenerate)
    /// - `ef_construction < m` (construction cannot satisfy connectivity)
    /// - `ef_search == 0`
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.m < 2 {
            return Err(ValidationError::invalid_field("m", "must be at least 2"));
        }
        if self.ef_construction < self.m {
            return Err(ValidationError::invalid_field(
                "ef_construction",
                "must be at least m",
            ));
        }
        if self.ef_search == 0 {
            return Err(ValidationError::invalid_field(
                "ef_search",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Vector quantization settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizationConfig {
    /// Quantization mode.
    pub mode: QuantizationMode,
}

impl QuantizationConfig {
    /// Validates the quantization settings.
    ///
    /// # Errors
    /// Returns `ValidationError` if product quantization is configured with
    /// zero subspaces or zero centroids.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let QuantizationMode::Product { subspaces, k } = self.mode {
            if subspaces == 0 {
                return Err(ValidationError::invalid_field(
                    "quantization.subspaces",
                    "must be greater than 0",
                ));
            }
            if k == 0 {
                return Err(ValidationError::invalid_field(
                    "quantization.k",
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

/// Reduced-precision vector encoding, traded for lower memory use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantizationMode {
    /// Full-precision f32 storage.
    #[default]
    None,
    /// Scalar quantization (int8).
    Scalar,
    /// Product quantization.
    Product {
        /// Number of subspaces.
        subspaces: usize,
        /// Centroids per subspace.
        k: usize,
    },
    /// Binary quantization.
    Binary,
}

/// Configuration for creating a collection inside a manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection name. Must be unique within the manager.
    pub name: String,
    /// Vector dimensionality for the collection.
    pub dimensions: usize,
    /// Distance metric for the collection.
    pub metric: DistanceMetric,
    /// HNSW tuning for the collection's index.
    pub hnsw: HnswConfig,
    /// Quantization settings for the collection.
    pub quantization: QuantizationConfig,
}

impl CollectionConfig {
    /// Creates a collection config with engine defaults.
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            metric: DistanceMetric::default(),
            hnsw: HnswConfig::default(),
            quantization: QuantizationConfig::default(),
        }
    }

    /// Validates the collection configuration.
    ///
    /// # Errors
    /// Returns `ValidationError` if the name is empty or the numeric
    /// parameters are out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::invalid_field("name", "must not be empty"));
        }
        validate_dimensions(self.dimensions)?;
        self.hnsw.validate()?;
        self.quantization.validate()
    }
}

/// Configuration for creating a cluster manager (native backend only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of replicas per shard.
    pub replication_factor: usize,
    /// Number of shards the keyspace is split into.
    pub shard_count: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            replication_factor: 2,
            shard_count: 16,
        }
    }
}

impl ClusterConfig {
    /// Validates the cluster configuration.
    ///
    /// # Errors
    /// Returns `ValidationError` if either field is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.replication_factor == 0 {
            return Err(ValidationError::invalid_field(
                "replication_factor",
                "must be greater than 0",
            ));
        }
        if self.shard_count == 0 {
            return Err(ValidationError::invalid_field(
                "shard_count",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn validate_dimensions(dimensions: usize) -> Result<(), ValidationError> {
    if dimensions == 0 {
        return Err(ValidationError::invalid_field(
            "dimensions",
            "must be greater than 0",
        ));
    }
    if dimensions > MAX_DIMENSIONS {
        return Err(ValidationError::invalid_field(
            "dimensions",
            format!("must not exceed {MAX_DIMENSIONS}"),
        ));
    }
    Ok(())
}
