//! Standalone HNSW index facade.
//!
//! A raw approximate-nearest-neighbor index over numeric labels, without
//! the vector store's id/metadata layer. Items are `(u64, vector)` pairs;
//! search returns labels with distances.

use std::mem;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::HnswConfig;
use crate::error::{LifecycleError, Result, ValidationError};
use crate::handle::{Domain, Handle};
use crate::selector::BackendContext;
use crate::types::{IndexMatch, IndexStats};

enum State {
    Idle,
    Ready { ctx: Arc<BackendContext>, handle: Handle },
    Closed,
}

/// Approximate-nearest-neighbor index over `u64` labels.
pub struct AnnIndex {
    dimensions: usize,
    config: HnswConfig,
    state: State,
}

impl AnnIndex {
    /// Creates an uninitialized index.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero or oversized dimension, or
    /// for inconsistent HNSW parameters.
    pub fn new(dimensions: usize, config: HnswConfig) -> Result<Self> {
        crate::config::DbOptions::new(dimensions).validate()?;
        config.validate()?;
        Ok(Self {
            dimensions,
            config,
            state: State::Idle,
        })
    }

    /// Creates an uninitialized index with default HNSW parameters.
    pub fn with_defaults(dimensions: usize) -> Result<Self> {
        Self::new(dimensions, HnswConfig::default())
    }

    /// Initializes against the process-wide shared backend.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<()> {
        self.init_with(BackendContext::shared()?)
    }

    /// Initializes against an explicit backend context.
    pub fn init_with(&mut self, ctx: Arc<BackendContext>) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Ready { .. } => return Err(LifecycleError::AlreadyInitialized.into()),
            State::Closed => return Err(LifecycleError::Closed.into()),
        }

        let raw = ctx.backend().index_create(self.dimensions, &self.config)?;
        let handle = ctx.registry().register(raw, Domain::Index);
        info!(%handle, backend = %ctx.kind(), dimensions = self.dimensions, "ann index ready");
        self.state = State::Ready { ctx, handle };
        Ok(())
    }

    /// Configured dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The HNSW parameters this index was created with.
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Whether the index is initialized and not yet closed.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Adds one item under a numeric label.
    pub fn add(&self, id: u64, vector: &[f32]) -> Result<()> {
        self.check_dimensions(vector.len())?;
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_add(raw, id, vector)
    }

    /// Adds a batch of items. The whole batch is validated before any of
    /// it is dispatched.
    pub fn add_batch(&self, items: Vec<(u64, Vec<f32>)>) -> Result<()> {
        for (_, vector) in &items {
            self.check_dimensions(vector.len())?;
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_add_batch(raw, &items)
    }

    /// Finalizes graph construction after bulk adds.
    ///
    /// Optional; items added without a subsequent `build()` are still
    /// searchable, at reduced recall on some engines.
    pub fn build(&self) -> Result<()> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_build(raw)
    }

    /// Searches for the `k` nearest items, ordered by ascending distance.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>> {
        self.check_dimensions(vector.len())?;
        if k == 0 {
            return Err(ValidationError::invalid_field("k", "must be greater than zero").into());
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_search(raw, vector, k)
    }

    /// Removes an item; returns whether it existed.
    pub fn remove(&self, id: u64) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_remove(raw, id)
    }

    /// Reports index statistics.
    pub fn stats(&self) -> Result<IndexStats> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().index_stats(raw)
    }

    /// Closes the index, releasing its backend handle. Idempotent.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().release(handle, Domain::Index)?;
                ctx.backend().index_close(raw)?;
                info!(%handle, "ann index closed");
                Ok(())
            }
            State::Idle | State::Closed => Ok(()),
        }
    }

    fn ready(&self) -> Result<(&Arc<BackendContext>, crate::backend::RawHandle)> {
        match &self.state {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().resolve(*handle, Domain::Index)?;
                Ok((ctx, raw))
            }
            State::Idle => Err(LifecycleError::NotInitialized.into()),
            State::Closed => Err(LifecycleError::Closed.into()),
        }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions {
            return Err(ValidationError::dimension_mismatch(self.dimensions, actual).into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for AnnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Ready { .. } => "ready",
            State::Closed => "closed",
        };
        f.debug_struct("AnnIndex")
            .field("dimensions", &self.dimensions)
            .field("state", &state)
            .finish()
    }
}
