//! Vector store facade.
//!
//! Owns one backend vector store through its lifecycle: construct with
//! validated options, `init()` to create the backend object, run CRUD and
//! similarity search against it, `close()` to release it. All input
//! validation happens here, before any backend dispatch, so both backends
//! reject bad input identically.

use std::mem;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::DbOptions;
use crate::error::{LifecycleError, Result, ValidationError};
use crate::handle::{Domain, Handle};
use crate::selector::BackendContext;
use crate::types::{SearchQuery, SearchResult, VectorEntry};

enum State {
    Idle,
    Ready { ctx: Arc<BackendContext>, handle: Handle },
    Closed,
}

/// Handle-based vector CRUD and similarity search.
///
/// # Example
/// ```rust,ignore
/// use ruvector_bridge::{DbOptions, VectorStore, VectorEntry, SearchQuery};
///
/// let mut store = VectorStore::new(DbOptions::new(3))?;
/// store.init()?;
/// store.insert(VectorEntry::new("v1", vec![0.1, 0.2, 0.3]))?;
/// let hits = store.search(SearchQuery::new(vec![0.1, 0.2, 0.3], 5))?;
/// store.close()?;
/// ```
pub struct VectorStore {
    options: DbOptions,
    state: State,
}

impl VectorStore {
    /// Creates an uninitialized store with the given options.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the options are invalid (zero or
    /// oversized dimension, bad HNSW parameters).
    pub fn new(options: DbOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            state: State::Idle,
        })
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

        let raw = ctx.backend().vector_create(&self.options)?;
        let handle = ctx.registry().register(raw, Domain::Vector);
        info!(%handle, backend = %ctx.kind(), dimensions = self.options.dimensions, "vector store ready");
        self.state = State::Ready { ctx, handle };
        Ok(())
    }

    /// Configured dimensionality.
    pub fn dimensions(&self) -> usize {
        self.options.dimensions
    }

    /// The options this store was created with.
    pub fn options(&self) -> &DbOptions {
        &self.options
    }

    /// Whether the store is initialized and not yet closed.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Inserts one entry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] before any backend
    /// call if the entry's vector length differs from the configured
    /// dimension.
    pub fn insert(&self, entry: VectorEntry) -> Result<()> {
        self.check_dimensions(entry.vector.len())?;
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_insert(raw, &entry)
    }

    /// Inserts a batch of entries, returning how many were stored.
    ///
    /// The whole batch is validated before any of it is dispatched; one
    /// bad entry rejects the batch.
    pub fn insert_batch(&self, entries: Vec<VectorEntry>) -> Result<usize> {
        for entry in &entries {
            self.check_dimensions(entry.vector.len())?;
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_insert_batch(raw, &entries)
    }

    /// Runs a similarity search, returning up to `k` results ordered by
    /// ascending distance.
    pub fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>> {
        self.check_dimensions(query.vector.len())?;
        if query.k == 0 {
            return Err(ValidationError::invalid_field("k", "must be greater than zero").into());
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_search(raw, &query)
    }

    /// Deletes an entry by id; returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_delete(raw, id)
    }

    /// Fetches an entry by id.
    pub fn get(&self, id: &str) -> Result<Option<VectorEntry>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_get(raw, id)
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().vector_len(raw)
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of stored entries. Alias for [`Self::len`].
    pub fn count(&self) -> Result<usize> {
        self.len()
    }

    /// Closes the store, releasing its backend handle.
    ///
    /// Idempotent: closing an already-closed store is a no-op. The handle
    /// is invalidated even if the backend-side close fails.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().release(handle, Domain::Vector)?;
                ctx.backend().vector_close(raw)?;
                info!(%handle, "vector store closed");
                Ok(())
            }
            State::Idle | State::Closed => Ok(()),
        }
    }

    fn ready(&self) -> Result<(&Arc<BackendContext>, crate::backend::RawHandle)> {
        match &self.state {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().resolve(*handle, Domain::Vector)?;
                Ok((ctx, raw))
            }
            State::Idle => Err(LifecycleError::NotInitialized.into()),
            State::Closed => Err(LifecycleError::Closed.into()),
        }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        if actual != self.options.dimensions {
            return Err(
                ValidationError::dimension_mismatch(self.options.dimensions, actual).into(),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Ready { .. } => "ready",
            State::Closed => "closed",
        };
        f.debug_struct("VectorStore")
            .field("dimensions", &self.options.dimensions)
            .field("state", &state)
            .finish()
    }
}
