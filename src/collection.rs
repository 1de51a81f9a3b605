//! Collection management facade.
//!
//! Namespaces vectors into named collections with per-collection
//! configuration, plus an alias layer for atomic re-pointing (blue/green
//! reindexing). Collection names are unique within a manager; aliases
//! resolve to exactly one collection.

use std::mem;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::CollectionConfig;
use crate::error::{LifecycleError, Result, ValidationError};
use crate::handle::{Domain, Handle};
use crate::selector::BackendContext;
use crate::types::{AliasBinding, CollectionInfo};

enum State {
    Idle,
    Ready { ctx: Arc<BackendContext>, handle: Handle },
    Closed,
}

/// Named-collection CRUD and alias management.
pub struct CollectionManager {
    state: State,
}

impl Default for CollectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionManager {
    /// Creates an uninitialized manager.
    pub fn new() -> Self {
        Self { state: State::Idle }
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

        let raw = ctx.backend().collection_manager_new()?;
        let handle = ctx.registry().register(raw, Domain::Collection);
        info!(%handle, backend = %ctx.kind(), "collection manager ready");
        self.state = State::Ready { ctx, handle };
        Ok(())
    }

    /// Whether the manager is initialized and not yet closed.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid config before dispatch;
    /// the backend reports an error if the name is already taken.
    pub fn create(&self, config: CollectionConfig) -> Result<()> {
        config.validate()?;
        let (ctx, raw) = self.ready()?;
        ctx.backend().collection_create(raw, &config)
    }

    /// Deletes a collection; returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().collection_delete(raw, name)
    }

    /// Lists all collections.
    pub fn list(&self) -> Result<Vec<CollectionInfo>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().collection_list(raw)
    }

    /// Fetches one collection's info, or `None` if absent.
    pub fn get(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().collection_get(raw, name)
    }

    /// Tests whether a collection exists.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().collection_exists(raw, name)
    }

    /// Binds an alias to a collection. Re-binding an existing alias
    /// re-points it atomically.
    pub fn create_alias(&self, alias: &str, collection: &str) -> Result<()> {
        if alias.is_empty() {
            return Err(ValidationError::invalid_field("alias", "must not be empty").into());
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().alias_create(raw, alias, collection)
    }

    /// Removes an alias; returns whether it existed. The underlying
    /// collection is untouched.
    pub fn delete_alias(&self, alias: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().alias_delete(raw, alias)
    }

    /// Lists all alias bindings.
    pub fn list_aliases(&self) -> Result<Vec<AliasBinding>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().alias_list(raw)
    }

    /// Closes the manager, releasing its backend handle. Idempotent.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().release(handle, Domain::Collection)?;
                ctx.backend().collection_manager_close(raw)?;
                info!(%handle, "collection manager closed");
                Ok(())
            }
            State::Idle | State::Closed => Ok(()),
        }
    }

    fn ready(&self) -> Result<(&Arc<BackendContext>, crate::backend::RawHandle)> {
        match &self.state {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().resolve(*handle, Domain::Collection)?;
                Ok((ctx, raw))
            }
            State::Idle => Err(LifecycleError::NotInitialized.into()),
            State::Closed => Err(LifecycleError::Closed.into()),
        }
    }
}

impl std::fmt::Debug for CollectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Ready { .. } => "ready",
            State::Closed => "closed",
        };
        f.debug_struct("CollectionManager").field("state", &state).finish()
    }
}
