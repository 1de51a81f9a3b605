//! DAG consensus facade.
//!
//! Transaction submission and finality over the engine's DAG-based
//! consensus. Submitting a transaction creates a vertex; finalization is
//! explicit and the finalized order is totally ordered once observed.
//! Consensus exists only in the native module; initializing against a WASM
//! backend fails up front.

use std::mem;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend::ops;
use crate::error::{LifecycleError, Result, RuvectorError, ValidationError};
use crate::handle::{Domain, Handle};
use crate::selector::BackendContext;
use crate::types::{BackendKind, Transaction};

enum State {
    Idle,
    Ready { ctx: Arc<BackendContext>, handle: Handle },
    Closed,
}

/// Transaction submission and DAG finality. Native backend only.
pub struct ConsensusEngine {
    state: State,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusEngine {
    /// Creates an uninitialized engine.
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Initializes against the process-wide shared backend.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<()> {
        self.init_with(BackendContext::shared()?)
    }

    /// Initializes against an explicit backend context.
    ///
    /// # Errors
    ///
    /// Returns an unsupported-operation error if the context's backend is
    /// WASM; consensus requires the native module.
    pub fn init_with(&mut self, ctx: Arc<BackendContext>) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Ready { .. } => return Err(LifecycleError::AlreadyInitialized.into()),
            State::Closed => return Err(LifecycleError::Closed.into()),
        }
        if ctx.kind() == BackendKind::Wasm {
            return Err(RuvectorError::unsupported(ops::CONSENSUS_NEW, BackendKind::Wasm));
        }

        let raw = ctx.backend().consensus_new()?;
        let handle = ctx.registry().register(raw, Domain::Consensus);
        info!(%handle, "consensus engine ready");
        self.state = State::Ready { ctx, handle };
        Ok(())
    }

    /// Whether the engine is initialized and not yet closed.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Submits a transaction, returning the id of the DAG vertex created.
    ///
    /// # Errors
    ///
    /// Returns a validation error before dispatch if the transaction id
    /// is empty.
    pub fn submit(&self, transaction: Transaction) -> Result<String> {
        if transaction.id.is_empty() {
            return Err(ValidationError::invalid_field("id", "must not be empty").into());
        }
        let (ctx, raw) = self.ready()?;
        ctx.backend().consensus_submit(raw, &transaction)
    }

    /// Attempts to finalize a vertex; returns whether it finalized.
    ///
    /// Finalizing an already-finalized vertex returns `true`.
    pub fn finalize(&self, vertex_id: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().consensus_finalize(raw, vertex_id)
    }

    /// Reports the finalized vertex order, oldest first.
    pub fn finalized_order(&self) -> Result<Vec<String>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().consensus_get_order(raw)
    }

    /// Tests whether a vertex is finalized.
    pub fn is_finalized(&self, vertex_id: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().consensus_is_finalized(raw, vertex_id)
    }

    /// Closes the engine, releasing its backend handle. Idempotent.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().release(handle, Domain::Consensus)?;
                ctx.backend().consensus_close(raw)?;
                info!(%handle, "consensus engine closed");
                Ok(())
            }
            State::Idle | State::Closed => Ok(()),
        }
    }

    fn ready(&self) -> Result<(&Arc<BackendContext>, crate::backend::RawHandle)> {
        match &self.state {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().resolve(*handle, Domain::Consensus)?;
                Ok((ctx, raw))
            }
            State::Idle => Err(LifecycleError::NotInitialized.into()),
            State::Closed => Err(LifecycleError::Closed.into()),
        }
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Ready { .. } => "ready",
            State::Closed => "closed",
        };
        f.debug_struct("ConsensusEngine").field("state", &state).finish()
    }
}
