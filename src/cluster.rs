//! Cluster membership facade.
//!
//! Node registration, health views, and shard assignment. Cluster
//! operations exist only in the native module; initializing against a WASM
//! backend fails up front with an unsupported-operation error rather than
//! deferring the failure to the first real call.

use std::mem;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend::ops;
use crate::config::ClusterConfig;
use crate::error::{LifecycleError, Result, RuvectorError};
use crate::handle::{Domain, Handle};
use crate::selector::BackendContext;
use crate::types::{BackendKind, ClusterNode, ClusterStats};

enum State {
    Idle,
    Ready { ctx: Arc<BackendContext>, handle: Handle },
    Closed,
}

/// Cluster topology and shard assignment. Native backend only.
pub struct ClusterManager {
    config: ClusterConfig,
    state: State,
}

impl ClusterManager {
    /// Creates an uninitialized manager with the given topology config.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero replication factor or zero
    /// shard count.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Idle,
        })
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
    /// WASM; cluster operations require the native module.
    pub fn init_with(&mut self, ctx: Arc<BackendContext>) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Ready { .. } => return Err(LifecycleError::AlreadyInitialized.into()),
            State::Closed => return Err(LifecycleError::Closed.into()),
        }
        if ctx.kind() == BackendKind::Wasm {
            return Err(RuvectorError::unsupported(ops::CLUSTER_NEW, BackendKind::Wasm));
        }

        let raw = ctx.backend().cluster_new(&self.config)?;
        let handle = ctx.registry().register(raw, Domain::Cluster);
        info!(
            %handle,
            replication_factor = self.config.replication_factor,
            shard_count = self.config.shard_count,
            "cluster manager ready"
        );
        self.state = State::Ready { ctx, handle };
        Ok(())
    }

    /// The topology configuration this manager was created with.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Whether the manager is initialized and not yet closed.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Registers a node in the topology.
    pub fn add_node(&self, node: ClusterNode) -> Result<()> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_add_node(raw, &node)
    }

    /// Removes a node; returns whether it existed.
    pub fn remove_node(&self, node_id: &str) -> Result<bool> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_remove_node(raw, node_id)
    }

    /// Fetches one node, or `None` if unknown.
    pub fn get_node(&self, node_id: &str) -> Result<Option<ClusterNode>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_get_node(raw, node_id)
    }

    /// Lists all registered nodes.
    pub fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_list_nodes(raw)
    }

    /// Lists nodes currently reporting healthy.
    pub fn healthy_nodes(&self) -> Result<Vec<ClusterNode>> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_healthy_nodes(raw)
    }

    /// Assigns a shard's primary to a node.
    pub fn assign_shard(&self, shard_id: u32, node_id: &str) -> Result<()> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_assign_shard(raw, shard_id, node_id)
    }

    /// Reports aggregate cluster statistics.
    pub fn stats(&self) -> Result<ClusterStats> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_stats(raw)
    }

    /// Starts cluster operation (health checking, shard serving).
    pub fn start(&self) -> Result<()> {
        let (ctx, raw) = self.ready()?;
        ctx.backend().cluster_start(raw)
    }

    /// Closes the manager, releasing its backend handle. Idempotent.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().release(handle, Domain::Cluster)?;
                ctx.backend().cluster_close(raw)?;
                info!(%handle, "cluster manager closed");
                Ok(())
            }
            State::Idle | State::Closed => Ok(()),
        }
    }

    fn ready(&self) -> Result<(&Arc<BackendContext>, crate::backend::RawHandle)> {
        match &self.state {
            State::Ready { ctx, handle } => {
                let raw = ctx.registry().resolve(*handle, Domain::Cluster)?;
                Ok((ctx, raw))
            }
            State::Idle => Err(LifecycleError::NotInitialized.into()),
            State::Closed => Err(LifecycleError::Closed.into()),
        }
    }
}

impl std::fmt::Debug for ClusterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Ready { .. } => "ready",
            State::Closed => "closed",
        };
        f.debug_struct("ClusterManager")
            .field("shard_count", &self.config.shard_count)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_replication() {
        let config = ClusterConfig {
            replication_factor: 0,
            ..ClusterConfig::default()
        };
        assert!(ClusterManager::new(config).unwrap_err().is_validation());
    }

    #[test]
    fn test_ops_before_init_fail() {
        let manager = ClusterManager::new(ClusterConfig::default()).unwrap();
        assert!(manager.list_nodes().unwrap_err().is_not_initialized());
    }
}
