//! Error types for the ruvector bridge.
//!
//! The bridge uses a hierarchical error system:
//! - `RuvectorError` is the top-level error returned by all public APIs
//! - Specific error types (`ModuleError`, `LifecycleError`, `ValidationError`,
//!   `MarshalError`) provide detail for each failure class
//!
//! Every error carries enough context to diagnose the failure without reading
//! backend internals: attempted module paths, expected vs. actual dimension,
//! the operation name that was rejected.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use ruvector_bridge::{DbOptions, Result, VectorStore};
//!
//! fn example() -> Result<()> {
//!     let mut store = VectorStore::new(DbOptions::new(384))?;
//!     store.init()?;
//!     // ... operations that may fail ...
//!     store.close()?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::BackendKind;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, RuvectorError>;

/// Top-level error enum for all bridge operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum RuvectorError {
    /// Backend module discovery, loading, or selection error.
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// Facade lifecycle error (init/close state machine violation).
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Cross-boundary marshaling error (WASM linear memory, wire payloads).
    #[error("Marshal error: {0}")]
    Marshal(#[from] MarshalError),

    /// Operation not available on the selected backend.
    ///
    /// The WASM backend rejects all cluster and consensus operations this
    /// way, explicitly rather than degrading to a no-op success.
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// Wire name of the rejected operation.
        operation: String,
        /// Backend that rejected it.
        backend: BackendKind,
    },

    /// Operation on a stale, unknown, or already-released handle.
    #[error("Invalid handle: {handle}")]
    HandleInvalid {
        /// Display form of the offending handle.
        handle: String,
    },

    /// Failure reported by the engine itself for an otherwise valid call.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RuvectorError {
    /// Creates an unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>, backend: BackendKind) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend,
        }
    }

    /// Creates an invalid-handle error.
    pub fn handle_invalid(handle: impl ToString) -> Self {
        Self::HandleInvalid {
            handle: handle.to_string(),
        }
    }

    /// Creates an engine-reported backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Returns true if this is a module discovery/load/selection error.
    pub fn is_module(&self) -> bool {
        matches!(self, Self::Module(_))
    }

    /// Returns true if this is a lifecycle error.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a marshaling error.
    pub fn is_marshal(&self) -> bool {
        matches!(self, Self::Marshal(_))
    }

    /// Returns true if this is an unsupported-operation error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns true if this is an invalid-handle error.
    pub fn is_handle_invalid(&self) -> bool {
        matches!(self, Self::HandleInvalid { .. })
    }

    /// Returns true if the facade was used before `init()`.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::Lifecycle(LifecycleError::NotInitialized))
    }

    /// Returns true if the facade was initialized twice.
    pub fn is_already_initialized(&self) -> bool {
        matches!(self, Self::Lifecycle(LifecycleError::AlreadyInitialized))
    }
}

/// Backend module discovery, loading, and selection errors.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No candidate module file exists on disk.
    ///
    /// Lists every path that was probed, in probe order, so a missing
    /// artifact can be diagnosed from the message alone.
    #[error("no {kind} module found; attempted paths: {attempted:?}")]
    NotFound {
        /// Which backend's module was being located.
        kind: BackendKind,
        /// Every candidate path probed, in priority order.
        attempted: Vec<PathBuf>,
    },

    /// A module file was found but failed to parse or instantiate.
    #[error("failed to load module {path}: {reason}")]
    LoadFailure {
        /// Path of the module that failed to load.
        path: PathBuf,
        /// Loader-reported reason.
        reason: String,
    },

    /// A loaded module lacks a required export.
    #[error("module is missing required export '{name}'")]
    MissingExport {
        /// Name of the missing symbol.
        name: String,
    },

    /// Backend selection failed for the lifetime of the process.
    ///
    /// Selection is attempted once and memoized; subsequent attempts
    /// report the original failure rather than re-probing.
    #[error("backend selection failed: {reason}")]
    SelectionFailed {
        /// Combined reasons from the native and WASM probes.
        reason: String,
    },
}

impl ModuleError {
    /// Creates a load-failure error.
    pub fn load_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-export error.
    pub fn missing_export(name: impl Into<String>) -> Self {
        Self::MissingExport { name: name.into() }
    }
}

/// Facade lifecycle errors.
///
/// Every facade follows uninitialized → initialized → closed. These errors
/// report calls made in the wrong state.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `init()` was called on an already-initialized facade.
    #[error("already initialized")]
    AlreadyInitialized,

    /// A domain operation was called before `init()`.
    #[error("not initialized: call init() first")]
    NotInitialized,

    /// A domain operation was called after `close()`.
    ///
    /// Closed facades cannot be revived; construct a new one to retry.
    #[error("closed: construct a new facade to retry")]
    Closed,
}

/// Validation errors for caller-provided input.
///
/// These are raised in the facade, before any backend call, so they are
/// identical and synchronous regardless of the selected backend.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Vector length doesn't match the configured dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension from configuration.
        expected: usize,
        /// Actual vector length provided.
        actual: usize,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Cross-boundary marshaling errors.
///
/// Raised by the WASM memory arena and by wire payload encode/decode on
/// both backends.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The module's allocator could not satisfy an argument buffer request.
    #[error("arena allocation failed for {requested} bytes")]
    OutOfMemory {
        /// Requested buffer size in bytes.
        requested: usize,
    },

    /// An argument failed to serialize to its wire form.
    #[error("encode failed: {context}")]
    Encode {
        /// Operation and serializer detail.
        context: String,
    },

    /// A result payload was malformed.
    #[error("decode failed: {context}")]
    Decode {
        /// Operation and deserializer detail.
        context: String,
    },

    /// The call signalled a result but the result slot was empty.
    #[error("operation '{operation}' signalled a result but none was available")]
    MissingResult {
        /// Wire name of the operation.
        operation: String,
    },

    /// Linear-memory read or write failed (out-of-bounds offset).
    #[error("linear memory access failed: {context}")]
    Memory {
        /// Operation and access detail.
        context: String,
    },
}

impl MarshalError {
    /// Creates an encode error for the given operation.
    pub fn encode(operation: &str, detail: impl std::fmt::Display) -> Self {
        Self::Encode {
            context: format!("{operation}: {detail}"),
        }
    }

    /// Creates a decode error for the given operation.
    pub fn decode(operation: &str, detail: impl std::fmt::Display) -> Self {
        Self::Decode {
            context: format!("{operation}: {detail}"),
        }
    }

    /// Creates a missing-result error for the given operation.
    pub fn missing_result(operation: impl Into<String>) -> Self {
        Self::MissingResult {
            operation: operation.into(),
        }
    }

    /// Creates a linear-memory access error for the given operation.
    pub fn memory(operation: &str, detail: impl std::fmt::Display) -> Self {
        Self::Memory {
            context: format!("{operation}: {detail}"),
        }
    }
}
