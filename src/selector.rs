//! Backend selection and the shared execution context.
//!
//! Selection is native-first: if a native module file exists in one of the
//! probe directories, it is loaded; otherwise the WASM probe runs. Only
//! when both probes fail does selection report an error, combining both
//! failure reasons.
//!
//! [`BackendContext::shared`] performs selection once per process and
//! memoizes the outcome, success or failure. Facades default to the shared
//! context but accept an explicit one for isolation in tests and for
//! embedders that manage module paths themselves.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info, instrument};

use crate::backend::Backend;
use crate::error::{ModuleError, Result};
use crate::handle::HandleRegistry;
use crate::probe;
use crate::types::BackendKind;

/// Module search configuration for [`BackendContext::select`].
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    /// Directories probed for native module files, in priority order.
    pub native_dirs: Vec<std::path::PathBuf>,
    /// Directories probed for WASM module files, in priority order.
    pub wasm_dirs: Vec<std::path::PathBuf>,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            native_dirs: probe::default_native_dirs(),
            wasm_dirs: probe::default_wasm_dirs(),
        }
    }
}

/// A selected backend plus the handle registry scoped to it.
///
/// Everything a facade needs to dispatch: the backend implementation and
/// the registry that validates its handles. Contexts are cheap to share;
/// facades hold an `Arc` to one.
pub struct BackendContext {
    backend: Arc<dyn Backend>,
    registry: HandleRegistry,
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("kind", &self.backend.kind())
            .finish_non_exhaustive()
    }
}

impl BackendContext {
    /// Runs backend selection with the given options.
    ///
    /// Native is preferred; WASM is the fallback. Compile-time features
    /// narrow the candidates: with only one backend feature enabled, only
    /// that probe runs.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::SelectionFailed`] when no backend could be
    /// loaded, with every probe's failure reason in the message.
    #[instrument(skip_all)]
    pub fn select(options: &SelectorOptions) -> Result<Self> {
        let mut reasons: Vec<String> = Vec::new();

        #[cfg(feature = "native")]
        {
            debug!(dirs = ?options.native_dirs, "probing for native module");
            match probe::locate_native(&options.native_dirs)
                .and_then(|path| crate::backend::NativeBackend::load(&path))
            {
                Ok(backend) => {
                    info!(backend = %BackendKind::Native, "backend selected");
                    return Ok(Self::with_backend(Arc::new(backend)));
                }
                Err(e) => reasons.push(format!("native: {e}")),
            }
        }

        #[cfg(feature = "wasm")]
        {
            debug!(dirs = ?options.wasm_dirs, "probing for wasm module");
            let engine = wasmtime::Engine::default();
            let simd = probe::detect_simd(&engine);
            match probe::locate_wasm(&options.wasm_dirs, simd)
                .and_then(|path| crate::backend::WasmBackend::load(&engine, &path))
            {
                Ok(backend) => {
                    info!(backend = %BackendKind::Wasm, simd, "backend selected");
                    return Ok(Self::with_backend(Arc::new(backend)));
                }
                Err(e) => reasons.push(format!("wasm: {e}")),
            }
        }

        #[cfg(not(any(feature = "native", feature = "wasm")))]
        let _ = options;

        Err(ModuleError::SelectionFailed {
            reason: reasons.join("; "),
        }
        .into())
    }

    /// Wraps an already-constructed backend in a fresh context.
    ///
    /// The primary seam for tests and embedders: any [`Backend`]
    /// implementation gets its own handle registry.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            registry: HandleRegistry::new(),
        }
    }

    /// The process-wide shared context, selected on first use.
    ///
    /// Selection runs at most once; both success and failure are memoized,
    /// so a failed probe is not retried even if module files appear later.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::SelectionFailed`] with the originally
    /// recorded reason whenever the first selection failed.
    pub fn shared() -> Result<Arc<Self>> {
        static SHARED: OnceLock<std::result::Result<Arc<BackendContext>, String>> = OnceLock::new();
        let outcome = SHARED.get_or_init(|| {
            Self::select(&SelectorOptions::default())
                .map(Arc::new)
                .map_err(|e| e.to_string())
        });
        match outcome {
            Ok(ctx) => Ok(Arc::clone(ctx)),
            Err(reason) => Err(ModuleError::SelectionFailed {
                reason: reason.clone(),
            }
            .into()),
        }
    }

    /// The selected backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Which backend was selected.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The handle registry scoped to this context.
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_empty_dirs_reports_both_probes() {
        let options = SelectorOptions {
            native_dirs: Vec::new(),
            wasm_dirs: Vec::new(),
        };
        let err = BackendContext::select(&options).unwrap_err();
        assert!(err.is_module());

        let msg = err.to_string();
        #[cfg(feature = "native")]
        assert!(msg.contains("native:"));
        #[cfg(feature = "wasm")]
        assert!(msg.contains("wasm:"));
    }

    #[test]
    fn test_select_missing_modules_lists_attempted_paths() {
        let dir = tempfile::tempdir().unwrap();
        let options = SelectorOptions {
            native_dirs: vec![dir.path().to_path_buf()],
            wasm_dirs: vec![dir.path().to_path_buf()],
        };
        let err = BackendContext::select(&options).unwrap_err();
        assert!(err.to_string().contains("selection failed"));
    }

    #[test]
    fn test_default_options_nonempty() {
        let options = SelectorOptions::default();
        assert!(!options.native_dirs.is_empty());
        assert!(!options.wasm_dirs.is_empty());
    }
}
