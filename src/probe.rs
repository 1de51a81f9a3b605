//! Backend module discovery and platform capability probing.
//!
//! Candidate enumeration is split from filesystem checks: the `*_candidates`
//! functions are pure (explicit root directories in, ordered paths out) so
//! probe order is unit-testable, while [`locate_native`] / [`locate_wasm`]
//! perform the actual existence checks. The first existing candidate wins;
//! if none exist, the error lists every path tried.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ModuleError, Result};
use crate::types::BackendKind;

/// File names probed for the native module, in priority order.
const NATIVE_NAMES: [&str; 3] = ["index.node", "ruvector.node", "ruvector_flow.node"];

/// Base WASM artifact names, in priority order.
const WASM_NAMES: [&str; 2] = ["ruvector.wasm", "ruvector_bg.wasm"];

/// SIMD-enabled WASM artifact, preferred when the host validates SIMD.
const WASM_SIMD_NAME: &str = "ruvector_simd.wasm";

/// A minimal valid module containing one v128-producing function.
///
/// Validates only on hosts with WASM SIMD support, which is exactly the
/// property being probed.
#[cfg(feature = "wasm")]
const SIMD_PROBE_MODULE: [u8; 29] = [
    0x00, 0x61, 0x73, 0x6d, // magic
    0x01, 0x00, 0x00, 0x00, // version
    0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7b, // type: () -> v128
    0x03, 0x02, 0x01, 0x00, // function section
    0x0a, 0x08, 0x01, 0x06, 0x00, 0x41, 0x00, 0xfd, 0x0f, 0x0b, // i32.const 0; i8x16.splat
];

/// Reports whether the runtime accepts SIMD-bearing modules.
///
/// Validates a minimal v128-producing module against the runtime's module
/// validator. Any validation failure means "unsupported"; this never errors.
#[cfg(feature = "wasm")]
pub fn detect_simd(engine: &wasmtime::Engine) -> bool {
    let supported = wasmtime::Module::validate(engine, &SIMD_PROBE_MODULE).is_ok();
    debug!(supported, "probed WASM SIMD support");
    supported
}

/// Default directories probed for the native module: working-directory
/// `native/`, then the running executable's `native/` sibling.
pub fn default_native_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join("native"));
    }
    if let Some(exe_dir) = exe_dir() {
        dirs.push(exe_dir.join("native"));
    }
    dirs
}

/// Default directories probed for the WASM module: working-directory
/// `wasm/`, parent-relative `../../wasm/`, then the running executable's
/// `wasm/` sibling.
pub fn default_wasm_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join("wasm"));
        dirs.push(cwd.join("../../wasm"));
    }
    if let Some(exe_dir) = exe_dir() {
        dirs.push(exe_dir.join("wasm"));
    }
    dirs
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Enumerates native module candidates under the given directories.
///
/// Per directory, in order: `index.node`, `ruvector.node`,
/// `ruvector_flow.node`, `ruvector.<platform>-<arch>.node`.
pub fn native_candidates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let platform_name = format!(
        "ruvector.{}-{}.node",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    let mut candidates = Vec::with_capacity(dirs.len() * (NATIVE_NAMES.len() + 1));
    for dir in dirs {
        for name in NATIVE_NAMES {
            candidates.push(dir.join(name));
        }
        candidates.push(dir.join(&platform_name));
    }
    candidates
}

/// Enumerates WASM module candidates under the given directories.
///
/// Per directory: `ruvector_simd.wasm` first when `simd` is true, then
/// `ruvector.wasm` and `ruvector_bg.wasm`.
pub fn wasm_candidates(dirs: &[PathBuf], simd: bool) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(dirs.len() * (WASM_NAMES.len() + 1));
    for dir in dirs {
        if simd {
            candidates.push(dir.join(WASM_SIMD_NAME));
        }
        for name in WASM_NAMES {
            candidates.push(dir.join(name));
        }
    }
    candidates
}

/// Locates the native module, returning the first existing candidate.
///
/// # Errors
///
/// Returns [`ModuleError::NotFound`] listing every attempted path when no
/// candidate exists.
pub fn locate_native(dirs: &[PathBuf]) -> Result<PathBuf> {
    first_existing(BackendKind::Native, native_candidates(dirs))
}

/// Locates the WASM module, returning the first existing candidate.
///
/// # Errors
///
/// Returns [`ModuleError::NotFound`] listing every attempted path when no
/// candidate exists.
pub fn locate_wasm(dirs: &[PathBuf], simd: bool) -> Result<PathBuf> {
    first_existing(BackendKind::Wasm, wasm_candidates(dirs, simd))
}

fn first_existing(kind: BackendKind, candidates: Vec<PathBuf>) -> Result<PathBuf> {
    for candidate in &candidates {
        if candidate.is_file() {
            debug!(path = %candidate.display(), %kind, "located backend module");
            return Ok(candidate.clone());
        }
    }
    Err(ModuleError::NotFound {
        kind,
        attempted: candidates,
    }
    .into())
}
