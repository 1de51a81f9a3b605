//! Linear-memory arena for the WASM backend.
//!
//! All data exchange with the module goes through its exported linear
//! memory, using four primitives: `alloc`/`dealloc` for argument buffers
//! and the single-slot result protocol `get_result_ptr`/`get_result_len`
//! populated by the previous call.
//!
//! The arena owns the store, instance, and memory. It is **not** internally
//! synchronized: the result slot is valid only until the next call on the
//! same instance, so [`super::WasmBackend`] keeps the arena behind a mutex
//! and never lets two marshaled calls overlap.
//!
//! Call contract, per marshaled invocation:
//! 1. serialize the argument to bytes
//! 2. `alloc` a buffer and copy the bytes into linear memory
//! 3. invoke the export with `(handle, ptr, len)`
//! 4. `dealloc(ptr, len)` on every exit path — the callee has consumed the
//!    input by the time the call returns and retains no reference to it
//! 5. on a non-zero return flag, copy the result slot out and decode

use std::path::Path;

use wasmtime::{Engine, Instance, Memory, Module, Store, TypedFunc};

use crate::error::{MarshalError, ModuleError, Result, RuvectorError};

/// Owns one instantiated module and its marshaling primitives.
pub(crate) struct Arena {
    store: Store<()>,
    instance: Instance,
    memory: Memory,
    alloc: TypedFunc<u32, u32>,
    dealloc: TypedFunc<(u32, u32), ()>,
    result_ptr: TypedFunc<(), u32>,
    result_len: TypedFunc<(), u32>,
}

impl Arena {
    /// Instantiates the module at `path` and binds the required exports.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::LoadFailure`] if the file fails to parse or
    /// instantiate, and [`ModuleError::MissingExport`] if any of `memory`,
    /// `alloc`, `dealloc`, `get_result_ptr`, or `get_result_len` is absent
    /// or has the wrong shape.
    pub(crate) fn instantiate(engine: &Engine, path: &Path) -> Result<Self> {
        let module = Module::from_file(engine, path)
            .map_err(|e| ModuleError::load_failure(path, e.to_string()))?;

        let mut store = Store::new(engine, ());
        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| ModuleError::load_failure(path, e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| ModuleError::missing_export("memory"))?;
        let alloc = instance
            .get_typed_func::<u32, u32>(&mut store, "alloc")
            .map_err(|_| ModuleError::missing_export("alloc"))?;
        let dealloc = instance
            .get_typed_func::<(u32, u32), ()>(&mut store, "dealloc")
            .map_err(|_| ModuleError::missing_export("dealloc"))?;
        let result_ptr = instance
            .get_typed_func::<(), u32>(&mut store, "get_result_ptr")
            .map_err(|_| ModuleError::missing_export("get_result_ptr"))?;
        let result_len = instance
            .get_typed_func::<(), u32>(&mut store, "get_result_len")
            .map_err(|_| ModuleError::missing_export("get_result_len"))?;

        Ok(Self {
            store,
            instance,
            memory,
            alloc,
            dealloc,
            result_ptr,
            result_len,
        })
    }

    /// Invokes a handle-taking export, returning its result payload if the
    /// return flag signalled one.
    pub(crate) fn invoke_op(
        &mut self,
        op: &str,
        handle: u32,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let func = self
            .instance
            .get_typed_func::<(u32, u32, u32), u32>(&mut self.store, op)
            .map_err(|_| ModuleError::missing_export(op))?;

        let (ptr, len) = self.write_arg(op, payload)?;
        let call = func.call(&mut self.store, (handle, ptr, len));
        // The callee has consumed the argument; release it even on a trap
        let dealloc = self.dealloc_arg(op, ptr, len);
        let flag = call.map_err(|trap| RuvectorError::backend(format!("{op}: {trap}")))?;
        dealloc?;

        if flag == 0 {
            Ok(None)
        } else {
            Ok(Some(self.read_result(op)?))
        }
    }

    /// Invokes a constructor export, returning the raw handle it produced.
    pub(crate) fn invoke_ctor(&mut self, op: &str, payload: &[u8]) -> Result<u32> {
        let func = self
            .instance
            .get_typed_func::<(u32, u32), u32>(&mut self.store, op)
            .map_err(|_| ModuleError::missing_export(op))?;

        let (ptr, len) = self.write_arg(op, payload)?;
        let call = func.call(&mut self.store, (ptr, len));
        let dealloc = self.dealloc_arg(op, ptr, len);
        let handle = call.map_err(|trap| RuvectorError::backend(format!("{op}: {trap}")))?;
        dealloc?;

        if handle == 0 {
            Err(RuvectorError::backend(format!(
                "{op}: module returned a null handle"
            )))
        } else {
            Ok(handle)
        }
    }

    /// Copies an argument into module memory, returning `(ptr, len)`.
    ///
    /// Empty payloads are passed as `(0, 0)` without touching the allocator.
    fn write_arg(&mut self, op: &str, payload: &[u8]) -> Result<(u32, u32)> {
        if payload.is_empty() {
            return Ok((0, 0));
        }

        let len = payload.len() as u32;
        let ptr = self
            .alloc
            .call(&mut self.store, len)
            .map_err(|trap| RuvectorError::backend(format!("{op}: alloc: {trap}")))?;
        if ptr == 0 {
            return Err(MarshalError::OutOfMemory {
                requested: payload.len(),
            }
            .into());
        }

        if let Err(e) = self.memory.write(&mut self.store, ptr as usize, payload) {
            // Don't leak the buffer the failed write was destined for
            self.dealloc_arg(op, ptr, len)?;
            return Err(MarshalError::memory(op, e).into());
        }
        Ok((ptr, len))
    }

    /// Releases an argument buffer. `(0, 0)` is a no-op.
    fn dealloc_arg(&mut self, op: &str, ptr: u32, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.dealloc
            .call(&mut self.store, (ptr, len))
            .map_err(|trap| RuvectorError::backend(format!("{op}: dealloc: {trap}")))
    }

    /// Copies the single-slot result out of linear memory.
    ///
    /// Must be called before any further invocation on this instance; the
    /// slot is overwritten by the next call.
    fn read_result(&mut self, op: &str) -> Result<Vec<u8>> {
        let ptr = self
            .result_ptr
            .call(&mut self.store, ())
            .map_err(|trap| RuvectorError::backend(format!("{op}: get_result_ptr: {trap}")))?;
        let len = self
            .result_len
            .call(&mut self.store, ())
            .map_err(|trap| RuvectorError::backend(format!("{op}: get_result_len: {trap}")))?;

        if len == 0 {
            return Err(MarshalError::missing_result(op).into());
        }

        let mut bytes = vec![0u8; len as usize];
        self.memory
            .read(&self.store, ptr as usize, &mut bytes)
            .map_err(|e| MarshalError::memory(op, e))?;
        Ok(bytes)
    }
}
