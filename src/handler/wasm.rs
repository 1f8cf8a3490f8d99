//! WebAssembly handler artifacts.
//!
//! An artifact is a core Wasm module (binary, or WAT text) that exports:
//!
//! - `memory`
//! - `alloc(len: i32) -> i32`
//! - `handler(event_ptr: i32, event_len: i32, ctx_ptr: i32, ctx_len: i32)`
//!
//! and may import from the `lambda` module:
//!
//! - `succeed(ptr: i32, len: i32)`: result JSON
//! - `fail(ptr: i32, len: i32)`: error text
//! - `log(ptr: i32, len: i32)`: a console line
//!
//! Loading compiles the module and instantiates it once (running its start
//! function). The instance stays warm until the artifact changes, when the
//! whole handler is replaced.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use wasmtime::{Caller, Engine, Linker, Memory, Module, Store, TypedFunc};

use crate::event::{InvocationContext, InvocationEvent};
use crate::handler::{Completion, Handler, HandlerError, HandlerRef, InvocationResult};
use crate::loader::{ArtifactLoader, LoadError};

const HOST_MODULE: &str = "lambda";

/// Per-instance host state; holds the completion of the invocation in flight.
#[derive(Default)]
struct HostState {
    done: Option<Completion>,
    function: String,
}

/// Loads Wasm artifacts into [`WasmHandler`]s. Shares one engine across reloads.
#[derive(Clone, Default)]
pub struct WasmArtifactLoader {
    engine: Engine,
}

impl WasmArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactLoader for WasmArtifactLoader {
    fn load(&self, path: &Path) -> Result<HandlerRef, LoadError> {
        let load_err = |message: String| LoadError::Load {
            path: path.to_path_buf(),
            message,
        };

        // Read the bytes ourselves so the build can replace the file freely.
        let bytes = std::fs::read(path).map_err(|e| load_err(e.to_string()))?;
        let module = Module::new(&self.engine, &bytes).map_err(|e| load_err(format!("{:#}", e)))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "handler".to_string());

        let handler = WasmHandler::new(self.engine.clone(), module, name).map_err(load_err)?;
        Ok(Arc::new(handler))
    }
}

/// A warm instance of a Wasm artifact.
///
/// A guest that traps does not unwind its own state (shadow stack, allocator,
/// locks), so the instance is rebuilt from the compiled module after any
/// failed call.
pub struct WasmHandler {
    name: String,
    engine: Engine,
    module: Module,
    instance: Mutex<WasmInstance>,
}

struct WasmInstance {
    store: Store<HostState>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    handler: TypedFunc<(i32, i32, i32, i32), ()>,
}

impl fmt::Debug for WasmHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmHandler").field("name", &self.name).finish()
    }
}

impl WasmHandler {
    fn new(engine: Engine, module: Module, name: String) -> Result<Self, String> {
        let instance = WasmInstance::instantiate(&engine, &module, &name)?;
        Ok(Self {
            name,
            engine,
            module,
            instance: Mutex::new(instance),
        })
    }
}

impl Handler for WasmHandler {
    fn call(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
        done: Completion,
    ) -> Result<(), HandlerError> {
        let event_json = serde_json::to_vec(&event)
            .map_err(|e| HandlerError::new(format!("failed to encode event: {}", e)))?;
        let context_json = serde_json::to_vec(&context)
            .map_err(|e| HandlerError::new(format!("failed to encode context: {}", e)))?;

        // One invocation at a time per instance, like a single warm container.
        let mut instance = self.instance.lock().unwrap_or_else(PoisonError::into_inner);
        instance.store.data_mut().done = Some(done);
        let outcome = instance.run(&event_json, &context_json);
        instance.store.data_mut().done = None;

        if outcome.is_err() {
            match WasmInstance::instantiate(&self.engine, &self.module, &self.name) {
                Ok(fresh) => {
                    *instance = fresh;
                    tracing::debug!(function = %self.name, "Guest instance rebuilt after a failed call");
                }
                Err(e) => tracing::error!(
                    function = %self.name,
                    error = %e,
                    "Failed to rebuild guest instance; keeping the previous one"
                ),
            }
        }
        outcome
    }
}

impl WasmInstance {
    fn instantiate(engine: &Engine, module: &Module, name: &str) -> Result<Self, String> {
        let mut linker: Linker<HostState> = Linker::new(engine);
        define_host_functions(&mut linker)?;

        let mut store = Store::new(
            engine,
            HostState {
                done: None,
                function: name.to_string(),
            },
        );

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| format!("instantiation failed: {:?}", e))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| "artifact does not export `memory`".to_string())?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .map_err(|e| format!("artifact does not export `alloc(i32) -> i32`: {:#}", e))?;
        let handler = instance
            .get_typed_func::<(i32, i32, i32, i32), ()>(&mut store, "handler")
            .map_err(|e| format!("artifact does not export `handler(i32, i32, i32, i32)`: {:#}", e))?;

        Ok(Self {
            store,
            memory,
            alloc,
            handler,
        })
    }

    fn run(&mut self, event: &[u8], context: &[u8]) -> Result<(), HandlerError> {
        let (event_ptr, event_len) = self.write(event)?;
        let (ctx_ptr, ctx_len) = self.write(context)?;

        self.handler
            .call(&mut self.store, (event_ptr, event_len, ctx_ptr, ctx_len))
            .map_err(|e| HandlerError::with_trace(format!("{:#}", e), format!("{:?}", e)))
    }

    /// Copy `bytes` into guest memory obtained from the guest's `alloc`.
    fn write(&mut self, bytes: &[u8]) -> Result<(i32, i32), HandlerError> {
        let len = i32::try_from(bytes.len())
            .map_err(|_| HandlerError::new("payload does not fit in guest memory"))?;
        let ptr = self
            .alloc
            .call(&mut self.store, len)
            .map_err(|e| HandlerError::with_trace(format!("guest alloc failed: {:#}", e), format!("{:?}", e)))?;
        let offset = usize::try_from(ptr)
            .map_err(|_| HandlerError::new(format!("guest alloc returned invalid pointer {}", ptr)))?;
        self.memory
            .write(&mut self.store, offset, bytes)
            .map_err(|e| HandlerError::new(format!("guest alloc returned unusable region: {}", e)))?;
        Ok((ptr, len))
    }
}

fn define_host_functions(linker: &mut Linker<HostState>) -> Result<(), String> {
    linker
        .func_wrap(HOST_MODULE, "succeed", |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
            let payload = read_guest_string(&mut caller, ptr, len);
            let Some(done) = caller.data().done.clone() else {
                return;
            };
            match payload {
                Some(json) => match serde_json::from_str::<InvocationResult>(&json) {
                    Ok(result) => {
                        done.succeed(result);
                    }
                    Err(e) => {
                        let message = format!("handler completed with a malformed result: {}", e);
                        let trace = format!("{}\n\n{}", message, json);
                        done.fail(HandlerError::with_trace(message, trace));
                    }
                },
                None => {
                    done.fail(HandlerError::new("handler completed with an out-of-bounds result"));
                }
            }
        })
        .map_err(|e| format!("failed to define lambda.succeed: {:#}", e))?;

    linker
        .func_wrap(HOST_MODULE, "fail", |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
            let message = read_guest_string(&mut caller, ptr, len)
                .unwrap_or_else(|| "handler failed with an out-of-bounds error message".to_string());
            if let Some(done) = caller.data().done.clone() {
                done.fail(HandlerError::new(message));
            }
        })
        .map_err(|e| format!("failed to define lambda.fail: {:#}", e))?;

    linker
        .func_wrap(HOST_MODULE, "log", |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
            if let Some(line) = read_guest_string(&mut caller, ptr, len) {
                tracing::info!(target: "lambda_dev_server::guest", function = %caller.data().function, "{}", line);
            }
        })
        .map_err(|e| format!("failed to define lambda.log: {:#}", e))?;

    Ok(())
}

fn read_guest_string(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Option<String> {
    let memory = caller.get_export("memory")?.into_memory()?;
    let start = usize::try_from(ptr).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    let bytes = memory.data(&*caller).get(start..end)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}
