//! Handler contract subsystem.
//!
//! # Data Flow
//! ```text
//! InvocationEvent + InvocationContext
//!     → Handler::call(event, context, Completion)
//!         ├── completes synchronously (inside call)
//!         ├── completes later (moves Completion into a task)
//!         └── returns Err (a "throw")
//!     → completion.rs (single-shot cell, first resolution wins)
//!     → InvocationResult | InvocationError
//! ```
//!
//! # Design Decisions
//! - Any `Fn(event, context, Completion)` closure is a handler
//! - Handlers run on the blocking pool; compiled guests are CPU-bound
//! - Dropping every `Completion` without resolving is reported, never awaited forever

pub mod completion;
pub mod result;
pub mod wasm;

use std::sync::Arc;

use crate::event::{InvocationContext, InvocationEvent};

pub use completion::{invoke, Completion, InvocationError};
pub use result::InvocationResult;
pub use wasm::WasmArtifactLoader;

/// An error thrown by a handler, or reported through its completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    /// Descriptive trace (stack/backtrace text) when the source provides one.
    pub trace: Option<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: Some(trace.into()),
        }
    }

    /// The text shown on the diagnostic page: the trace if any, else the message.
    pub fn trace_text(&self) -> &str {
        self.trace.as_deref().unwrap_or(&self.message)
    }
}

/// A request handler following the (event, context, completion) convention.
pub trait Handler: Send + Sync {
    /// Start handling one invocation.
    ///
    /// The handler resolves `done` exactly once, before or after returning.
    /// Returning `Err` counts as a failure unless `done` was already resolved.
    fn call(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
        done: Completion,
    ) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(InvocationEvent, InvocationContext, Completion) -> Result<(), HandlerError> + Send + Sync,
{
    fn call(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
        done: Completion,
    ) -> Result<(), HandlerError> {
        self(event, context, done)
    }
}

/// Shared reference to the current handler. Replaced wholesale on reload.
pub type HandlerRef = Arc<dyn Handler>;

/// Wrap a closure as a [`HandlerRef`].
pub fn handler_fn<F>(f: F) -> HandlerRef
where
    F: Fn(InvocationEvent, InvocationContext, Completion) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}
