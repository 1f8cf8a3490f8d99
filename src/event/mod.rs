//! Event translation subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request (axum)
//!     → translate.rs (URL resolution, header flattening, query parsing)
//!     → InvocationEvent (v2 nested + v1 flat shapes at once)
//!
//! FunctionConfig
//!     → translate.rs (fresh request id, log stream name)
//!     → InvocationContext
//! ```
//!
//! # Design Decisions
//! - Both calling conventions are populated so handlers can target either
//! - Request bodies are never forwarded (`body` is always null)
//! - The remaining-time value is a fixed budget, not an enforced deadline

pub mod translate;
pub mod types;

pub use translate::{to_invocation_context, to_invocation_event, FALLBACK_AUTHORITY};
pub use types::{HttpContext, InvocationContext, InvocationEvent, RequestContext};
