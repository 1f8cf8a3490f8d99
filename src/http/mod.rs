//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → loader (current handler, reloading on artifact change)
//!     → event (invocation event + context)
//!     → handler (single-shot invocation)
//!     → response.rs (result mapping or diagnostic page)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use server::{AppState, DevServer};
