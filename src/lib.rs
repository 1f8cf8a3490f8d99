//! Local development harness for a serverless HTTP handler.
//!
//! Three cooperating tools share this library:
//! - `lambda-dev-server`: serves HTTP by invoking the compiled handler,
//!   reloading it whenever the artifact on disk changes
//! - `lambda-watch`: rebuilds the artifact when sources change
//! - `test-lambda`: invokes the handler directly for a table of routes

pub mod config;
pub mod event;
pub mod handler;
pub mod harness;
pub mod http;
pub mod lifecycle;
pub mod loader;
pub mod observability;
pub mod watch;

pub use config::DevConfig;
pub use http::DevServer;
pub use lifecycle::Shutdown;
pub use loader::HandlerLoader;
