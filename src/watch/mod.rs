//! Build-watch subsystem.
//!
//! # Data Flow
//! ```text
//! notify events (sources.rs, filtered by extension)
//!     → mpsc channel of changed paths
//!     → BuildWatcher (debounce.rs: quiet period, one build at a time)
//!     → BuildRunner (runner.rs: `sh -c <command>`, inherited stdio)
//!     → new artifact on disk, picked up by the dev server on the next request
//! ```

pub mod debounce;
pub mod runner;
pub mod sources;

pub use debounce::BuildWatcher;
pub use runner::{BuildOutcome, BuildRunner, CommandRunner};
pub use sources::{is_watched, SourceWatcher};
