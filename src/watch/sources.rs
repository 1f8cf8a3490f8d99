//! Source tree watching.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::BuildConfig;

/// Watches source directories and forwards relevant changed paths.
pub struct SourceWatcher {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
    change_tx: mpsc::UnboundedSender<PathBuf>,
}

impl SourceWatcher {
    /// Create a new SourceWatcher.
    ///
    /// Returns the watcher and a receiver for changed source paths.
    pub fn new(config: &BuildConfig) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                dirs: config.watch_dirs.iter().map(PathBuf::from).collect(),
                extensions: config.extensions.clone(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// A directory that cannot be watched is logged and skipped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let extensions = self.extensions.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    for path in event.paths.into_iter().filter(|p| is_watched(p, &extensions)) {
                        tracing::info!("📝 File changed: {}", path.display());
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;

        for dir in &self.dirs {
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(()) => tracing::info!("👀 Watching directory: {}", dir.display()),
                Err(e) => tracing::error!(error = %e, "❌ Error watching directory {}", dir.display()),
            }
        }

        Ok(watcher)
    }
}

/// Whether a change to `path` should trigger a rebuild.
pub fn is_watched(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}
