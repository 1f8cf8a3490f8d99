//! Handler loading with hot reload.
//!
//! # Data Flow
//! ```text
//! request arrives
//!     → stat artifact (async)          ── error → LoadError::Unavailable
//!     → cached mtime == current mtime? ── yes  → cached handler
//!     → reload lock (single flight), re-check cache
//!     → ArtifactLoader::load (blocking pool)
//!         ├── Ok  → swap Arc<CacheEntry> (handler + mtime together)
//!         └── Err → LoadError::Load, cache untouched
//! ```
//!
//! # Design Decisions
//! - The cache entry is one `Arc`, so readers never see a handler paired with
//!   another artifact's timestamp
//! - A failed reload surfaces immediately unless `keep_last_good` is set
//! - Nothing retries on its own; the next request re-checks the artifact

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use crate::handler::HandlerRef;
use crate::observability::metrics;

/// Why no handler could be obtained.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The artifact is missing or its metadata cannot be read.
    #[error("artifact {} is unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but could not be turned into a handler.
    #[error("failed to load artifact {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

/// Turns an artifact on disk into a fresh handler.
///
/// Each call must produce a new handler from the file's current contents.
pub trait ArtifactLoader: Send + Sync + 'static {
    fn load(&self, path: &Path) -> Result<HandlerRef, LoadError>;
}

struct CacheEntry {
    handler: HandlerRef,
    modified: SystemTime,
}

/// Process-wide handler cache keyed by the artifact's modification time.
pub struct HandlerLoader {
    path: PathBuf,
    artifact_loader: Arc<dyn ArtifactLoader>,
    cache: ArcSwapOption<CacheEntry>,
    reload_lock: Mutex<()>,
    reloads: AtomicU64,
    keep_last_good: bool,
}

impl HandlerLoader {
    pub fn new(path: impl Into<PathBuf>, artifact_loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            path: path.into(),
            artifact_loader,
            cache: ArcSwapOption::empty(),
            reload_lock: Mutex::new(()),
            reloads: AtomicU64::new(0),
            keep_last_good: false,
        }
    }

    /// Serve the previous handler when a reload fails instead of failing fast.
    pub fn keep_last_good(mut self, keep: bool) -> Self {
        self.keep_last_good = keep;
        self
    }

    /// Path of the artifact this loader watches.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful (re)loads so far.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Return the current handler, reloading it if the artifact changed.
    pub async fn obtain(&self) -> Result<HandlerRef, LoadError> {
        let modified = self.modified().await?;
        if let Some(handler) = self.cached(modified) {
            return Ok(handler);
        }

        let _guard = self.reload_lock.lock().await;
        // Another request may have finished the reload while we waited.
        if let Some(handler) = self.cached(modified) {
            return Ok(handler);
        }

        let artifact_loader = self.artifact_loader.clone();
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || artifact_loader.load(&path))
            .await
            .unwrap_or_else(|e| {
                Err(LoadError::Load {
                    path: self.path.clone(),
                    message: format!("loader task failed: {}", e),
                })
            });

        match loaded {
            Ok(handler) => {
                self.cache.store(Some(Arc::new(CacheEntry {
                    handler: handler.clone(),
                    modified,
                })));
                let reloads = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::record_reload();
                tracing::info!(
                    path = %self.path.display(),
                    reloads,
                    "✅ Lambda handler loaded/reloaded at {}",
                    chrono::Local::now().format("%H:%M:%S")
                );
                Ok(handler)
            }
            Err(e) => {
                metrics::record_load_failure();
                tracing::error!(error = %e, "❌ Error loading lambda handler");
                if self.keep_last_good {
                    if let Some(entry) = self.cache.load_full() {
                        tracing::warn!(
                            path = %self.path.display(),
                            "Reload failed; serving the previously loaded handler"
                        );
                        return Ok(entry.handler.clone());
                    }
                }
                Err(e)
            }
        }
    }

    fn cached(&self, modified: SystemTime) -> Option<HandlerRef> {
        self.cache
            .load_full()
            .filter(|entry| entry.modified == modified)
            .map(|entry| entry.handler.clone())
    }

    async fn modified(&self) -> Result<SystemTime, LoadError> {
        let unavailable = |source: std::io::Error| LoadError::Unavailable {
            path: self.path.clone(),
            source,
        };
        let metadata = tokio::fs::metadata(&self.path).await.map_err(unavailable)?;
        metadata.modified().map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FunctionConfig;
    use crate::event::{to_invocation_context, InvocationEvent};
    use crate::handler::{handler_fn, invoke, InvocationResult};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// Hands out handlers answering "v1", "v2", ... and counts loads.
    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicU64,
        failing: AtomicBool,
    }

    impl ArtifactLoader for CountingLoader {
        fn load(&self, path: &Path) -> Result<HandlerRef, LoadError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(LoadError::Load {
                    path: path.to_path_buf(),
                    message: "syntax error".to_string(),
                });
            }
            let generation = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(handler_fn(move |_event, _ctx, done| {
                done.succeed(InvocationResult::ok(format!("v{}", generation)));
                Ok(())
            }))
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf, Arc<CountingLoader>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handler.wasm");
        std::fs::write(&path, b"v1").unwrap();
        (dir, path, Arc::new(CountingLoader::default()))
    }

    fn touch(path: &Path, offset_secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs))
            .unwrap();
    }

    async fn body_of(handler: HandlerRef) -> String {
        let result = invoke(
            handler,
            InvocationEvent::literal("/"),
            to_invocation_context(&FunctionConfig::default()),
        )
        .await
        .unwrap();
        result.body.unwrap()
    }

    #[tokio::test]
    async fn test_unchanged_artifact_is_not_reloaded() {
        let (_dir, path, counting) = setup();
        touch(&path, 0);
        let loader = HandlerLoader::new(&path, counting.clone());

        for _ in 0..5 {
            let handler = loader.obtain().await.unwrap();
            assert_eq!(body_of(handler).await, "v1");
        }
        assert_eq!(loader.reload_count(), 1);
        assert_eq!(counting.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_artifact_is_reloaded_once() {
        let (_dir, path, counting) = setup();
        touch(&path, 0);
        let loader = HandlerLoader::new(&path, counting.clone());
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v1");

        touch(&path, 10);
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v2");
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v2");
        assert_eq!(loader.reload_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_reload() {
        let (_dir, path, counting) = setup();
        touch(&path, 0);
        let loader = Arc::new(HandlerLoader::new(&path, counting.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.obtain().await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(counting.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = HandlerLoader::new(dir.path().join("missing.wasm"), Arc::new(CountingLoader::default()));

        for _ in 0..3 {
            assert!(matches!(loader.obtain().await, Err(LoadError::Unavailable { .. })));
        }
        assert_eq!(loader.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_deleted_artifact_is_unavailable_even_when_cached() {
        let (_dir, path, counting) = setup();
        let loader = HandlerLoader::new(&path, counting);
        assert!(loader.obtain().await.is_ok());

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(loader.obtain().await, Err(LoadError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_failed_reload_fails_fast_and_retries_next_time() {
        let (_dir, path, counting) = setup();
        touch(&path, 0);
        let loader = HandlerLoader::new(&path, counting.clone());
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v1");

        counting.failing.store(true, Ordering::SeqCst);
        touch(&path, 10);
        assert!(matches!(loader.obtain().await, Err(LoadError::Load { .. })));
        assert!(matches!(loader.obtain().await, Err(LoadError::Load { .. })));

        counting.failing.store(false, Ordering::SeqCst);
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v2");
        assert_eq!(loader.reload_count(), 2);
    }

    #[tokio::test]
    async fn test_keep_last_good_serves_previous_handler() {
        let (_dir, path, counting) = setup();
        touch(&path, 0);
        let loader = HandlerLoader::new(&path, counting.clone()).keep_last_good(true);
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v1");

        counting.failing.store(true, Ordering::SeqCst);
        touch(&path, 10);
        assert_eq!(body_of(loader.obtain().await.unwrap()).await, "v1");
        assert_eq!(loader.reload_count(), 1);
    }
}
