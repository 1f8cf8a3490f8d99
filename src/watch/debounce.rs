//! Debounced, serialized build scheduling.
//!
//! # State Machine
//! ```text
//! IDLE ──change──▶ WAITING ──change──▶ WAITING (deadline moved)
//!                     │
//!                  deadline
//!                     ▼
//!        build running? ── yes ──▶ drop trigger, IDLE
//!                     │ no
//!                     ▼
//!                 BUILDING ──done──▶ IDLE
//! ```
//!
//! Changes that arrive while building still move the deadline; the trigger
//! they produce is dropped if the build has not finished by then.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::watch::runner::{BuildOutcome, BuildRunner};

/// Coalesces source changes into builds, one at a time.
pub struct BuildWatcher<R> {
    runner: Arc<R>,
    debounce: Duration,
    build_on_start: bool,
}

impl<R: BuildRunner> BuildWatcher<R> {
    pub fn new(runner: Arc<R>, debounce: Duration) -> Self {
        Self {
            runner,
            debounce,
            build_on_start: true,
        }
    }

    /// Whether to build once immediately, before any change is seen.
    pub fn build_on_start(mut self, enabled: bool) -> Self {
        self.build_on_start = enabled;
        self
    }

    /// Process change notifications until shutdown or until every sender is gone.
    pub async fn run(
        self,
        mut changes: mpsc::UnboundedReceiver<PathBuf>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut deadline: Option<Instant> = None;
        let mut building: Option<JoinHandle<BuildOutcome>> = None;

        if self.build_on_start {
            building = Some(self.spawn_build());
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("👋 Stopping file watcher...");
                    break;
                }
                change = changes.recv() => match change {
                    Some(path) => {
                        tracing::debug!(path = %path.display(), "Rebuild scheduled");
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    None => {
                        tracing::warn!("Change feed closed, stopping build watcher");
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    deadline = None;
                    if building.is_some() {
                        tracing::info!("⏳ Build already in progress, skipping...");
                    } else {
                        building = Some(self.spawn_build());
                    }
                }
                outcome = wait_for(&mut building) => {
                    building = None;
                    match outcome {
                        Some(outcome) => tracing::debug!(outcome = outcome.as_str(), "Build finished"),
                        None => tracing::error!("Build task ended abnormally"),
                    }
                }
            }
        }
    }

    fn spawn_build(&self) -> JoinHandle<BuildOutcome> {
        let runner = self.runner.clone();
        tokio::spawn(async move { runner.run().await })
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Resolves when the running build ends; `None` if its task panicked.
async fn wait_for(building: &mut Option<JoinHandle<BuildOutcome>>) -> Option<BuildOutcome> {
    match building {
        Some(task) => task.await.ok(),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    /// Records when each build started and how many overlap.
    struct RecordingRunner {
        duration: Duration,
        starts: Mutex<Vec<Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl RecordingRunner {
        fn new(duration: Duration) -> Arc<Self> {
            Arc::new(Self {
                duration,
                starts: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.starts.lock().unwrap().len()
        }
    }

    impl BuildRunner for RecordingRunner {
        async fn run(&self) -> BuildOutcome {
            self.starts.lock().unwrap().push(Instant::now());
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            sleep(self.duration).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            BuildOutcome::Success
        }
    }

    fn change() -> PathBuf {
        PathBuf::from("src/handler.rs")
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_builds_once_after_last_change() {
        let runner = RecordingRunner::new(Duration::from_millis(10));
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let watcher = BuildWatcher::new(runner.clone(), Duration::from_millis(1000)).build_on_start(false);
        let task = tokio::spawn(watcher.run(rx, shutdown.subscribe()));

        let mut last_change = Instant::now();
        for _ in 0..5 {
            last_change = Instant::now();
            tx.send(change()).unwrap();
            sleep(Duration::from_millis(300)).await;
        }

        // 300ms after the last change; a deadline counted from the first one
        // would already have fired.
        sleep(Duration::from_millis(600)).await;
        assert_eq!(runner.count(), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(runner.count(), 1);
        let started = runner.starts.lock().unwrap()[0];
        assert!(started >= last_change + Duration::from_millis(1000));

        sleep(Duration::from_secs(5)).await;
        assert_eq!(runner.count(), 1);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_during_build_is_dropped() {
        let runner = RecordingRunner::new(Duration::from_secs(5));
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let watcher = BuildWatcher::new(runner.clone(), Duration::from_millis(1000)).build_on_start(false);
        let task = tokio::spawn(watcher.run(rx, shutdown.subscribe()));

        // Build runs from t=1s to t=6s.
        tx.send(change()).unwrap();
        sleep(Duration::from_millis(2000)).await;
        assert_eq!(runner.count(), 1);

        // Fires at t=3s while the first build is still running.
        tx.send(change()).unwrap();
        sleep(Duration::from_millis(5000)).await;
        assert_eq!(runner.count(), 1);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);

        // A fresh change after the build finished is honored.
        tx.send(change()).unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(runner.count(), 2);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_build_runs_without_changes() {
        let runner = RecordingRunner::new(Duration::from_millis(10));
        let (_tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(
            BuildWatcher::new(runner.clone(), Duration::from_millis(1000)).run(rx, shutdown.subscribe()),
        );

        sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.count(), 1);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_change_feed_closes() {
        let runner = RecordingRunner::new(Duration::from_millis(10));
        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(
            BuildWatcher::new(runner, Duration::from_millis(1000))
                .build_on_start(false)
                .run(rx, shutdown.subscribe()),
        );

        drop(tx);
        task.await.unwrap();
    }
}
