//! Trailing-edge debounce for background sync.
//!
//! Bursts of local edits collapse into one sync pass that runs once the
//! quiet window has elapsed with no further `schedule()` calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::SchedulerError;

/// Quiet window used when none is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(2000);

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type SyncJob = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct PendingTimer {
    handle: JoinHandle<()>,
    /// Set once the window elapsed and the job started; a started job is
    /// never aborted.
    fired: Arc<AtomicBool>,
}

impl PendingTimer {
    fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

pub struct SyncScheduler {
    window: Duration,
    job: SyncJob,
    pending: Mutex<Option<PendingTimer>>,
}

impl SyncScheduler {
    pub fn new(window: Duration, job: SyncJob) -> Self {
        Self {
            window,
            job,
            pending: Mutex::new(None),
        }
    }

    pub fn from_fn<F, Fut>(window: Duration, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(window, Arc::new(move || -> JobFuture { Box::pin(f()) }))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingTimer>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restart the quiet window. Any timer that has not fired yet is replaced.
    pub fn schedule(&self) -> Result<(), SchedulerError> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let mut pending = self.pending();
        if let Some(previous) = pending.take() {
            if !previous.has_fired() {
                previous.handle.abort();
            }
        }

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let job = Arc::clone(&self.job);
        let window = self.window;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            flag.store(true, Ordering::SeqCst);
            log::debug!("sync window elapsed, running sync");
            job().await;
        });

        *pending = Some(PendingTimer { handle, fired });
        Ok(())
    }

    /// Drop the pending timer, if it has not fired. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        match self.pending().take() {
            Some(timer) if !timer.has_fired() => {
                timer.handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|t| !t.has_fired() && !t.handle.is_finished())
    }

    /// Skip the rest of the window and run the job now.
    pub async fn flush(&self) {
        self.cancel();
        (self.job)().await;
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(window_ms: u64) -> (SyncScheduler, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let scheduler = SyncScheduler::from_fn(Duration::from_millis(window_ms), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (scheduler, runs)
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_run() {
        let (scheduler, runs) = counting(2000);
        for _ in 0..10 {
            scheduler.schedule().unwrap();
        }
        assert!(scheduler.is_pending());
        wait(2100).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_restarts_the_window() {
        let (scheduler, runs) = counting(2000);
        for _ in 0..5 {
            scheduler.schedule().unwrap();
            wait(1500).await;
            assert_eq!(runs.load(Ordering::SeqCst), 0);
        }
        wait(600).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_run_separately() {
        let (scheduler, runs) = counting(2000);
        scheduler.schedule().unwrap();
        wait(2100).await;
        scheduler.schedule().unwrap();
        scheduler.schedule().unwrap();
        wait(2100).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_run() {
        let (scheduler, runs) = counting(2000);
        scheduler.schedule().unwrap();
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        wait(3000).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_immediately_once() {
        let (scheduler, runs) = counting(2000);
        scheduler.schedule().unwrap();
        scheduler.flush().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        wait(3000).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schedule_without_runtime_fails() {
        let (scheduler, _) = counting(2000);
        assert_eq!(scheduler.schedule(), Err(SchedulerError::NoRuntime));
    }
}
