//! Task queue
//!
//! Listener and command bodies run here, each as its own tokio task. One
//! semaphore bounds how many run at once and another bounds how many are
//! outstanding; past that, new work is dropped instead of parked. A `JoinSet`
//! keeps the handles so the client can reap finished tasks and abort the rest
//! on shutdown.

use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outstanding tasks allowed per unit of concurrency
const BACKLOG_FACTOR: usize = 16;

/// Bounded pool of scheduled work
pub struct TaskQueue {
    permits: Arc<Semaphore>,
    backlog: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl TaskQueue {
    /// Queue running at most `capacity` tasks at once, with room for
    /// `16 * capacity` outstanding
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self::with_backlog(capacity, capacity.saturating_mul(BACKLOG_FACTOR))
    }

    /// Queue running at most `capacity` tasks at once and holding at most
    /// `backlog` scheduled but unfinished tasks
    pub fn with_backlog(capacity: usize, backlog: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            backlog: Arc::new(Semaphore::new(backlog.max(capacity))),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Schedule `task`. Errors are logged and panics are caught, so a failing
    /// body never affects other tasks.
    ///
    /// Returns false once the queue has been shut down, or when the backlog is
    /// full and the task was dropped.
    pub fn schedule<F>(&self, label: &'static str, task: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!(task = label, "Task queue closed, dropping task");
            return false;
        }
        let Ok(slot) = Arc::clone(&self.backlog).try_acquire_owned() else {
            tracing::warn!(task = label, pending = self.pending(), "Task queue full, dropping task");
            return false;
        };

        let permits = Arc::clone(&self.permits);
        self.tasks.lock().spawn(async move {
            let _slot = slot;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(task = label, error = %format!("{e:#}"), "Task failed"),
                Err(_) => tracing::error!(task = label, "Task panicked"),
            }
        });
        true
    }

    /// Reap finished tasks; returns how many were reaped
    pub fn drain(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let mut reaped = 0;
        while let Some(result) = tasks.try_join_next() {
            reaped += 1;
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!(error = %e, "Task panicked outside its guard");
                }
            }
        }
        reaped
    }

    /// Tasks scheduled and not yet reaped
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Tasks that can still be scheduled before the backlog is full
    pub fn available(&self) -> usize {
        self.backlog.available_permits()
    }

    /// Wait until every scheduled task has finished
    pub async fn wait_idle(&self) {
        loop {
            self.drain();
            if self.pending() == 0 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    /// Abort outstanding tasks and refuse new ones
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.permits.close();
        self.backlog.close();
        let mut tasks = self.tasks.lock();
        let outstanding = tasks.len();
        tasks.abort_all();
        tasks.detach_all();
        if outstanding > 0 {
            tracing::debug!(outstanding, "Task queue aborted outstanding tasks");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("running_slots", &self.permits.available_permits())
            .field("backlog_slots", &self.available())
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_scheduled_tasks() {
        let queue = TaskQueue::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            queue.schedule("count", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let queue = TaskQueue::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        queue.schedule("boom", async {
            let missing: Option<u8> = None;
            missing.expect("listener bug");
            Ok(())
        });
        queue.schedule("fails", async { Err::<(), _>(anyhow::anyhow!("bad input")) });
        let done = Arc::clone(&counter);
        queue.schedule("after", async move {
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        queue.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let queue = TaskQueue::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            queue.schedule("slow", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.wait_idle().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_backlog_is_bounded() {
        let queue = TaskQueue::with_backlog(1, 3);
        let (release, gate) = tokio::sync::watch::channel(false);

        let mut accepted = 0;
        for _ in 0..5 {
            let mut gate = gate.clone();
            if queue.schedule("blocked", async move {
                while !*gate.borrow_and_update() {
                    if gate.changed().await.is_err() {
                        break;
                    }
                }
                Ok(())
            }) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 3);
        assert_eq!(queue.available(), 0);

        release.send_replace(true);
        queue.wait_idle().await;
        assert_eq!(queue.available(), 3);
        assert!(queue.schedule("after", async { Ok(()) }));
        queue.wait_idle().await;
    }

    #[tokio::test]
    async fn test_shutdown_aborts_and_refuses() {
        let queue = TaskQueue::new(1);
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        queue.schedule("forever", async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        queue.shutdown();
        assert!(!queue.schedule("late", async { Ok(()) }));
        assert_eq!(queue.pending(), 0);
        assert!(!finished.load(Ordering::SeqCst));
    }
}
