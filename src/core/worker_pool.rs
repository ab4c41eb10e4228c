//! Worker pool draining a [`TaskScheduler`](crate::core::TaskScheduler).
//!
//! Each worker is a loop that asks the scheduler for the next ready task,
//! runs the caller's [`TaskExecutor`](crate::core::TaskExecutor) bounded by
//! the task's timeout, and reports the outcome back through
//! `complete_task` / `fail_task`. Workers never touch scheduler state
//! directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_task_core::config::{SchedulerConfig, WorkerPoolConfig};
//! use agent_task_core::core::{TaskScheduler, TaskSpec, WorkerPool};
//!
//! let scheduler = Arc::new(TaskScheduler::new(SchedulerConfig::default())?);
//! let pool = WorkerPool::new(
//!     Arc::clone(&scheduler),
//!     my_executor,  // Implements TaskExecutor
//!     WorkerPoolConfig::new().with_worker_count(4),
//! )?;
//!
//! let _guard = pool.start()?;  // stop() runs when the guard drops
//! scheduler.add_task(TaskSpec::new("ingest", job))?;
//! let outcomes = scheduler.wait_for_completion(&["ingest"], Some(Duration::from_secs(60)))?;
//! ```

mod native;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Failure reason reported when an attempt exceeds its timeout.
pub const TIMEOUT_REASON: &str = "timeout";

/// Statistics about pool utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolStats {
    /// Configured number of workers.
    pub worker_count: usize,
    /// Workers currently executing a task.
    pub busy_workers: usize,
    /// Attempts started.
    pub attempts: u64,
    /// Attempts that returned a result.
    pub succeeded: u64,
    /// Attempts that returned an error.
    pub failed: u64,
    /// Attempts cut off by their timeout.
    pub timed_out: u64,
    /// Attempts whose executor panicked.
    pub panicked: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    pub busy_workers: AtomicUsize,
    pub attempts: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub panicked: AtomicU64,
}

impl WorkerCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> WorkerPoolStats {
        WorkerPoolStats {
            worker_count,
            busy_workers: self.busy_workers.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// How one executor attempt ended.
#[derive(Debug)]
pub(crate) enum Attempt<R> {
    Succeeded(R),
    Failed(String),
    TimedOut,
    Panicked(String),
}

impl<R> Attempt<R> {
    /// Bump the counter matching this outcome.
    pub fn count(&self, counters: &WorkerCounters) {
        let counter = match self {
            Self::Succeeded(_) => &counters.succeeded,
            Self::Failed(_) => &counters.failed,
            Self::TimedOut => &counters.timed_out,
            Self::Panicked(_) => &counters.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub use native::{PoolGuard, WorkerPool};
