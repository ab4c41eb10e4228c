//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_idle_poll_interval_ms() -> u64 {
    100
}

const fn default_thread_stack_size() -> usize {
    2 * 1024 * 1024
}

fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Configuration for a [`WorkerPool`](crate::core::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// How long an idle worker waits before asking the scheduler again.
    #[serde(default = "default_idle_poll_interval_ms")]
    pub idle_poll_interval_ms: u64,
    /// Stack size for each worker thread.
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            idle_poll_interval_ms: default_idle_poll_interval_ms(),
            thread_stack_size: default_thread_stack_size(),
        }
    }
}

impl WorkerPoolConfig {
    /// Defaults: one worker per CPU, 100 ms idle interval, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the idle wait between scheduler polls.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Idle wait as a `Duration`.
    #[must_use]
    pub const fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }

    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.idle_poll_interval_ms == 0 {
            return Err("idle_poll_interval_ms must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}
