//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker is a dedicated OS thread with its own single-threaded tokio
//! runtime, so executor work never blocks the caller's async runtime.
//!
//! # Design Principles
//!
//! - **No busy polling**: idle workers park on the scheduler's work signal,
//!   bounded by the configured idle interval
//! - **Panic isolation**: each attempt is spawned onto the worker's runtime,
//!   so a panicking executor surfaces as a failed attempt
//! - **Clean shutdown**: `stop` clears the running flag, wakes parked
//!   workers and joins every thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::SchedulerError;
use crate::core::executor::TaskExecutor;
use crate::core::handler::panic_message;
use crate::core::scheduler::TaskScheduler;
use crate::core::task::DispatchedTask;

use super::{Attempt, WorkerCounters, WorkerPoolStats, TIMEOUT_REASON};

/// Fixed-size pool of worker threads feeding an executor from a scheduler.
///
/// `start` and `stop` are paired through the [`PoolGuard`] returned by
/// `start`; dropping the pool also stops it.
pub struct WorkerPool<P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Shared scheduler the workers pull from.
    scheduler: Arc<TaskScheduler<P, R>>,

    /// Executor cloned into every worker.
    executor: E,

    /// Worker loop running flag.
    running: Arc<AtomicBool>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<WorkerCounters>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<P, R, E> WorkerPool<P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    /// Create a stopped pool.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(
        scheduler: Arc<TaskScheduler<P, R>>,
        executor: E,
        config: WorkerPoolConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self {
            config,
            scheduler,
            executor,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(WorkerCounters::default()),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Spawn `worker_count` worker threads.
    ///
    /// The returned guard calls [`stop`](Self::stop) when dropped.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::PoolAlreadyRunning` if workers are already running
    /// - `SchedulerError::Internal` if a thread cannot be spawned
    pub fn start(&self) -> Result<PoolGuard<'_, P, R, E>, SchedulerError> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(SchedulerError::PoolAlreadyRunning);
        }
        self.running.store(true, Ordering::Release);

        for worker_id in 0..self.config.worker_count {
            let ctx = WorkerContext {
                worker_id,
                scheduler: Arc::clone(&self.scheduler),
                executor: self.executor.clone(),
                running: Arc::clone(&self.running),
                counters: Arc::clone(&self.counters),
                idle: self.config.idle_poll_interval(),
            };
            let spawned = thread::Builder::new()
                .name(format!("task-worker-{worker_id}"))
                .stack_size(self.config.thread_stack_size)
                .spawn(move || ctx.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "failed to spawn worker thread");
                    drop(workers);
                    self.stop();
                    self.running.store(false, Ordering::Release);
                    return Err(SchedulerError::Internal(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = self.config.worker_count,
            max_concurrent = self.scheduler.max_concurrent(),
            "worker pool started"
        );
        Ok(PoolGuard { pool: self })
    }

    /// Signal every worker to exit after its current task and wait for all
    /// of them. Calling `stop` on a stopped pool does nothing.
    pub fn stop(&self) {
        let mut workers = self.workers.lock();
        if workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.scheduler.notify_workers();

        let worker_count = workers.len();
        for (idx, worker) in workers.drain(..).enumerate() {
            if worker.join().is_err() {
                warn!(worker_id = idx, "worker thread panicked");
            } else {
                debug!(worker_id = idx, "worker joined");
            }
        }
        info!(worker_count = worker_count, "worker pool stopped");
    }

    /// Whether workers are currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.workers.lock().is_empty()
    }

    /// Configured number of workers.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// The scheduler this pool drains.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<TaskScheduler<P, R>> {
        &self.scheduler
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        self.counters.snapshot(self.config.worker_count)
    }
}

impl<P, R, E> Drop for WorkerPool<P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keeps a [`WorkerPool`] running; stops it when dropped.
#[must_use = "dropping the guard stops the pool immediately"]
pub struct PoolGuard<'a, P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    pool: &'a WorkerPool<P, R, E>,
}

impl<P, R, E> PoolGuard<'_, P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    /// The guarded pool.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool<P, R, E> {
        self.pool
    }
}

impl<P, R, E> Drop for PoolGuard<'_, P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    fn drop(&mut self) {
        self.pool.stop();
    }
}

/// Everything one worker thread owns.
struct WorkerContext<P, R, E> {
    worker_id: usize,
    scheduler: Arc<TaskScheduler<P, R>>,
    executor: E,
    running: Arc<AtomicBool>,
    counters: Arc<WorkerCounters>,
    idle: Duration,
}

impl<P, R, E> WorkerContext<P, R, E>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    fn run(self) {
        let worker_id = self.worker_id;
        debug!(worker_id = worker_id, "worker thread started");

        // Each worker has its own single-threaded tokio runtime
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!(worker_id = worker_id, error = %e, "failed to create worker runtime");
                return;
            }
        };

        let max_concurrent = self.scheduler.max_concurrent();
        while self.running.load(Ordering::Acquire) {
            let Some(task) = self.scheduler.get_next_task(max_concurrent) else {
                self.scheduler.wait_for_work(self.idle);
                continue;
            };

            let task_id = task.id.clone();
            debug!(worker_id = worker_id, task_id = %task_id, attempt = task.attempt, "worker executing task");

            self.counters.attempts.fetch_add(1, Ordering::Relaxed);
            self.counters.busy_workers.fetch_add(1, Ordering::Relaxed);
            let attempt = rt.block_on(execute_attempt(self.executor.clone(), task));
            self.counters.busy_workers.fetch_sub(1, Ordering::Relaxed);
            attempt.count(&self.counters);

            match attempt {
                Attempt::Succeeded(result) => self.scheduler.complete_task(&task_id, result),
                Attempt::Failed(reason) => {
                    self.scheduler.fail_task(&task_id, reason);
                }
                Attempt::TimedOut => {
                    warn!(worker_id = worker_id, task_id = %task_id, "task timed out");
                    self.scheduler.fail_task(&task_id, TIMEOUT_REASON);
                }
                Attempt::Panicked(message) => {
                    warn!(worker_id = worker_id, task_id = %task_id, panic = %message, "executor panicked");
                    self.scheduler.fail_task(&task_id, format!("panicked: {message}"));
                }
            }
        }

        debug!(worker_id = worker_id, "worker thread exiting");
    }
}

/// Run one attempt on the current runtime, bounded by the task's timeout.
async fn execute_attempt<P, R, E>(executor: E, task: DispatchedTask<P>) -> Attempt<R>
where
    P: Send + 'static,
    R: Send + 'static,
    E: TaskExecutor<P, R>,
{
    let timeout = task.timeout;
    let mut handle = tokio::spawn(async move { executor.execute(task).await });

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(result))) => Attempt::Succeeded(result),
        Ok(Ok(Err(e))) => Attempt::Failed(format!("{e:#}")),
        Ok(Err(join_err)) if join_err.is_panic() => {
            Attempt::Panicked(panic_message(join_err.into_panic().as_ref()))
        }
        Ok(Err(join_err)) => Attempt::Failed(join_err.to_string()),
        Err(_) => {
            handle.abort();
            Attempt::TimedOut
        }
    }
}
