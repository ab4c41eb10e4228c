//! Dependency-aware priority scheduler.
//!
//! `TaskScheduler` owns every task from registration to its terminal state.
//! All bookkeeping lives behind one `parking_lot::Mutex`; the lock is only
//! held while maps are mutated, never while an executor or completion
//! handler runs.
//!
//! Two condition variables carry notifications:
//!
//! - `work` wakes idle workers when something may have become ready
//!   (new task, completion, retry, pool shutdown)
//! - `finished` wakes `wait_for_completion` callers on every terminal
//!   transition
//!
//! Audit events are buffered under the lock and handed to the sink after it
//! is released, in the order the transitions happened. A sink may therefore
//! call back into the scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::audit::{AuditAction, AuditEvent, AuditSink};
use crate::core::error::SchedulerError;
use crate::core::handler;
use crate::core::ready_queue::ReadyQueue;
use crate::core::task::{DispatchedTask, TaskId, TaskOutcome, TaskRecord, TaskSpec, TaskState};

/// Failure reason recorded for tasks whose dependency failed.
pub const DEPENDENCY_FAILED: &str = "dependency failed";

/// Point-in-time counts of tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks waiting in the ready queue.
    pub queued: usize,
    /// Tasks handed to workers.
    pub running: usize,
    /// Tasks completed successfully.
    pub completed: usize,
    /// Tasks failed terminally.
    pub failed: usize,
    /// Configured concurrency cap.
    pub max_concurrent: usize,
    /// Retries granted since the scheduler was created.
    pub total_retries: u64,
}

/// What remains of a task once it reaches a terminal state.
struct Finished<T> {
    dependencies: HashSet<TaskId>,
    value: T,
}

struct SchedulerState<P, R> {
    queue: ReadyQueue<P, R>,
    running: HashMap<TaskId, TaskRecord<P, R>>,
    completed: HashMap<TaskId, Finished<R>>,
    failed: HashMap<TaskId, Finished<String>>,
    next_sequence: u64,
    total_retries: u64,
    audit_backlog: Vec<AuditEvent>,
}

impl<P, R> SchedulerState<P, R> {
    fn new() -> Self {
        Self {
            queue: ReadyQueue::new(),
            running: HashMap::new(),
            completed: HashMap::new(),
            failed: HashMap::new(),
            next_sequence: 0,
            total_retries: 0,
            audit_backlog: Vec::new(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.queue.contains(id)
            || self.running.contains_key(id)
            || self.completed.contains_key(id)
            || self.failed.contains_key(id)
    }

    fn state_of(&self, id: &str) -> Option<TaskState> {
        if self.queue.contains(id) {
            Some(TaskState::Queued)
        } else if self.running.contains_key(id) {
            Some(TaskState::Running)
        } else if self.completed.contains_key(id) {
            Some(TaskState::Completed)
        } else if self.failed.contains_key(id) {
            Some(TaskState::Failed)
        } else {
            None
        }
    }

    /// Dependency edges of any known task. Unknown ids have none.
    fn dependencies_of(&self, id: &str) -> Option<&HashSet<TaskId>> {
        self.queue
            .get(id)
            .map(TaskRecord::dependencies)
            .or_else(|| self.running.get(id).map(TaskRecord::dependencies))
            .or_else(|| self.completed.get(id).map(|f| &f.dependencies))
            .or_else(|| self.failed.get(id).map(|f| &f.dependencies))
    }

    /// Path `start -> ... -> target` along dependency edges, if one exists.
    fn dependency_path(&self, start: &str, target: &str) -> Option<Vec<TaskId>> {
        let mut parent: HashMap<TaskId, TaskId> = HashMap::new();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut stack = vec![start.to_string()];
        visited.insert(start.to_string());

        while let Some(current) = stack.pop() {
            if current == target {
                let mut path = vec![current];
                while let Some(prev) = parent.get(path.last()?) {
                    path.push(prev.clone());
                }
                path.reverse();
                return Some(path);
            }
            let Some(deps) = self.dependencies_of(&current) else {
                continue;
            };
            for dep in deps {
                if visited.insert(dep.clone()) {
                    parent.insert(dep.clone(), current.clone());
                    stack.push(dep.clone());
                }
            }
        }
        None
    }

    fn is_ready(&self, record: &TaskRecord<P, R>, now: Instant) -> bool {
        record.not_before.map_or(true, |t| t <= now)
            && record
                .dependencies
                .iter()
                .all(|d| self.completed.contains_key(d))
    }

    fn first_failed_dependency(&self, record: &TaskRecord<P, R>) -> Option<TaskId> {
        record
            .dependencies
            .iter()
            .find(|d| self.failed.contains_key(*d))
            .cloned()
    }
}

/// Dependency-aware priority scheduler shared by every worker.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = TaskScheduler::<Job, String>::new(SchedulerConfig::default())?;
/// scheduler.add_task(TaskSpec::new("fetch", fetch_job).with_priority(Priority::High))?;
/// scheduler.add_task(TaskSpec::new("report", report_job).depends_on("fetch"))?;
///
/// let task = scheduler.get_next_task(4).expect("fetch is ready");
/// scheduler.complete_task(&task.id, "ok".to_string());
/// ```
pub struct TaskScheduler<P, R> {
    config: SchedulerConfig,
    state: Mutex<SchedulerState<P, R>>,
    work: Condvar,
    finished: Condvar,
    audit: Option<Arc<dyn AuditSink>>,
    /// Held by the one thread currently draining the audit backlog.
    emitting: Mutex<()>,
}

impl<P, R> TaskScheduler<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Create an empty scheduler.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self {
            config,
            state: Mutex::new(SchedulerState::new()),
            work: Condvar::new(),
            finished: Condvar::new(),
            audit: None,
            emitting: Mutex::new(()),
        })
    }

    /// Attach an audit sink receiving every lifecycle transition.
    #[must_use]
    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Arc::new(sink));
        self
    }

    /// Scheduler configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Configured cap on running tasks.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    /// Register a task. It enters the QUEUED state.
    ///
    /// Dependencies on ids that were never registered are accepted; such a
    /// task simply stays queued until they complete.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::DuplicateTask` if the id is known in any state
    /// - `SchedulerError::SelfDependency` if the task depends on itself
    /// - `SchedulerError::DependencyCycle` if registration would close a cycle
    pub fn add_task(&self, spec: TaskSpec<P, R>) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();

        if state.contains(&spec.id) {
            return Err(SchedulerError::DuplicateTask(spec.id));
        }
        if spec.dependencies.contains(&spec.id) {
            return Err(SchedulerError::SelfDependency(spec.id));
        }
        for dep in &spec.dependencies {
            if let Some(mut path) = state.dependency_path(dep, &spec.id) {
                path.insert(0, spec.id.clone());
                return Err(SchedulerError::DependencyCycle {
                    task_id: spec.id,
                    path,
                });
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let record = TaskRecord::from_spec(spec, &self.config.defaults, sequence);
        debug!(
            task_id = %record.id,
            priority = %record.priority,
            dependencies = record.dependencies.len(),
            "task queued"
        );
        self.record_audit(&mut state, &record.id, AuditAction::Queued, None);
        let has_failed_dependency = state.first_failed_dependency(&record).is_some();
        state.queue.push(record);

        if has_failed_dependency && self.cascade_dependency_failures(&mut state) > 0 {
            self.finished.notify_all();
        }
        drop(state);
        self.work.notify_one();
        self.flush_audit();
        Ok(())
    }

    /// Hand out the most urgent ready task, moving it to RUNNING.
    ///
    /// Returns `None` when `max_concurrent` tasks are already running or no
    /// queued task is ready. Queued tasks with a failed dependency are moved
    /// to FAILED during the scan.
    pub fn get_next_task(&self, max_concurrent: usize) -> Option<DispatchedTask<P>>
    where
        P: Clone,
    {
        let mut state = self.state.lock();
        if state.running.len() >= max_concurrent {
            return None;
        }

        if self.cascade_dependency_failures(&mut state) > 0 {
            self.finished.notify_all();
        }

        let now = Instant::now();
        let chosen = state
            .queue
            .iter()
            .find(|record| state.is_ready(record, now))
            .map(|record| record.id.clone());

        let mut task = None;
        if let Some(record) = chosen.and_then(|id| state.queue.remove(&id)) {
            let dispatched = record.dispatch();
            debug!(
                task_id = %dispatched.id,
                priority = %dispatched.priority,
                attempt = dispatched.attempt,
                "task dispatched"
            );
            self.record_audit(&mut state, &dispatched.id, AuditAction::Dispatched, None);
            state.running.insert(record.id.clone(), record);
            task = Some(dispatched);
        }
        drop(state);
        self.flush_audit();
        task
    }

    /// Record a successful result for a running task.
    ///
    /// Ids that are not running are ignored, so a second completion is a
    /// no-op. The completion handler, if any, runs after the lock is
    /// released; its failures are logged and do not affect the task.
    pub fn complete_task(&self, task_id: &str, result: R)
    where
        R: Clone,
    {
        let mut state = self.state.lock();
        let Some(record) = state.running.remove(task_id) else {
            debug!(task_id = %task_id, "complete_task ignored: task is not running");
            return;
        };

        let handler = record.completion_handler.clone();
        let handler_input = handler.as_ref().map(|_| result.clone());
        state.completed.insert(
            record.id.clone(),
            Finished {
                dependencies: record.dependencies,
                value: result,
            },
        );
        self.record_audit(&mut state, &record.id, AuditAction::Completed, None);
        drop(state);
        self.flush_audit();

        info!(task_id = %record.id, attempt = record.retry_count, "task completed");
        self.finished.notify_all();
        self.work.notify_all();

        if let (Some(handler), Some(result)) = (handler, handler_input) {
            handler::invoke(handler.as_ref(), &record.id, &result);
        }
    }

    /// Record a failure for a running or queued task.
    ///
    /// Returns `true` if the task was requeued with `retry_count + 1` and a
    /// priority one tier more urgent, `false` if the failure is terminal (or
    /// the id is not running or queued). A terminal failure cascades to every
    /// queued task that depends on it.
    pub fn fail_task(&self, task_id: &str, error: impl Into<String>) -> bool {
        let error = error.into();
        let mut state = self.state.lock();
        let removed = match state.running.remove(task_id) {
            Some(record) => Some(record),
            None => state.queue.remove(task_id),
        };
        let Some(mut record) = removed else {
            debug!(task_id = %task_id, "fail_task ignored: task is not active");
            return false;
        };

        if record.can_retry() {
            record.retry_count += 1;
            record.priority = record.priority.boosted();
            record.not_before = self
                .config
                .retry_delay(record.retry_count)
                .map(|delay| Instant::now() + delay);
            state.total_retries += 1;
            warn!(
                task_id = %record.id,
                retry_count = record.retry_count,
                max_retries = record.max_retries,
                priority = %record.priority,
                error = %error,
                "task failed, retrying"
            );
            self.record_audit(&mut state, &record.id, AuditAction::Retried, Some(error));
            state.queue.push(record);
            drop(state);
            self.work.notify_one();
            self.flush_audit();
            return true;
        }

        warn!(
            task_id = %record.id,
            retry_count = record.retry_count,
            error = %error,
            "task failed permanently"
        );
        self.record_audit(&mut state, &record.id, AuditAction::Failed, Some(error.clone()));
        state.failed.insert(
            record.id,
            Finished {
                dependencies: record.dependencies,
                value: error,
            },
        );
        self.cascade_dependency_failures(&mut state);
        drop(state);
        self.finished.notify_all();
        self.work.notify_all();
        self.flush_audit();
        false
    }

    /// Current per-state counts.
    #[must_use]
    pub fn get_stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        SchedulerStats {
            queued: state.queue.len(),
            running: state.running.len(),
            completed: state.completed.len(),
            failed: state.failed.len(),
            max_concurrent: self.config.max_concurrent,
            total_retries: state.total_retries,
        }
    }

    /// Lifecycle state of `task_id`, or `None` if it was never registered.
    #[must_use]
    pub fn state_of(&self, task_id: &str) -> Option<TaskState> {
        self.state.lock().state_of(task_id)
    }

    /// Block until every id in `task_ids` is completed or failed.
    ///
    /// Individual failures are returned as `TaskOutcome::Failed`, never as an
    /// error. With `timeout = None`, or a timeout too large to represent as a
    /// deadline, the call waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Timeout` listing the ids still pending if the
    /// deadline passes first.
    pub fn wait_for_completion<S>(
        &self,
        task_ids: &[S],
        timeout: Option<Duration>,
    ) -> Result<HashMap<TaskId, TaskOutcome<R>>, SchedulerError>
    where
        S: AsRef<str>,
        R: Clone,
    {
        // A deadline past what `Instant` can represent means no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        loop {
            let pending: Vec<TaskId> = task_ids
                .iter()
                .map(AsRef::as_ref)
                .filter(|id| !state.completed.contains_key(*id) && !state.failed.contains_key(*id))
                .map(ToString::to_string)
                .collect();

            if pending.is_empty() {
                return Ok(task_ids
                    .iter()
                    .map(AsRef::as_ref)
                    .filter_map(|id| Self::outcome(&state, id).map(|o| (id.to_string(), o)))
                    .collect());
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        warn!(pending = pending.len(), "wait_for_completion timed out");
                        return Err(SchedulerError::Timeout { pending });
                    }
                    // Loop re-checks on wakeup and on timeout.
                    let _ = self.finished.wait_until(&mut state, deadline);
                }
                None => self.finished.wait(&mut state),
            }
        }
    }

    /// Async variant of [`wait_for_completion`](Self::wait_for_completion).
    ///
    /// The blocking wait runs on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as `wait_for_completion`, plus `SchedulerError::Internal` if the
    /// blocking task fails.
    pub async fn wait_for_completion_async(
        self: &Arc<Self>,
        task_ids: Vec<TaskId>,
        timeout: Option<Duration>,
    ) -> Result<HashMap<TaskId, TaskOutcome<R>>, SchedulerError>
    where
        R: Clone,
    {
        let scheduler = Arc::clone(self);
        tokio::task::spawn_blocking(move || scheduler.wait_for_completion(&task_ids, timeout))
            .await
            .map_err(|e| SchedulerError::Internal(format!("wait task failed: {e}")))?
    }

    /// Park the calling worker until new work may be ready or `idle` elapses.
    pub fn wait_for_work(&self, idle: Duration) {
        let mut state = self.state.lock();
        let _ = self.work.wait_for(&mut state, idle);
    }

    /// Wake every worker parked in [`wait_for_work`](Self::wait_for_work).
    pub fn notify_workers(&self) {
        self.work.notify_all();
    }

    fn outcome(state: &SchedulerState<P, R>, id: &str) -> Option<TaskOutcome<R>>
    where
        R: Clone,
    {
        if let Some(done) = state.completed.get(id) {
            return Some(TaskOutcome::Completed(done.value.clone()));
        }
        state.failed.get(id).map(|f| TaskOutcome::Failed {
            error: f.value.clone(),
        })
    }

    /// Move every queued task with a failed dependency to FAILED, repeating
    /// until no such task remains. Returns how many tasks were failed.
    fn cascade_dependency_failures(&self, state: &mut SchedulerState<P, R>) -> usize {
        let mut failed = 0;
        loop {
            let doomed: Vec<(TaskId, TaskId)> = state
                .queue
                .iter()
                .filter_map(|record| {
                    state
                        .first_failed_dependency(record)
                        .map(|dep| (record.id.clone(), dep))
                })
                .collect();
            if doomed.is_empty() {
                return failed;
            }
            for (id, dependency) in doomed {
                let Some(record) = state.queue.remove(&id) else {
                    continue;
                };
                warn!(
                    task_id = %id,
                    dependency = %dependency,
                    "task failed: dependency failed"
                );
                self.record_audit(state, &id, AuditAction::DependencyFailed, Some(dependency));
                state.failed.insert(
                    id,
                    Finished {
                        dependencies: record.dependencies,
                        value: DEPENDENCY_FAILED.to_string(),
                    },
                );
                failed += 1;
            }
        }
    }

    fn record_audit(
        &self,
        state: &mut SchedulerState<P, R>,
        task_id: &str,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if self.audit.is_some() {
            state
                .audit_backlog
                .push(AuditEvent::new(task_id, action, detail));
        }
    }

    /// Hand buffered audit events to the sink. Call without the state lock.
    ///
    /// Only one thread drains at a time, so the sink sees events in
    /// transition order. A thread that finds the drain busy leaves its
    /// events to the current drainer.
    fn flush_audit(&self) {
        let Some(sink) = &self.audit else {
            return;
        };
        loop {
            let Some(emitting) = self.emitting.try_lock() else {
                return;
            };
            let batch = std::mem::take(&mut self.state.lock().audit_backlog);
            if batch.is_empty() {
                drop(emitting);
                // Events pushed after the take but before the drop would
                // otherwise be stranded.
                if self.state.lock().audit_backlog.is_empty() {
                    return;
                }
                continue;
            }
            for event in batch {
                sink.record(event);
            }
        }
    }
}

impl<P, R> std::fmt::Debug for TaskScheduler<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("config", &self.config)
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> TaskScheduler<u32, u32> {
        TaskScheduler::new(SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = TaskScheduler::<u32, u32>::new(SchedulerConfig::default().with_max_concurrent(0))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn test_cycle_through_dangling_dependency_reports_path() {
        let s = scheduler();
        s.add_task(TaskSpec::new("a", 1).depends_on("b")).unwrap();
        s.add_task(TaskSpec::new("b", 2).depends_on("c")).unwrap();

        let err = s.add_task(TaskSpec::new("c", 3).depends_on("a")).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::DependencyCycle {
                task_id: "c".into(),
                path: vec!["c".into(), "a".into(), "b".into(), "c".into()],
            }
        );
        assert_eq!(s.get_stats().queued, 2);
    }

    #[test]
    fn test_fail_on_unknown_task_is_noop() {
        let s = scheduler();
        assert!(!s.fail_task("ghost", "boom"));
        assert_eq!(s.get_stats(), SchedulerStats {
            max_concurrent: 4,
            ..SchedulerStats::default()
        });
    }

    #[test]
    fn test_state_of_tracks_lifecycle() {
        let s = scheduler();
        assert_eq!(s.state_of("t"), None);
        s.add_task(TaskSpec::new("t", 1)).unwrap();
        assert_eq!(s.state_of("t"), Some(TaskState::Queued));
        let task = s.get_next_task(1).unwrap();
        assert_eq!(s.state_of("t"), Some(TaskState::Running));
        s.complete_task(&task.id, 10);
        assert_eq!(s.state_of("t"), Some(TaskState::Completed));
    }
}
