//! Task records, priorities and the values exchanged with executors.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::TaskDefaults;
use crate::core::handler::CompletionHandler;

/// Opaque task identifier, unique across every lifecycle state.
pub type TaskId = String;

/// Urgency tier. Lower ordinal is dispatched first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Dispatched before everything else.
    Critical = 0,
    /// Ahead of regular work.
    High = 1,
    /// Regular work.
    #[default]
    Normal = 2,
    /// Behind regular work.
    Low = 3,
    /// Only when nothing else is ready.
    Background = 4,
}

impl Priority {
    /// One tier more urgent, clamped at `Critical`.
    #[must_use]
    pub const fn boosted(self) -> Self {
        match self {
            Self::Critical | Self::High => Self::Critical,
            Self::Normal => Self::High,
            Self::Low => Self::Normal,
            Self::Background => Self::Low,
        }
    }

    /// Numeric ordinal of the tier.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Background => "background",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a task known to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the ready queue.
    Queued,
    /// Handed to a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed terminally.
    Failed,
}

/// Terminal result of a task as reported by `wait_for_completion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome<R> {
    /// The executor returned a result.
    Completed(R),
    /// Retries were exhausted or a dependency failed.
    Failed {
        /// Last failure reason.
        error: String,
    },
}

impl<R> TaskOutcome<R> {
    /// Whether the task completed successfully.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The result, if the task completed.
    #[must_use]
    pub const fn result(&self) -> Option<&R> {
        match self {
            Self::Completed(r) => Some(r),
            Self::Failed { .. } => None,
        }
    }

    /// The failure reason, if the task failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Description of a task to register with `TaskScheduler::add_task`.
///
/// Unset retry budget and timeout fall back to the scheduler's
/// [`TaskDefaults`].
///
/// ```rust,ignore
/// let spec = TaskSpec::new("summarize-field-7", job)
///     .with_priority(Priority::High)
///     .depends_on("fetch-field-7")
///     .with_max_retries(2)
///     .with_timeout(Duration::from_secs(60));
/// scheduler.add_task(spec)?;
/// ```
pub struct TaskSpec<P, R> {
    pub(crate) id: TaskId,
    pub(crate) payload: P,
    pub(crate) priority: Priority,
    pub(crate) dependencies: HashSet<TaskId>,
    pub(crate) max_retries: Option<u32>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) executor_key: Option<String>,
    pub(crate) metadata: HashMap<String, serde_json::Value>,
    pub(crate) completion_handler: Option<Arc<dyn CompletionHandler<R>>>,
}

impl<P, R> TaskSpec<P, R> {
    /// New spec with `Normal` priority and no dependencies.
    pub fn new(id: impl Into<TaskId>, payload: P) -> Self {
        Self {
            id: id.into(),
            payload,
            priority: Priority::Normal,
            dependencies: HashSet::new(),
            max_retries: None,
            timeout: None,
            executor_key: None,
            metadata: HashMap::new(),
            completion_handler: None,
        }
    }

    /// New spec with a generated UUID v4 id.
    pub fn anonymous(payload: P) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), payload)
    }

    /// The id this spec will register under.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the priority tier.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add every id in `deps` to the dependency set.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Add a single dependency.
    #[must_use]
    pub fn depends_on(mut self, dep: impl Into<TaskId>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Set how many times the task may be requeued after failing.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the per-attempt execution timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Tag the task with a key the executor can route on.
    #[must_use]
    pub fn with_executor_key(mut self, key: impl Into<String>) -> Self {
        self.executor_key = Some(key.into());
        self
    }

    /// Attach an opaque metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Invoke `handler` with the result once the task completes.
    #[must_use]
    pub fn with_completion_handler(mut self, handler: impl CompletionHandler<R> + 'static) -> Self {
        self.completion_handler = Some(Arc::new(handler));
        self
    }
}

/// A registered task, owned by the scheduler.
pub struct TaskRecord<P, R> {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) created_at: Instant,
    pub(crate) sequence: u64,
    pub(crate) dependencies: HashSet<TaskId>,
    pub(crate) max_retries: u32,
    pub(crate) retry_count: u32,
    pub(crate) timeout: Duration,
    pub(crate) payload: P,
    pub(crate) executor_key: Option<String>,
    pub(crate) metadata: HashMap<String, serde_json::Value>,
    pub(crate) completion_handler: Option<Arc<dyn CompletionHandler<R>>>,
    /// Earliest instant a retried task may be dispatched again.
    pub(crate) not_before: Option<Instant>,
}

impl<P, R> TaskRecord<P, R> {
    pub(crate) fn from_spec(spec: TaskSpec<P, R>, defaults: &TaskDefaults, sequence: u64) -> Self {
        Self {
            id: spec.id,
            priority: spec.priority,
            created_at: Instant::now(),
            sequence,
            dependencies: spec.dependencies,
            max_retries: spec.max_retries.unwrap_or(defaults.max_retries),
            retry_count: 0,
            timeout: spec
                .timeout
                .unwrap_or_else(|| Duration::from_secs(defaults.timeout_secs)),
            payload: spec.payload,
            executor_key: spec.executor_key,
            metadata: spec.metadata,
            completion_handler: spec.completion_handler,
            not_before: None,
        }
    }

    /// Task id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current priority, including retry boosts.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Ids that must complete before this task may run.
    #[must_use]
    pub const fn dependencies(&self) -> &HashSet<TaskId> {
        &self.dependencies
    }

    /// Retries consumed so far.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Per-attempt execution timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether another failure would still be retried.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

impl<P: Clone, R> TaskRecord<P, R> {
    pub(crate) fn dispatch(&self) -> DispatchedTask<P> {
        DispatchedTask {
            id: self.id.clone(),
            priority: self.priority,
            attempt: self.retry_count,
            max_retries: self.max_retries,
            timeout: self.timeout,
            executor_key: self.executor_key.clone(),
            metadata: self.metadata.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<P: fmt::Debug, R> fmt::Debug for TaskRecord<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .field("dependencies", &self.dependencies)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("payload", &self.payload)
            .field("executor_key", &self.executor_key)
            .field("has_completion_handler", &self.completion_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Snapshot of a task handed to an executor for one attempt.
#[derive(Debug, Clone)]
pub struct DispatchedTask<P> {
    /// Task id.
    pub id: TaskId,
    /// Priority at dispatch time.
    pub priority: Priority,
    /// Zero on the first attempt, incremented by each retry.
    pub attempt: u32,
    /// Retry budget.
    pub max_retries: u32,
    /// Time the executor is allowed for this attempt.
    pub timeout: Duration,
    /// Optional routing key supplied at registration.
    pub executor_key: Option<String>,
    /// Opaque metadata supplied at registration.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Opaque work description.
    pub payload: P,
}
