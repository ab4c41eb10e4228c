//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::task::TaskId;

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A task with this id is already queued, running, completed or failed.
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),
    /// The task lists its own id among its dependencies.
    #[error("task {0} depends on itself")]
    SelfDependency(TaskId),
    /// Adding the task would close a cycle in the dependency graph.
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// Task whose registration was rejected.
        task_id: TaskId,
        /// Ids along the cycle, starting and ending with `task_id`.
        path: Vec<TaskId>,
    },
    /// Not every awaited task reached a terminal state before the deadline.
    #[error("timed out waiting for {} task(s): {}", pending.len(), pending.join(", "))]
    Timeout {
        /// Ids still queued, running, or unknown at the deadline.
        pending: Vec<TaskId>,
    },
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `start` was called on a pool that is already running.
    #[error("worker pool is already running")]
    PoolAlreadyRunning,
    /// Internal failure (thread spawn, runtime construction).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Whether this error was raised by `add_task` input validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTask(_) | Self::SelfDependency(_) | Self::DependencyCycle { .. }
        )
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
