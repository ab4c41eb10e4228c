//! Core scheduling abstractions: tasks, ordering, dependency resolution and workers.

pub mod audit;
pub mod error;
pub mod executor;
pub mod handler;
pub mod ready_queue;
pub mod scheduler;
pub mod task;
pub mod worker_pool;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError};
pub use executor::TaskExecutor;
pub use handler::CompletionHandler;
pub use ready_queue::ReadyQueue;
pub use scheduler::{SchedulerStats, TaskScheduler, DEPENDENCY_FAILED};
pub use task::{DispatchedTask, Priority, TaskId, TaskOutcome, TaskRecord, TaskSpec, TaskState};
pub use worker_pool::{PoolGuard, WorkerPool, WorkerPoolStats, TIMEOUT_REASON};
