//! # Agent Task Core
//!
//! An in-process task scheduling core for orchestrating multi-agent work.
//!
//! Work is described as tasks with a priority, a set of dependencies, a retry
//! budget and a timeout. A [`TaskScheduler`](core::TaskScheduler) holds every
//! task and decides which one may run next; a
//! [`WorkerPool`](core::WorkerPool) of dedicated threads pulls ready tasks
//! and hands them to a caller-supplied [`TaskExecutor`](core::TaskExecutor).
//!
//! ## Guarantees
//!
//! - **Ordering**: among ready tasks, lowest priority ordinal first, then
//!   creation order
//! - **Dependencies**: a task never runs before all of its dependencies
//!   completed; if one fails, the dependent fails without running
//! - **Retries**: failed attempts are requeued one priority tier higher until
//!   the retry budget is spent
//! - **Backpressure**: at most `max_concurrent` tasks run at once
//!
//! ## Scheduler and Pool
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use agent_task_core::config::{SchedulerConfig, WorkerPoolConfig};
//! use agent_task_core::core::{Priority, TaskScheduler, TaskSpec, WorkerPool};
//!
//! let scheduler = Arc::new(TaskScheduler::new(SchedulerConfig::default().with_max_concurrent(4))?);
//! let pool = WorkerPool::new(Arc::clone(&scheduler), my_executor, WorkerPoolConfig::new())?;
//! let _guard = pool.start()?;
//!
//! scheduler.add_task(TaskSpec::new("soil-report", job_a).with_priority(Priority::High))?;
//! scheduler.add_task(TaskSpec::new("irrigation-plan", job_b).depends_on("soil-report"))?;
//!
//! let outcomes = scheduler.wait_for_completion(
//!     &["soil-report", "irrigation-plan"],
//!     Some(Duration::from_secs(120)),
//! )?;
//! ```
//!
//! The scheduler can also be driven by hand with `get_next_task`,
//! `complete_task` and `fail_task`; see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, ordering, dependencies and workers.
pub mod core;
/// Configuration models for the scheduler and worker pool.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
