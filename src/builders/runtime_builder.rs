//! Builders to construct a scheduler and its worker pool from configuration.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::core::{SchedulerError, TaskExecutor, TaskScheduler, WorkerPool};

/// A scheduler together with the (stopped) pool that drains it.
pub type Runtime<P, R, E> = (Arc<TaskScheduler<P, R>>, WorkerPool<P, R, E>);

/// Build a scheduler and a worker pool sharing it.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if either half of the
/// configuration is invalid.
pub fn build_runtime<P, R, E>(cfg: &RuntimeConfig, executor: E) -> Result<Runtime<P, R, E>, SchedulerError>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let scheduler = Arc::new(TaskScheduler::new(cfg.scheduler.clone())?);
    let pool = WorkerPool::new(Arc::clone(&scheduler), executor, cfg.pool.clone())?;
    Ok((scheduler, pool))
}

/// Build from `AGENT_TASK_*` environment variables (see [`RuntimeConfig::from_env`]).
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if the environment holds
/// unparsable or invalid values.
pub fn build_runtime_from_env<P, R, E>(executor: E) -> Result<Runtime<P, R, E>, SchedulerError>
where
    P: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: TaskExecutor<P, R>,
{
    let cfg = RuntimeConfig::from_env().map_err(SchedulerError::InvalidConfig)?;
    build_runtime(&cfg, executor)
}
