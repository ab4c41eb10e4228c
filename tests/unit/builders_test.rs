//! Tests for runtime builders

use agent_task_core::builders::build_runtime;
use agent_task_core::config::{RuntimeConfig, SchedulerConfig, WorkerPoolConfig};
use agent_task_core::core::{AppResult, DispatchedTask, SchedulerError, TaskExecutor};
use async_trait::async_trait;

#[derive(Clone)]
struct DoublingExecutor;

#[async_trait]
impl TaskExecutor<u64, u64> for DoublingExecutor {
    async fn execute(&self, task: DispatchedTask<u64>) -> AppResult<u64> {
        Ok(task.payload * 2)
    }
}

#[test]
fn test_build_runtime_shares_scheduler() {
    let cfg = RuntimeConfig {
        scheduler: SchedulerConfig::default().with_max_concurrent(3),
        pool: WorkerPoolConfig::new().with_worker_count(2),
    };
    let (scheduler, pool) = build_runtime(&cfg, DoublingExecutor).unwrap();

    assert_eq!(scheduler.max_concurrent(), 3);
    assert_eq!(pool.worker_count(), 2);
    assert!(std::sync::Arc::ptr_eq(&scheduler, pool.scheduler()));
    assert!(!pool.is_running());
}

#[test]
fn test_build_runtime_rejects_invalid_config() {
    let cfg = RuntimeConfig {
        scheduler: SchedulerConfig::default(),
        pool: WorkerPoolConfig::new().with_worker_count(0),
    };
    let result = build_runtime(&cfg, DoublingExecutor);
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_built_runtime_executes() {
    use agent_task_core::core::TaskSpec;
    use std::time::Duration;

    let cfg = RuntimeConfig {
        scheduler: SchedulerConfig::default(),
        pool: WorkerPoolConfig::new()
            .with_worker_count(1)
            .with_idle_poll_interval(Duration::from_millis(10)),
    };
    let (scheduler, pool) = build_runtime(&cfg, DoublingExecutor).unwrap();
    let _guard = pool.start().unwrap();

    scheduler.add_task(TaskSpec::new("double", 21)).unwrap();
    let outcomes = scheduler
        .wait_for_completion(&["double"], Some(Duration::from_secs(10)))
        .unwrap();
    assert_eq!(outcomes["double"].result(), Some(&42));
}
