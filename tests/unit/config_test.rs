//! Tests for configuration validation and loading

use std::time::Duration;

use agent_task_core::config::{RuntimeConfig, SchedulerConfig, TaskDefaults, WorkerPoolConfig};

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.max_concurrent, 4);
    assert_eq!(cfg.defaults.max_retries, 3);
    assert_eq!(cfg.defaults.timeout_secs, 300);
    assert_eq!(cfg.retry_delay(1), None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_max_concurrent() {
    let cfg = SchedulerConfig::default().with_max_concurrent(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_timeout() {
    let cfg = SchedulerConfig::default().with_defaults(TaskDefaults {
        max_retries: 1,
        timeout_secs: 0,
    });
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_backoff() {
    let cfg = SchedulerConfig::default().with_retry_backoff(5_000, 1_000);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_pool_config_invalid_stack() {
    let cfg = WorkerPoolConfig::new().with_thread_stack_size(1024);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_pool_config_invalid_idle_interval() {
    let cfg = WorkerPoolConfig::new().with_idle_poll_interval(Duration::ZERO);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_runtime_config_from_json() {
    let json = r#"{
        "scheduler": {
            "max_concurrent": 8,
            "defaults": { "max_retries": 1, "timeout_secs": 30 },
            "retry_backoff_ms": 250
        },
        "pool": { "worker_count": 2 }
    }"#;
    let cfg = RuntimeConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.scheduler.max_concurrent, 8);
    assert_eq!(cfg.scheduler.defaults.max_retries, 1);
    assert_eq!(cfg.scheduler.defaults.timeout_secs, 30);
    assert_eq!(cfg.scheduler.retry_backoff_ms, 250);
    assert_eq!(cfg.scheduler.max_retry_backoff_ms, 30_000);
    assert_eq!(cfg.pool.worker_count, 2);
    assert_eq!(cfg.pool.idle_poll_interval_ms, 100);
}

#[test]
fn test_runtime_config_empty_json_uses_defaults() {
    let cfg = RuntimeConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg.scheduler, SchedulerConfig::default());
    assert!(cfg.pool.worker_count >= 1);
}

#[test]
fn test_runtime_config_rejects_invalid_values() {
    let err = RuntimeConfig::from_json_str(r#"{"scheduler": {"max_concurrent": 0}}"#).unwrap_err();
    assert!(err.starts_with("scheduler invalid"), "got {err}");

    let err = RuntimeConfig::from_json_str(r#"{"pool": {"worker_count": 0}}"#).unwrap_err();
    assert!(err.starts_with("pool invalid"), "got {err}");
}

#[test]
fn test_runtime_config_rejects_malformed_json() {
    let err = RuntimeConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"), "got {err}");
}

#[test]
fn test_runtime_config_serializes_back() {
    let cfg = RuntimeConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), cfg);
}
