//! Tests for error types

use agent_task_core::core::SchedulerError;

#[test]
fn test_duplicate_task_error() {
    let err = SchedulerError::DuplicateTask("ingest".to_string());
    assert_eq!(format!("{}", err), "duplicate task id: ingest");
    assert!(err.is_validation());
}

#[test]
fn test_self_dependency_error() {
    let err = SchedulerError::SelfDependency("loop".to_string());
    assert_eq!(format!("{}", err), "task loop depends on itself");
    assert!(err.is_validation());
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_concurrent must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_concurrent must be greater than 0"
    );
    assert!(!err.is_validation());
}

#[test]
fn test_pool_errors() {
    assert_eq!(
        format!("{}", SchedulerError::PoolAlreadyRunning),
        "worker pool is already running"
    );
    assert_eq!(
        format!("{}", SchedulerError::Internal("spawn failed".into())),
        "internal error: spawn failed"
    );
}

#[test]
fn test_errors_convert_into_anyhow() {
    let err: anyhow::Error = SchedulerError::DuplicateTask("a".into()).into();
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::DuplicateTask("a".into()))
    );
}
