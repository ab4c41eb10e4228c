//! Audit trail of task lifecycle transitions.
//!
//! The scheduler records one event per transition when a sink is attached
//! with [`TaskScheduler::with_audit`](crate::core::TaskScheduler::with_audit).

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::task::TaskId;
use crate::util::clock::now_ms;

/// Lifecycle transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Registered by `add_task`.
    Queued,
    /// Handed to a worker.
    Dispatched,
    /// Completed successfully.
    Completed,
    /// Failed and requeued.
    Retried,
    /// Failed terminally after exhausting retries.
    Failed,
    /// Failed terminally because a dependency failed.
    DependencyFailed,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Retried => "retried",
            Self::Failed => "failed",
            Self::DependencyFailed => "dependency_failed",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Related task identifier.
    pub task_id: TaskId,
    /// Transition taken.
    pub action: AuditAction,
    /// Failure reason or other context.
    pub detail: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl AuditEvent {
    /// Build an event stamped with the current time.
    pub fn new(task_id: impl Into<TaskId>, action: AuditAction, detail: Option<String>) -> Self {
        Self {
            task_id: task_id.into(),
            action,
            detail,
            created_at_ms: now_ms(),
        }
    }
}

/// Audit sink abstraction.
///
/// The scheduler calls `record` after releasing its internal lock, so an
/// implementation may query or drive the scheduler it is attached to.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// Bounded in-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the scheduler.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink holding at most `max_events`.
    ///
    /// A sink created with zero capacity discards every event.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Actions recorded for one task, oldest first.
    #[must_use]
    pub fn actions_for(&self, task_id: &str) -> Vec<AuditAction> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task_id == task_id)
            .map(|e| e.action)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_audit_sink() {
        let sink = InMemoryAuditSink::new(10);
        sink.record(AuditEvent::new("task1", AuditAction::Queued, None));
        sink.record(AuditEvent::new("task1", AuditAction::Dispatched, None));
        sink.record(AuditEvent::new("task2", AuditAction::Queued, None));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.actions_for("task1"),
            [AuditAction::Queued, AuditAction::Dispatched]
        );
        assert!(sink.events()[0].created_at_ms > 0);
    }

    #[test]
    fn test_audit_sink_overflow() {
        let sink = InMemoryAuditSink::new(2);
        let handle = sink.clone();
        sink.record(AuditEvent::new("task1", AuditAction::Queued, None));
        sink.record(AuditEvent::new("task2", AuditAction::Queued, None));
        sink.record(AuditEvent::new("task3", AuditAction::Queued, None));

        let events = handle.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].task_id, "task2"); // First one popped
        assert_eq!(events[1].task_id, "task3");
    }

    #[test]
    fn test_zero_capacity_sink_keeps_nothing() {
        let sink = InMemoryAuditSink::new(0);
        sink.record(AuditEvent::new("task1", AuditAction::Queued, None));
        sink.record(AuditEvent::new("task1", AuditAction::Dispatched, None));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(AuditAction::DependencyFailed.to_string(), "dependency_failed");
        assert_eq!(AuditAction::Retried.to_string(), "retried");
    }
}
