//! Completion callbacks.

use std::panic::{self, AssertUnwindSafe};

use crate::core::error::AppResult;
use crate::core::task::TaskId;

/// Callback invoked once a task reaches COMPLETED.
///
/// Returning an error (or panicking) is logged and otherwise ignored; the
/// task stays completed.
pub trait CompletionHandler<R>: Send + Sync {
    /// Handle the result of `task_id`.
    fn on_complete(&self, task_id: &TaskId, result: &R) -> AppResult<()>;
}

impl<R, F> CompletionHandler<R> for F
where
    F: Fn(&TaskId, &R) -> AppResult<()> + Send + Sync,
{
    fn on_complete(&self, task_id: &TaskId, result: &R) -> AppResult<()> {
        self(task_id, result)
    }
}

/// Run `handler`, containing both error returns and panics.
pub(crate) fn invoke<R>(handler: &dyn CompletionHandler<R>, task_id: &TaskId, result: &R) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.on_complete(task_id, result))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(task_id = %task_id, error = %e, "completion handler failed");
        }
        Err(payload) => {
            tracing::warn!(
                task_id = %task_id,
                panic = %panic_message(payload.as_ref()),
                "completion handler panicked"
            );
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
