//! Task execution trait.

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::core::task::DispatchedTask;

/// Abstraction for performing the work a task describes.
///
/// The executor is supplied by the caller when the
/// [`WorkerPool`](crate::core::WorkerPool) is built. Returning `Err` is the
/// failure signal; a panic is treated the same way. The same logical task
/// may be executed again after a failure, so side effects must tolerate
/// repetition.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use agent_task_core::core::{AppResult, DispatchedTask, TaskExecutor};
///
/// #[derive(Clone)]
/// struct AgentExecutor {
///     client: AgentClient,
/// }
///
/// #[async_trait]
/// impl TaskExecutor<AgentJob, String> for AgentExecutor {
///     async fn execute(&self, task: DispatchedTask<AgentJob>) -> AppResult<String> {
///         let reply = self.client.run(&task.payload.prompt).await?;
///         Ok(reply.text)
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor<P, R>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Execute one attempt of a task.
    ///
    /// Inside a `WorkerPool` this runs on a dedicated worker thread with its
    /// own single-threaded tokio runtime, bounded by `task.timeout`.
    async fn execute(&self, task: DispatchedTask<P>) -> AppResult<R>;
}
