//! Executor abstraction for CPU-bound and blocking pipeline work.
//!
//! Image decode, compositing, JPEG encoding and filesystem calls all block.
//! The pipeline hands them to a [`BlockingExecutor`] so that they never stall
//! the async workers that serve submissions and status queries.
//!
//! ```text
//! ┌─────────────────────┐
//! │   Pipeline run      │
//! └─────────┬───────────┘
//!           │ depends on
//!           ▼
//! ┌─────────────────────┐
//! │  BlockingExecutor   │
//! └─────────┬───────────┘
//!           │ implemented by
//!           ▼
//! ┌─────────────────────┐
//! │  TokioExecutor      │  spawn_blocking
//! └─────────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`BlockingExecutor::execute_blocking`].
pub type BlockingResult<R> = Pin<Box<dyn Future<Output = Result<R, ExecutorError>> + Send>>;

/// Runs blocking closures off the async runtime.
pub trait BlockingExecutor: Send + Sync + 'static {
    /// Executes `f` on a thread that may block.
    ///
    /// A panic inside `f` is reported as [`ExecutorError::TaskPanicked`].
    fn execute_blocking<F, R>(&self, f: F) -> BlockingResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static;
}

/// Errors that can occur during executor operations.
#[derive(Debug, Clone)]
pub enum ExecutorError {
    /// The blocking task panicked
    TaskPanicked(String),
    /// The runtime shut down before the task finished
    Shutdown,
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::TaskPanicked(msg) => write!(f, "task panicked: {}", msg),
            ExecutorError::Shutdown => write!(f, "executor shut down"),
        }
    }
}

impl std::error::Error for ExecutorError {}

/// Production executor backed by `tokio::task::spawn_blocking`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

impl TokioExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl BlockingExecutor for TokioExecutor {
    fn execute_blocking<F, R>(&self, f: F) -> BlockingResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Box::pin(async move {
            tokio::task::spawn_blocking(f).await.map_err(|e| {
                if e.is_panic() {
                    ExecutorError::TaskPanicked(e.to_string())
                } else {
                    ExecutorError::Shutdown
                }
            })
        })
    }
}

/// Executes "blocking" work immediately on the calling thread.
#[cfg(test)]
pub struct SyncExecutor;

#[cfg(test)]
impl BlockingExecutor for SyncExecutor {
    fn execute_blocking<F, R>(&self, f: F) -> BlockingResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let result = f();
        Box::pin(std::future::ready(Ok(result)))
    }
}
