use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// One-shot delayed callbacks on a timer thread of their own.
///
/// Backed by a small tokio runtime so that thousands of pending delays cost
/// timer entries rather than threads. Callbacks run on the runtime's worker
/// thread, never on the caller's.
pub struct DelayScheduler {
    runtime: Option<Runtime>,
}

impl DelayScheduler {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("hellobench-timer")
            .enable_time()
            .build()
            .context("failed to start timer runtime")?;

        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Runs `callback` once after `delay`. Returns immediately.
    ///
    /// After [`DelayScheduler::shutdown`] the callback is dropped unrun.
    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            debug!("timer scheduled after shutdown, dropping it");
            return;
        };

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }

    /// Stops the timer thread. Outstanding callbacks are abandoned, not
    /// awaited.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }
}

impl Drop for DelayScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
