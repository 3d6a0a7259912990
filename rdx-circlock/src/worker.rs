//! Background tasks that can be stopped and joined.
//!
//! ```text
//!            start_*()             stop()
//!  Stopped ──────────► Running ──────────► Stopped
//!     ▲  │ stop(): no-op    │ start_*(): no-op
//!     └──┘                  └──┘
//! ```
//!
//! A worker runs one of two loops. A periodic loop waits one period, then
//! (unless cancelled in the meantime) runs one step. A consumer loop runs one
//! step per item received from a broadcast channel, in order. `stop` cancels,
//! then waits a bounded time for the task to exit, aborting it if the bound
//! is exceeded. Dropping a worker cancels and aborts its task.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

struct Running {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct Worker {
    name: &'static str,
    running: Option<Running>,
}

impl Worker {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            running: None,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawns a fixed-cadence loop. Returns `false` if already running.
    pub(crate) fn start_periodic<F, Fut>(&mut self, period: Duration, mut step: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(move |token, name| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {
                        if token.is_cancelled() {
                            break;
                        }
                        step().await;
                    }
                }
            }
            debug!(task = name, "Periodic loop exited");
        })
    }

    /// Spawns a loop running `step` for every item on `receiver`. Returns
    /// `false` if already running.
    ///
    /// Items the receiver lagged past are logged and skipped; a closed
    /// channel ends the loop.
    pub(crate) fn start_consumer<T, F, Fut>(
        &mut self,
        mut receiver: broadcast::Receiver<T>,
        mut step: F,
    ) -> bool
    where
        T: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(move |token, name| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(item) => step(item).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(task = name, skipped, "Worker fell behind; items dropped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(task = name, "Consumer loop exited");
        })
    }

    fn spawn<B, Fut>(&mut self, body: B) -> bool
    where
        B: FnOnce(CancellationToken, &'static str) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }
        let cancellation = CancellationToken::new();
        debug!(task = self.name, "Worker started");
        let handle = tokio::spawn(body(cancellation.clone(), self.name));
        self.running = Some(Running {
            cancellation,
            handle,
        });
        true
    }

    /// Cancels the loop and waits up to `timeout` for it to finish.
    ///
    /// Returns `false` if nothing was running.
    pub(crate) async fn stop(&mut self, timeout: Duration) -> bool {
        let Some(mut running) = self.running.take() else {
            return false;
        };
        running.cancellation.cancel();
        match tokio::time::timeout(timeout, &mut running.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => error!(task = self.name, error = %e, "Worker ended abnormally"),
            Err(_) => {
                warn!(task = self.name, ?timeout, "Worker did not stop in time; aborting");
                running.handle.abort();
            }
        }
        true
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancellation.cancel();
            running.handle.abort();
        }
    }
}
