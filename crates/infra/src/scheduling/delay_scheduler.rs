//! Tokio-backed [`DelayScheduler`].
//!
//! Each scheduled job gets its own timer task on the runtime. When the timer
//! fires, the job runs on the blocking pool because it enters the billing
//! serialization point and may call into the billing client synchronously.
//! Dropping the scheduler (or calling [`TokioDelayScheduler::shutdown`])
//! cancels every outstanding timer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storelink_core::DelayScheduler;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{SchedulerError, SchedulerResult};

pub struct TokioDelayScheduler {
    handle: Handle,
    cancellation: CancellationToken,
    pending: Arc<AtomicUsize>,
}

impl TokioDelayScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            cancellation: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind to the runtime of the calling context
    pub fn current() -> SchedulerResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| SchedulerError::NoRuntime(err.to_string()))
    }

    /// Timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Cancel outstanding timers and reject future ones
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl DelayScheduler for TokioDelayScheduler {
    fn schedule(&self, delay: Duration, job: Box<dyn FnOnce() + Send>) {
        if self.cancellation.is_cancelled() {
            debug!(delay_ms = delay.as_millis() as u64, "scheduler shut down; dropping job");
            return;
        }

        let cancellation = self.cancellation.clone();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        self.handle.spawn(async move {
            tokio::select! {
                () = cancellation.cancelled() => {
                    pending.fetch_sub(1, Ordering::SeqCst);
                    debug!("scheduled billing job cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    pending.fetch_sub(1, Ordering::SeqCst);
                    if let Err(err) = tokio::task::spawn_blocking(job).await {
                        warn!(error = %err, "scheduled billing job failed");
                    }
                }
            }
        });
    }
}

impl Drop for TokioDelayScheduler {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
