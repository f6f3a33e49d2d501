//! One-at-a-time executor
//!
//! `SerialExecutor` runs submitted jobs strictly one after another, in
//! submission order, without owning a thread. A job submitted while the
//! executor is idle runs immediately on the submitting thread; a job submitted
//! while another thread is draining (or from inside a running job) is queued
//! and run by the draining thread once the current job returns.
//!
//! Components whose callbacks arrive on arbitrary threads funnel every state
//! mutation through one executor, which makes the executor the single
//! serialization point for that state.
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use storelink_common::sync::SerialExecutor;
//!
//! let executor = Arc::new(SerialExecutor::new("example"));
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let inner = Arc::clone(&executor);
//! let outer_log = Arc::clone(&log);
//! executor.submit(move || {
//!     let nested_log = Arc::clone(&outer_log);
//!     inner.submit(move || nested_log.lock().unwrap().push("nested"));
//!     outer_log.lock().unwrap().push("outer");
//! });
//!
//! assert_eq!(*log.lock().unwrap(), vec!["outer", "nested"]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;
use tracing::error;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct ExecutorState {
    jobs: VecDeque<Job>,
    draining: bool,
    executed: u64,
}

/// Serializing executor without a dedicated thread
pub struct SerialExecutor {
    name: String,
    state: Mutex<ExecutorState>,
}

impl fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SerialExecutor")
            .field("name", &self.name)
            .field("pending", &state.jobs.len())
            .field("draining", &state.draining)
            .field("executed", &state.executed)
            .finish()
    }
}

impl SerialExecutor {
    /// Create a new executor; `name` is used in log output only
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), state: Mutex::new(ExecutorState::default()) }
    }

    /// Submit a job for serialized execution
    ///
    /// Returns after the job has run when the executor was idle, or
    /// immediately after queueing it otherwise.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.state.lock();
            state.jobs.push_back(Box::new(job));
            if state.draining {
                return;
            }
            state.draining = true;
        }

        self.drain();
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Total number of jobs run so far
    pub fn executed(&self) -> u64 {
        self.state.lock().executed
    }

    /// Executor name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn drain(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                match state.jobs.pop_front() {
                    Some(job) => {
                        state.executed += 1;
                        job
                    }
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            // The lock is released while the job runs so jobs may submit more work.
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!(executor = %self.name, "serialized job panicked; continuing with next job");
            }
        }
    }
}
