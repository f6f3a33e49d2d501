//! Timer-driven scheduling for delayed billing work.

pub mod delay_scheduler;
pub mod error;

pub use delay_scheduler::TokioDelayScheduler;
pub use error::{SchedulerError, SchedulerResult};
