//! Synchronization primitives for callback-driven components
//!
//! ## Submodules
//!
//! - **`serial`**: one-at-a-time executor used as the single serialization
//!   point for state owned by a component whose callbacks arrive on arbitrary
//!   threads
//! - **`backoff`**: capped exponential backoff calculator with reset

pub mod backoff;
pub mod serial;

pub use backoff::{
    ExponentialBackoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, MAX_BACKOFF_EXPONENT,
};
pub use serial::SerialExecutor;
