//! Building blocks shared by the Storelink crates.
//!
//! Cargo features pick what gets compiled:
//! - `foundation`: `CommonError` and error classification
//! - `runtime`: `SerialExecutor` and `ExponentialBackoff` (implies
//!   `observability`, which brings in `tracing`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "foundation")]
pub mod error;

#[cfg(feature = "runtime")]
pub mod sync;

#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use sync::{ExponentialBackoff, SerialExecutor};
