//! # Storelink Infrastructure
//!
//! Infrastructure implementations of the `storelink-core` ports.
//!
//! This crate contains:
//! - The SQLite posted-token store (rusqlite + r2d2 pool)
//! - A tokio-backed delay scheduler for reconnect backoff
//! - Configuration loading from the environment and TOML/JSON files
//! - Tracing subscriber initialisation
//!
//! ## Architecture
//! - Implements traits defined in `storelink-core`
//! - Contains all "impure" code (I/O, timers, global subscriber)

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use bootstrap::{build_billing_runtime, BillingRuntime};
pub use database::{DbManager, SqlitePostedTokenStore};
pub use errors::InfraError;
pub use observability::init_tracing;
pub use scheduling::{SchedulerError, TokioDelayScheduler};
