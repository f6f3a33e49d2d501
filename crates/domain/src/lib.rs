//! # Storelink Domain
//!
//! Business domain types for the store connection and purchase pipeline.
//!
//! This crate contains:
//! - Store response codes and their error mapping
//! - Purchase, product and transaction models
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - Depends only on `storelink-common` (foundation tier)
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
