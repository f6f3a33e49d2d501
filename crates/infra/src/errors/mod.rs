//! Infrastructure error types and their conversions.

mod conversions;

pub use conversions::InfraError;
