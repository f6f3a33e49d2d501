//! SQLite persistence for the posted-token ledger.

pub mod manager;
pub mod posted_token_repository;

pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use posted_token_repository::SqlitePostedTokenStore;
