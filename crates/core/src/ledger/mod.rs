//! Posted-token ledger - idempotency guard for purchase finalization

pub mod memory;
pub mod ports;
pub mod service;

pub use memory::InMemoryTokenStore;
pub use ports::PostedTokenStore;
pub use service::PostedTokenLedger;
