//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems: Postgres
//! repositories and per-messenger platform adapter construction.

pub mod factory;
pub mod postgres;

// Re-exports
pub use factory::AdapterFactory;
pub use postgres::{PgAccountRepository, PgMenuRepository, PgMessengerRepository};
