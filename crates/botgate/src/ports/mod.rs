//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the domain layer interacts with
//! external systems: messaging platforms and storage.
//!
//! Platform implementations live in the `botgate-integration-*` crates;
//! storage implementations live in `botgate-server`.

pub mod adapter;
pub mod repositories;

// Re-exports
pub use adapter::*;
pub use repositories::*;
