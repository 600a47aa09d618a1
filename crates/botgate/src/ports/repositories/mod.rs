//! Repository Ports
//!
//! Data access interfaces consumed by the dispatcher. Entities cross this
//! boundary fully loaded; the core never performs deferred loading.

mod account_repository;
mod menu_repository;
mod messenger_repository;

pub use account_repository::*;
pub use menu_repository::*;
pub use messenger_repository::*;
