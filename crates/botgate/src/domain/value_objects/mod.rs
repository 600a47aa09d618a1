//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod platform;
mod profile;

pub use platform::*;
pub use profile::*;
