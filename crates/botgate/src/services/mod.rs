//! Dispatch Services
//!
//! The dispatcher processes one inbound webhook event end to end; the
//! outbox is the outbound capability it hands to handlers.

mod dispatcher;
mod outbox;

pub use dispatcher::*;
pub use outbox::*;
