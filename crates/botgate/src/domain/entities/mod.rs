//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - Message: canonical, platform-agnostic message/event
//! - Account: per-user, per-platform conversation state
//! - Menu / Button: the conversational state graph
//! - Messenger: per-tenant platform binding

mod account;
mod menu;
mod message;
mod messenger;

pub use account::*;
pub use menu::*;
pub use message::*;
pub use messenger::*;
