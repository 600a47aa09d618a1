//! Viber integration for the Botgate messaging gateway
//!
//! Implements the [`botgate::MessengerAdapter`] port over the Viber REST
//! API: webhook registration, HMAC-SHA256 content-signature verification,
//! callback parsing into the canonical message model, rich keyboards, and
//! outbound sends.

mod adapter;
mod client;
mod config;

pub use adapter::ViberAdapter;
pub use client::ViberClient;
pub use config::ViberConfig;
