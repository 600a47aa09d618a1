//! Telegram integration for the Botgate messaging gateway
//!
//! Implements the [`botgate::MessengerAdapter`] port over the Telegram
//! Bot API: webhook registration, update parsing into the canonical
//! message model, reply/inline keyboards, and outbound sends.

mod adapter;
mod client;
mod config;

pub use adapter::TelegramAdapter;
pub use client::TelegramClient;
pub use config::TelegramConfig;
