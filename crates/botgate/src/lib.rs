//! Botgate Domain Library
//!
//! Core domain types and interfaces for the Botgate messaging gateway:
//! inbound platform webhooks are normalized into one canonical message
//! model, routed through a per-account menu/button state machine, and
//! answered through the originating platform's API.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (Message, Account, Menu, Button, Messenger)
//!   - `value_objects/`: Immutable value types (PlatformType, ProfileInfo)
//!   - `errors/`: Gateway error taxonomy
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `adapter`: platform integration interface (Telegram, Viber, ...)
//!   - `repositories/`: data access interfaces
//!
//! - **Services** (`services/`): The dispatcher (one inbound webhook event
//!   processed end to end) and the outbox it sends through.
//!
//! Platform implementations live in separate crates
//! (`botgate-integration-telegram`, `botgate-integration-viber`); storage
//! implementations live in `botgate-server`.

pub mod domain;
pub mod ports;
pub mod registry;
pub mod services;

// Re-export commonly used types
pub use domain::{
    Account, AccountDefaults, Button, GatewayError, KeyboardButton, Menu, Message, MessageKind,
    Messenger, PlatformType, ProfileInfo,
};
pub use ports::{
    AccountRepository, MenuRepository, MessengerAdapter, MessengerRepository, SendOutcome,
};
pub use registry::{HandlerRegistry, MessageHandler};
pub use services::{Dispatcher, Outbox};
