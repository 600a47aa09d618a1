//! Botgate API Routes
//!
//! - `POST /bot/:hash` - inbound platform webhook (addressed by token hash)
//! - `POST /messengers/:id/activate` - operator webhook registration
//! - `POST /messengers/:id/deactivate` - operator webhook removal
//! - `GET  /messengers/:id/profile` - provider account diagnostics

pub mod messenger;
pub mod swagger;
pub mod webhook;
