//! PostgreSQL implementations of the repository ports

mod account_repository;
mod menu_repository;
mod messenger_repository;

pub use account_repository::PgAccountRepository;
pub use menu_repository::PgMenuRepository;
pub use messenger_repository::PgMessengerRepository;
