//! Contact person persistence core.
//! Connection lifecycle, schema bootstrap and contact data access over SQLite.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, ConfigResult, ConnectionDescriptor, DbTarget};
pub use db::{ConnectionProvider, ConnectionState, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::contact::{derive_mail, Contact, ContactId, ContactValidationError};
pub use repo::contact_repo::{ContactRepository, RepoError, RepoResult, SqliteContactRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
