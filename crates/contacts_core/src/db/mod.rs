//! SQLite connection lifecycle and schema definition.
//!
//! # Responsibility
//! - Own the single reusable connection handle built from a descriptor.
//! - Keep the `ContactPerson` DDL in one place.
//!
//! # Invariants
//! - Connectivity failures are reported as `DbError::Connect`, never panics.
//! - A provider holds at most one live handle at a time.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod provider;
pub mod schema;

pub use provider::{ConnectionProvider, ConnectionState};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The store could not be reached with the stored descriptor.
    Connect {
        target: String,
        source: rusqlite::Error,
    },
    Sqlite(rusqlite::Error),
    Config(ConfigError),
}

impl DbError {
    /// Returns whether this error came from connection establishment.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { target, source } => {
                write!(f, "failed to connect to `{target}`: {source}")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
