//! Lazy single-handle connection provider.
//!
//! # Responsibility
//! - Establish a SQLite connection from a descriptor on first use.
//! - Reuse that handle while it still answers a liveness check.
//! - Release the handle on `close()`.
//!
//! # Invariants
//! - Construction never touches storage.
//! - State is `Connected` iff a handle is held.
//! - `close()` on an unconnected provider is a no-op.
//! - An in-memory store lives only as long as its handle: reopening after
//!   `close()` or a stale handle starts from an empty database.

use super::{DbError, DbResult};
use crate::config::{ConnectionDescriptor, DbTarget};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable lifecycle state of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

/// Owns the one connection handle used by a repository.
///
/// Not synchronized: callers serialize access through `&mut self`.
#[derive(Debug)]
pub struct ConnectionProvider {
    descriptor: ConnectionDescriptor,
    conn: Option<Connection>,
    /// Set once any handle has been opened; a later open is a reopen.
    opened_before: bool,
}

impl ConnectionProvider {
    /// Creates an unconnected provider for `descriptor`.
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            conn: None,
            opened_before: false,
        }
    }

    /// Creates an unconnected provider whose descriptor is loaded from a
    /// properties file.
    ///
    /// # Errors
    /// - `DbError::Config` when the source is missing, unreadable or invalid.
    pub fn from_properties_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let descriptor = ConnectionDescriptor::from_properties_file(path)?;
        Ok(Self::new(descriptor))
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    /// Ensures a live handle is held, opening a new one when needed.
    ///
    /// # Errors
    /// - `DbError::Connect` when the store cannot be reached.
    pub fn connect(&mut self) -> DbResult<()> {
        self.connection().map(|_| ())
    }

    /// Returns the live handle, connecting first when needed.
    ///
    /// A held handle that fails the liveness check is discarded and
    /// replaced. For `DbTarget::Memory` the replacement is a new, empty
    /// database; the reopen is logged at `warn` with `data_lost=true`.
    pub fn connection(&mut self) -> DbResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) if is_alive(&conn) => conn,
            Some(stale) => {
                warn!(
                    "event=db_connect module=db status=stale target={}",
                    self.descriptor.target()
                );
                drop(stale);
                self.open()?
            }
            None => self.open()?,
        };
        Ok(self.conn.insert(conn))
    }

    /// Releases the held handle and its cached statements.
    ///
    /// The provider is `Unconnected` afterwards even when closing reports an
    /// error. For `DbTarget::Memory` this discards every table and row; the
    /// next call to `connection()` opens an empty database.
    pub fn close(&mut self) -> DbResult<()> {
        let Some(conn) = self.conn.take() else {
            debug!("event=db_close module=db status=noop");
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                info!(
                    "event=db_close module=db status=ok target={}",
                    self.descriptor.target()
                );
                Ok(())
            }
            Err((_conn, err)) => {
                error!(
                    "event=db_close module=db status=error target={} error={}",
                    self.descriptor.target(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn open(&mut self) -> DbResult<Connection> {
        let started_at = Instant::now();
        let target = self.descriptor.target();
        if self.opened_before && *target == DbTarget::Memory {
            warn!(
                "event=db_connect module=db status=reopen target={} data_lost=true",
                target
            );
        }
        info!(
            "event=db_connect module=db status=start driver={} target={} user={}",
            self.descriptor.driver(),
            target,
            self.descriptor.user()
        );

        match open_target(target) {
            Ok(conn) => {
                info!(
                    "event=db_connect module=db status=ok target={} duration_ms={}",
                    target,
                    started_at.elapsed().as_millis()
                );
                self.opened_before = true;
                Ok(conn)
            }
            Err(err) => {
                error!(
                    "event=db_connect module=db status=error target={} duration_ms={} error={}",
                    target,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(DbError::Connect {
                    target: target.to_string(),
                    source: err,
                })
            }
        }
    }
}

fn open_target(target: &DbTarget) -> rusqlite::Result<Connection> {
    let conn = match target {
        DbTarget::Memory => Connection::open_in_memory()?,
        DbTarget::File(path) => Connection::open(path)?,
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // Opening is lazy in SQLite; touching the schema surfaces unreachable files now.
    conn.query_row("SELECT count(*) FROM sqlite_master;", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(conn)
}

fn is_alive(conn: &Connection) -> bool {
    conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::{ConnectionProvider, ConnectionState};
    use crate::config::ConnectionDescriptor;

    #[test]
    fn provider_starts_unconnected_and_close_is_noop() {
        let mut provider = ConnectionProvider::new(ConnectionDescriptor::in_memory());
        assert_eq!(provider.state(), ConnectionState::Unconnected);
        provider.close().unwrap();
        assert_eq!(provider.state(), ConnectionState::Unconnected);
    }

    #[test]
    fn connect_reuses_existing_handle() {
        let mut provider = ConnectionProvider::new(ConnectionDescriptor::in_memory());
        provider
            .connection()
            .unwrap()
            .execute_batch("CREATE TABLE marker (id INTEGER);")
            .unwrap();

        provider.connect().unwrap();

        // A fresh in-memory handle would not have the marker table.
        let count: i64 = provider
            .connection()
            .unwrap()
            .query_row("SELECT count(*) FROM marker;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn close_then_connect_opens_fresh_memory_database() {
        let mut provider = ConnectionProvider::new(ConnectionDescriptor::in_memory());
        assert!(!provider.opened_before);
        provider
            .connection()
            .unwrap()
            .execute_batch("CREATE TABLE marker (id INTEGER);")
            .unwrap();
        assert!(provider.opened_before);

        provider.close().unwrap();
        assert_eq!(provider.state(), ConnectionState::Unconnected);

        provider.connect().unwrap();
        assert_eq!(provider.state(), ConnectionState::Connected);
        let missing = provider
            .connection()
            .unwrap()
            .query_row("SELECT count(*) FROM marker;", [], |row| row.get::<_, i64>(0));
        assert!(missing.is_err());
    }
}
