//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the `ContactPerson` table lifecycle and row mapping.
//! - Provide list/search/insert and the transactional mail batch update.
//!
//! # Invariants
//! - Every operation acquires a live connection from the owned provider
//!   before touching storage.
//! - User-supplied values are always bound as parameters.
//! - Rows are mapped by column name, never by position.
//! - The batch update commits all rows or none.

use crate::config::ConnectionDescriptor;
use crate::db::schema::CREATE_CONTACT_TABLE_SQL;
use crate::db::{ConnectionProvider, DbError};
use crate::model::contact::{derive_mail, Contact, ContactId, ContactValidationError};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    name,
    nickname,
    address,
    homePhone,
    workPhone,
    cellphone,
    mail,
    birthdate,
    website,
    profession
FROM ContactPerson";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
    /// The insert statement completed without affecting a row.
    NotInserted,
    InvalidData(String),
}

impl RepoError {
    /// Returns whether the store could not be reached at all.
    ///
    /// Lets read callers tell a broken connection from an empty table.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_connect())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotInserted => write!(f, "insert affected no rows"),
            Self::InvalidData(message) => write!(f, "invalid persisted contact data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotInserted | Self::InvalidData(_) => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for contact storage.
///
/// Methods take `&mut self`: the single connection handle is lazily
/// (re)established inside each call.
pub trait ContactRepository {
    /// Creates the table when absent; succeeds without change otherwise.
    fn create_table(&mut self) -> RepoResult<()>;
    /// Returns every stored contact in store order.
    fn list_all(&mut self) -> RepoResult<Vec<Contact>>;
    /// Returns contacts whose name contains `fragment`; `""` matches all.
    fn search_by_name(&mut self, fragment: &str) -> RepoResult<Vec<Contact>>;
    /// Inserts a new contact and returns its store-assigned id.
    fn insert(&mut self, contact: &Contact) -> RepoResult<ContactId>;
    /// Rewrites every `mail` from `name` in one transaction.
    ///
    /// Returns the number of updated rows.
    fn batch_update_emails(&mut self) -> RepoResult<usize>;
    /// Releases the underlying connection; later calls reconnect.
    fn close(&mut self) -> RepoResult<()>;
}

/// SQLite-backed contact repository owning its connection provider.
#[derive(Debug)]
pub struct SqliteContactRepository {
    provider: ConnectionProvider,
}

impl SqliteContactRepository {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Repository over an explicit descriptor.
    pub fn with_descriptor(descriptor: ConnectionDescriptor) -> Self {
        Self::new(ConnectionProvider::new(descriptor))
    }

    /// Repository whose descriptor is read from a properties file.
    ///
    /// # Errors
    /// - `RepoError::Db(DbError::Config(..))` when the source is unusable.
    pub fn from_properties_file(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(ConnectionProvider::from_properties_file(path)?))
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }
}

impl ContactRepository for SqliteContactRepository {
    fn create_table(&mut self) -> RepoResult<()> {
        self.with_connection("contact_create_table", |conn| {
            conn.execute_batch(CREATE_CONTACT_TABLE_SQL)?;
            Ok(())
        })
    }

    fn list_all(&mut self) -> RepoResult<Vec<Contact>> {
        self.with_connection("contact_list", |conn| {
            let contacts = query_contacts(conn, &format!("{CONTACT_SELECT_SQL};"), [])?;
            debug!(
                "event=contact_list module=repo status=ok count={}",
                contacts.len()
            );
            Ok(contacts)
        })
    }

    fn search_by_name(&mut self, fragment: &str) -> RepoResult<Vec<Contact>> {
        let pattern = like_contains_pattern(fragment);
        self.with_connection("contact_search", |conn| {
            let contacts = query_contacts(
                conn,
                &format!(r"{CONTACT_SELECT_SQL} WHERE name LIKE ?1 ESCAPE '\';"),
                [pattern.as_str()],
            )?;
            debug!(
                "event=contact_search module=repo status=ok fragment_len={} count={}",
                fragment.chars().count(),
                contacts.len()
            );
            Ok(contacts)
        })
    }

    fn insert(&mut self, contact: &Contact) -> RepoResult<ContactId> {
        if let Err(err) = contact.validate_for_insert() {
            warn!("event=contact_insert module=repo status=rejected error={err}");
            return Err(err.into());
        }

        self.with_connection("contact_insert", |conn| {
            let id = insert_contact(conn, contact)?;
            info!("event=contact_insert module=repo status=ok id={id}");
            Ok(id)
        })
    }

    fn batch_update_emails(&mut self) -> RepoResult<usize> {
        let started_at = Instant::now();
        self.with_connection("contact_mail_batch", |conn| {
            // Auto-commit stays off while `tx` lives; commit and rollback both
            // restore it. A failed commit is rolled back when `tx` drops.
            let tx = conn.transaction()?;
            match apply_derived_mails(&tx) {
                Ok(updated) => {
                    tx.commit()?;
                    info!(
                        "event=contact_mail_batch module=repo status=ok updated={} duration_ms={}",
                        updated,
                        started_at.elapsed().as_millis()
                    );
                    Ok(updated)
                }
                Err(err) => {
                    match tx.rollback() {
                        Ok(()) => warn!("event=contact_mail_batch module=repo status=rolled_back"),
                        Err(rollback_err) => error!(
                            "event=contact_mail_batch module=repo status=error stage=rollback error={rollback_err}"
                        ),
                    }
                    Err(err)
                }
            }
        })
    }

    fn close(&mut self) -> RepoResult<()> {
        Ok(self.provider.close()?)
    }
}

impl SqliteContactRepository {
    /// Runs `op` against a live connection and logs any failure under `event`.
    fn with_connection<T>(
        &mut self,
        event: &str,
        op: impl FnOnce(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let result = match self.provider.connection() {
            Ok(conn) => op(conn),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &result {
            error!("event={event} module=repo status=error error={err}");
        }
        result
    }
}

fn insert_contact(conn: &Connection, contact: &Contact) -> RepoResult<ContactId> {
    let changed = conn.execute(
        "INSERT INTO ContactPerson (
            name,
            nickname,
            address,
            homePhone,
            workPhone,
            cellphone,
            mail,
            birthdate,
            website,
            profession
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            contact.name.as_str(),
            contact.nickname.as_deref(),
            contact.address.as_deref(),
            contact.home_phone.as_deref(),
            contact.work_phone.as_deref(),
            contact.cellphone.as_deref(),
            contact.mail.as_deref(),
            contact.birthdate,
            contact.website.as_deref(),
            contact.profession.as_deref(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotInserted);
    }
    Ok(conn.last_insert_rowid())
}

fn apply_derived_mails(conn: &Connection) -> RepoResult<usize> {
    let contacts = query_contacts(conn, &format!("{CONTACT_SELECT_SQL};"), [])?;
    let mut stmt = conn.prepare("UPDATE ContactPerson SET mail = ?1 WHERE id = ?2;")?;

    let mut updated = 0;
    for contact in &contacts {
        let id = contact.id.ok_or_else(|| {
            RepoError::InvalidData(format!("row `{}` was read without an id", contact.name))
        })?;
        updated += stmt.execute(params![derive_mail(&contact.name), id])?;
    }
    Ok(updated)
}

fn query_contacts<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepoResult<Vec<Contact>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut contacts = Vec::new();

    while let Some(row) = rows.next()? {
        contacts.push(parse_contact_row(row)?);
    }

    Ok(contacts)
}

/// Maps a row as stored; name validation applies to write paths only.
fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    Ok(Contact {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        nickname: row.get("nickname")?,
        address: row.get("address")?,
        home_phone: row.get("homePhone")?,
        work_phone: row.get("workPhone")?,
        cellphone: row.get("cellphone")?,
        mail: row.get("mail")?,
        birthdate: row.get("birthdate")?,
        website: row.get("website")?,
        profession: row.get("profession")?,
    })
}

/// Builds a `LIKE` pattern matching `fragment` anywhere, with the fragment's
/// own wildcard characters escaped by `\`.
fn like_contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::{like_contains_pattern, RepoError};
    use crate::db::DbError;

    #[test]
    fn like_pattern_wraps_fragment() {
        assert_eq!(like_contains_pattern("Ahmed"), "%Ahmed%");
        assert_eq!(like_contains_pattern(""), "%%");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_contains_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn connect_errors_are_distinguishable() {
        let connect = RepoError::Db(DbError::Connect {
            target: "memory".to_string(),
            source: rusqlite::Error::InvalidQuery,
        });
        assert!(connect.is_connect());
        assert!(!RepoError::NotInserted.is_connect());
    }
}
