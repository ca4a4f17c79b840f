//! Connection descriptor resolution.
//!
//! # Responsibility
//! - Validate the (driver, URL, user, password) tuple used to reach storage.
//! - Load that tuple from an external `KEY=VALUE` properties file.
//!
//! # Invariants
//! - A constructed descriptor always names a supported driver and a
//!   resolvable target; failures here are configuration errors, never
//!   connectivity errors.
//! - Descriptors are immutable after construction.
//! - The password never appears in `Debug` output or logs.

use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

/// Properties key holding the database URL.
pub const URL_KEY: &str = "MYSQL_DB_URL";
/// Properties key holding the user name.
pub const USER_KEY: &str = "USER";
/// Properties key holding the password.
pub const PASSWORD_KEY: &str = "PASSWORD";
/// Optional properties key overriding the driver identifier.
pub const DRIVER_KEY: &str = "DRIVER";
/// Driver used when a properties source does not name one.
pub const DEFAULT_DRIVER: &str = "sqlite";

const SUPPORTED_DRIVERS: &[&str] = &["sqlite", "sqlite3", "org.sqlite.jdbc"];
const MEMORY_TARGET: &str = ":memory:";

static DRIVER_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").expect("valid driver regex")
});

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration failures raised while building a descriptor.
#[derive(Debug)]
pub enum ConfigError {
    MalformedDriver(String),
    UnsupportedDriver(String),
    InvalidUrl { url: String, reason: &'static str },
    Source { path: PathBuf, source: dotenvy::Error },
    MissingKey { path: PathBuf, key: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDriver(value) => write!(f, "malformed driver identifier `{value}`"),
            Self::UnsupportedDriver(value) => write!(
                f,
                "unsupported driver `{value}`; expected one of sqlite|sqlite3|org.sqlite.JDBC"
            ),
            Self::InvalidUrl { url, reason } => write!(f, "invalid database url `{url}`: {reason}"),
            Self::Source { path, source } => write!(
                f,
                "failed to read properties source `{}`: {source}",
                path.display()
            ),
            Self::MissingKey { path, key } => write!(
                f,
                "properties source `{}` is missing required key `{key}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Where a descriptor points after URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Memory,
    File(PathBuf),
}

impl Display for DbTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Immutable description of how to reach the relational store.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    driver: String,
    url: String,
    user: String,
    password: String,
    target: DbTarget,
}

impl ConnectionDescriptor {
    /// Builds a descriptor from explicit parameters.
    ///
    /// Accepted URLs are `sqlite::memory:`, `sqlite://<path>` and
    /// `sqlite:<path>`, each optionally prefixed with `jdbc:`.
    ///
    /// # Errors
    /// - `MalformedDriver` when `driver` is not a dotted identifier.
    /// - `UnsupportedDriver` when `driver` is well-formed but not SQLite.
    /// - `InvalidUrl` when `url` cannot be resolved to a target.
    pub fn new(
        driver: impl Into<String>,
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> ConfigResult<Self> {
        let driver = driver.into();
        let url = url.into();
        validate_driver(&driver)?;
        let target = resolve_target(&url)?;

        Ok(Self {
            driver,
            url,
            user: user.into(),
            password: password.into(),
            target,
        })
    }

    /// Loads a descriptor from a `KEY=VALUE` properties file.
    ///
    /// Reads `MYSQL_DB_URL`, `USER` and `PASSWORD`; `DRIVER` is optional and
    /// defaults to `sqlite`. Missing `USER`/`PASSWORD` become empty strings.
    /// The process environment is never modified.
    ///
    /// # Errors
    /// - `Source` when the file is missing, unreadable or malformed.
    /// - `MissingKey` when `MYSQL_DB_URL` is absent.
    /// - Any error of [`ConnectionDescriptor::new`].
    pub fn from_properties_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let properties = match read_properties(path) {
            Ok(properties) => properties,
            Err(err) => {
                error!(
                    "event=config_load module=config status=error path={} error={}",
                    path.display(),
                    err
                );
                return Err(err);
            }
        };

        let url = properties
            .get(URL_KEY)
            .cloned()
            .ok_or_else(|| ConfigError::MissingKey {
                path: path.to_path_buf(),
                key: URL_KEY,
            })?;
        let driver = properties
            .get(DRIVER_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_DRIVER.to_string());
        let user = properties.get(USER_KEY).cloned().unwrap_or_default();
        let password = properties.get(PASSWORD_KEY).cloned().unwrap_or_default();

        let descriptor = Self::new(driver, url, user, password)?;
        info!(
            "event=config_load module=config status=ok path={} driver={} target={}",
            path.display(),
            descriptor.driver,
            descriptor.target
        );
        Ok(descriptor)
    }

    /// Descriptor for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            url: format!("sqlite:{MEMORY_TARGET}"),
            user: String::new(),
            password: String::new(),
            target: DbTarget::Memory,
        }
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn target(&self) -> &DbTarget {
        &self.target
    }
}

impl Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn validate_driver(driver: &str) -> ConfigResult<()> {
    let trimmed = driver.trim();
    if !DRIVER_ID_RE.is_match(trimmed) {
        return Err(ConfigError::MalformedDriver(driver.to_string()));
    }
    if !SUPPORTED_DRIVERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::UnsupportedDriver(driver.to_string()));
    }
    Ok(())
}

fn resolve_target(url: &str) -> ConfigResult<DbTarget> {
    let invalid = |reason: &'static str| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let trimmed = url.trim();
    let without_jdbc = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
    let rest = without_jdbc
        .strip_prefix("sqlite:")
        .ok_or_else(|| invalid("expected `sqlite:` scheme"))?;
    let location = rest.strip_prefix("//").unwrap_or(rest);

    if location.is_empty() {
        return Err(invalid("missing database path"));
    }
    if location == MEMORY_TARGET {
        return Ok(DbTarget::Memory);
    }
    Ok(DbTarget::File(PathBuf::from(location)))
}

fn read_properties(path: &Path) -> ConfigResult<HashMap<String, String>> {
    let source_error = |source| ConfigError::Source {
        path: path.to_path_buf(),
        source,
    };

    let mut properties = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(source_error)? {
        let (key, value) = item.map_err(source_error)?;
        properties.insert(key, value);
    }
    Ok(properties)
}
