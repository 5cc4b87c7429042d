/// Connection Management Module
///
/// This module provides the database handle for sqlpeek. A `Database` is
/// little more than a validated file path: every logical operation (a
/// catalog build, a table read, a query execution) opens its own SQLite
/// connection and drops it when the operation completes. Nothing is pooled
/// and no connection survives between calls, so concurrent readers rely
/// entirely on SQLite's own file-level locking.
use crate::core::{Result, SqlpeekError};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Handle to a SQLite database file.
///
/// The path is validated at construction and immutable afterwards. Use
/// [`Database::connect`] to obtain a fresh scoped connection for one
/// operation.
#[derive(Debug, Clone)]
pub struct Database {
    /// Path to the database file, known to exist at open time.
    path: PathBuf,
    /// Optional busy timeout applied to every connection.
    busy_timeout: Option<Duration>,
}

impl Database {
    /// Opens a database handle for the file at `path`.
    ///
    /// The path must refer to an existing file. Opening a missing path is
    /// rejected up front with `SqlpeekError::InvalidPath`, before any
    /// engine connection is constructed, so sqlpeek never silently creates
    /// an empty database out of a typo.
    ///
    /// # Errors
    ///
    /// Returns `SqlpeekError::InvalidPath` if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SqlpeekError::InvalidPath(path.display().to_string()));
        }

        debug!(path = %path.display(), "opened database handle");
        Ok(Database {
            path: path.to_path_buf(),
            busy_timeout: None,
        })
    }

    /// Sets the busy timeout applied to every connection opened from this
    /// handle. Used to surface the `[sqlite] busy_timeout_ms` config key.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Returns the path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection for the duration of one logical operation.
    ///
    /// The returned `Connection` closes when dropped, on every exit path,
    /// so callers get scoped acquire/release for free.
    ///
    /// # Errors
    ///
    /// Returns `SqlpeekError::Database` if SQLite cannot open the file.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(conn)
    }
}
