//! Storage collaborator: short-lived SQLite connections, schema reflection,
//! and the identifier guard applied before any token is spliced into SQL.

#![forbid(unsafe_code)]

mod adapt;
mod schema;

use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, DropBehavior, OpenFlags, Transaction};
use tracing::{debug, error};

use crate::config::DatabaseOptions;
use crate::relation::ColumnInfo;
use crate::types::{Result, TabulaError};

pub(crate) use adapt::value_from_sql;

/// Handle on a single-file SQLite database.
///
/// No connection is held between calls; every operation opens its own,
/// runs inside one transaction, commits, and closes.
#[derive(Debug)]
pub struct Database {
    options: DatabaseOptions,
}

impl Database {
    /// Prepares a handle for the configured file.
    pub fn open(options: DatabaseOptions) -> Result<Self> {
        if !options.create_if_missing && !options.path.exists() {
            return Err(TabulaError::MissingDatabase(options.path.clone()));
        }
        Ok(Self { options })
    }

    /// Options the handle was opened with.
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Opens a fresh connection with foreign keys enforced and the busy
    /// timeout applied.
    pub fn connect(&self) -> Result<Connection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.options.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(&self.options.path, flags)?;
        conn.busy_timeout(Duration::from_millis(self.options.busy_timeout_ms))?;
        if self.options.foreign_keys {
            conn.pragma_update(None, "foreign_keys", "ON")?;
        }
        Ok(conn)
    }

    /// Runs `f` inside a transaction on a fresh connection.
    ///
    /// The transaction is committed and the connection closed whether or not
    /// `f` succeeds. An error from `f` takes precedence over a commit error.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connect()?;
        let mut tx = conn.transaction()?;
        tx.set_drop_behavior(DropBehavior::Commit);
        let outcome = f(&tx);
        let committed = tx.commit();
        let value = outcome?;
        committed?;
        Ok(value)
    }

    /// Reflects the columns of `table` via `PRAGMA table_info`.
    ///
    /// Intended to run once per table at registration, not per query.
    pub fn columns_of(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        validate_identifiers([table])?;
        let conn = self.connect()?;
        schema::table_info(&conn, table)
    }

    /// Executes a batch of SQL statements and commits.
    pub fn run_script(&self, sql: &str) -> Result<()> {
        debug!(bytes = sql.len(), "db.run_script");
        self.with_transaction(|tx| {
            tx.execute_batch(sql)?;
            Ok(())
        })
    }

    /// Reads a SQL file and runs it with [`Database::run_script`].
    pub fn run_script_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let sql = fs::read_to_string(path)?;
        self.run_script(&sql)
    }
}

/// Rejects any token that is empty or contains characters outside
/// `[A-Za-z0-9_]`.
///
/// This is the only guard between caller-supplied names and generated SQL,
/// so every table, column, and alias must pass through it first.
pub fn validate_identifiers<I, S>(identifiers: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for identifier in identifiers {
        let identifier = identifier.as_ref();
        if identifier.is_empty() {
            return Err(TabulaError::InvalidIdentifier(String::new()));
        }
        if !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            error!(identifier, "db.identifier.rejected");
            return Err(TabulaError::InvalidIdentifier(identifier.to_string()));
        }
    }
    Ok(())
}
