mod migration;
mod schema;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use time::OffsetDateTime;
use tracing::{debug, warn};

pub use migration::{AppliedMigration, MIGRATIONS, applied_migrations};

/// Database wrapper providing connection management, schema initialization
/// and the unit-of-work helper every multi-row write goes through.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::initialize(Connection::open(path)?)
    }

    /// Enables foreign keys and applies pending migrations.
    fn initialize(mut conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migration::apply_pending_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Bounds how long a write waits on a lock held by another connection.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    ///
    /// Useful for executing custom queries in tests and read-only listings.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `work` inside one transaction.
    ///
    /// The transaction takes the write lock up front, so a second writer
    /// waits out the busy timeout instead of failing on lock upgrade.
    ///
    /// Commits when `work` returns `Ok`. On `Err` the transaction is rolled
    /// back before the error is returned, so none of the steps survive. The
    /// transaction guard also rolls back if `work` unwinds.
    ///
    /// Steps must not open transactions of their own.
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum::Database;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let db = Database::in_memory()?;
    ///
    /// let failed: Result<(), rusqlite::Error> = db.unit_of_work(|conn| {
    ///     conn.execute("INSERT INTO tags (name, name_key, created_at) VALUES ('Rust', 'rust', 0)", [])?;
    ///     Err(rusqlite::Error::QueryReturnedNoRows)
    /// });
    /// assert!(failed.is_err());
    ///
    /// let count: i64 = db
    ///     .connection()
    ///     .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
    /// assert_eq!(count, 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!("rolling back transaction");
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Lists the schema migrations recorded in this database.
    pub fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        applied_migrations(&self.conn)
    }
}

/// Current time as a Unix timestamp, the format every `*_at` column uses.
pub(crate) fn now_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Reads a Unix timestamp column as an `OffsetDateTime`.
pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

/// Reads a text column through `FromStr`, reporting parse failures as
/// conversion errors.
pub(crate) fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::<dyn std::error::Error + Send + Sync>::from(e))
    })
}
