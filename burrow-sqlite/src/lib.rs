//! Relational `StorageEngine` implementation backed by SQLite.
//!
//! A single connection behind a mutex, autocommit (SQLite's default outside
//! an explicit transaction), matching spec.md §5's relational concurrency
//! model: multi-statement sequences (materialize-account-then-queue-then-
//! message, batched delete-then-check-empty) re-query rather than wrapping
//! themselves in a transaction, so they tolerate concurrent callers the same
//! way the reference SQLite backend does.

mod engine;

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use burrow_engine::WaiterRegistry;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    account TEXT NOT NULL,
    PRIMARY KEY (account)
);
CREATE TABLE IF NOT EXISTS queues (
    account_rowid INTEGER NOT NULL,
    queue TEXT NOT NULL,
    PRIMARY KEY (account_rowid, queue)
);
CREATE TABLE IF NOT EXISTS messages (
    queue_rowid INTEGER NOT NULL,
    message TEXT NOT NULL,
    ttl INTEGER NOT NULL,
    hide INTEGER NOT NULL,
    body BLOB NOT NULL,
    PRIMARY KEY (queue_rowid, message)
);
";

/// Maximum number of bound parameters per statement. SQLite's own limit is
/// around 999; this leaves headroom for parameters that aren't part of a
/// batched id list.
pub const MAXIMUM_PARAMETERS: usize = 990;

pub struct SqliteEngine {
    conn:    Mutex<Connection>,
    waiters: Arc<WaiterRegistry>,
}

impl SqliteEngine {
    /// Open a relational engine against `url`. `sqlite://path/to/file.db`
    /// opens (creating if needed) that file; `sqlite://` with an empty path
    /// opens an in-memory database.
    pub fn open(url: &str, waiters: Arc<WaiterRegistry>) -> rusqlite::Result<Self> {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        let conn = if path.is_empty() {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA synchronous=FULL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteEngine {
            conn: Mutex::new(conn),
            waiters,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    pub(crate) fn test_engine() -> SqliteEngine {
        SqliteEngine::open("sqlite://", Arc::new(WaiterRegistry::new())).unwrap()
    }
}
