//! Database connection pool.
//!
//! A Mutex-protected connection is enough for a single-process bot and
//! simpler than r2d2. Holding the guard also serializes the
//! read-modify-write transactions the projector relies on.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StorageError};
use crate::schema::run_migrations;

/// Thread-safe database connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPool {
    /// Create a new connection pool with a file-based database.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::setup_connection(&conn)?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a new connection pool with an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup_connection(&conn)?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get a connection from the pool.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::Config("Connection pool poisoned".to_string()))?;

        Ok(PooledConnection { guard })
    }

    /// Setup connection pragmas for performance and safety.
    fn setup_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;

        // Cache size (negative = KB, positive = pages)
        conn.execute_batch("PRAGMA cache_size = -2000;")?;

        Ok(())
    }
}

/// A connection borrowed from the pool.
pub struct PooledConnection<'a> {
    guard: MutexGuard<'a, Connection>,
}

impl<'a> std::ops::Deref for PooledConnection<'a> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}
