//! Database schema and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(
            "Running migrations from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!("Migrations complete");
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration to version 1: Initial schema.
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("Applying migration v1: Initial schema");

    // Append-only occurrence log. `snapshot` is the chat state strictly
    // before the occurrence was applied.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            username TEXT,
            message_id INTEGER,
            details TEXT NOT NULL DEFAULT '{}',
            snapshot TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_chat ON events (chat_id, id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_chat_kind ON events (chat_id, kind, id)",
        [],
    )?;

    // Cached projection of the event log, one row per chat.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chat_state (
            chat_id INTEGER PRIMARY KEY,
            streak_start TEXT,
            best_streak_seconds INTEGER NOT NULL DEFAULT 0,
            best_streak_start TEXT,
            best_streak_end TEXT,
            last_reset_event_id INTEGER,
            last_reset_user_id INTEGER,
            last_reset_username TEXT,
            last_reset_at TEXT,
            last_reset_details TEXT,
            total_resets INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Per-user reset counters, floored at zero on undo.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_stats (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            username TEXT,
            trigger_count INTEGER NOT NULL DEFAULT 0,
            manual_reset_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        )",
        [],
    )?;

    // Per-chat trigger sets, lazily copied from global_triggers.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chat_triggers (
            chat_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            added_by INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (chat_id, kind, value)
        )",
        [],
    )?;

    // Process-wide defaults new chats start from.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS global_triggers (
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (kind, value)
        )",
        [],
    )?;

    Ok(())
}
