//! User statistics repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{OccurrenceKind, UserStats};

/// Repository for per-user reset counters.
pub struct StatsRepo;

impl StatsRepo {
    /// Bump the counter matching `kind` for a user, creating the row if
    /// needed and refreshing the stored username.
    pub fn increment(
        conn: &Connection,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        kind: OccurrenceKind,
    ) -> Result<()> {
        let Some(column) = counter_column(kind) else {
            return Ok(());
        };

        conn.execute(
            &format!(
                "INSERT INTO user_stats (chat_id, user_id, username, {column})
                 VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT(chat_id, user_id) DO UPDATE SET
                    {column} = {column} + 1,
                    username = COALESCE(excluded.username, user_stats.username)"
            ),
            params![chat_id, user_id, username],
        )?;

        Ok(())
    }

    /// Decrement the counter matching `kind`, floored at zero.
    pub fn decrement(
        conn: &Connection,
        chat_id: i64,
        user_id: i64,
        kind: OccurrenceKind,
    ) -> Result<()> {
        let Some(column) = counter_column(kind) else {
            return Ok(());
        };

        conn.execute(
            &format!(
                "UPDATE user_stats SET {column} = MAX({column} - 1, 0)
                 WHERE chat_id = ?1 AND user_id = ?2"
            ),
            params![chat_id, user_id],
        )?;

        Ok(())
    }

    /// Stats for one user, if any were ever recorded.
    pub fn get(conn: &Connection, chat_id: i64, user_id: i64) -> Result<Option<UserStats>> {
        let mut stmt = conn.prepare(
            "SELECT chat_id, user_id, username, trigger_count, manual_reset_count
             FROM user_stats WHERE chat_id = ?1 AND user_id = ?2",
        )?;
        let stats = stmt
            .query_row(params![chat_id, user_id], map_row)
            .optional()?;
        Ok(stats)
    }

    /// Top streak breakers for a chat, by total resets caused.
    pub fn top(conn: &Connection, chat_id: i64, limit: i64) -> Result<Vec<UserStats>> {
        let mut stmt = conn.prepare(
            "SELECT chat_id, user_id, username, trigger_count, manual_reset_count
             FROM user_stats WHERE chat_id = ?1
             ORDER BY trigger_count + manual_reset_count DESC, user_id ASC
             LIMIT ?2",
        )?;
        let stats = stmt
            .query_map(params![chat_id, limit], map_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(stats)
    }

    /// Delete every stats row for a chat.
    pub fn delete_for_chat(conn: &Connection, chat_id: i64) -> Result<()> {
        conn.execute("DELETE FROM user_stats WHERE chat_id = ?1", [chat_id])?;
        Ok(())
    }
}

/// UNDO occurrences carry no counter of their own.
fn counter_column(kind: OccurrenceKind) -> Option<&'static str> {
    match kind {
        OccurrenceKind::Trigger => Some("trigger_count"),
        OccurrenceKind::ManualReset => Some("manual_reset_count"),
        OccurrenceKind::Undo => None,
    }
}

fn map_row(row: &Row) -> rusqlite::Result<UserStats> {
    Ok(UserStats {
        chat_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        trigger_count: row.get(3)?,
        manual_reset_count: row.get(4)?,
    })
}
