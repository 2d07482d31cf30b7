//! Chat state repository.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::events::parse_datetime;
use crate::error::Result;
use crate::models::ChatState;

/// Repository for the cached per-chat streak projection.
pub struct StateRepo;

impl StateRepo {
    /// Current state for a chat; unstarted default when never written.
    pub fn get(conn: &Connection, chat_id: i64) -> Result<ChatState> {
        let mut stmt = conn.prepare(
            "SELECT chat_id, streak_start, best_streak_seconds, best_streak_start,
                    best_streak_end, last_reset_event_id, last_reset_user_id,
                    last_reset_username, last_reset_at, last_reset_details, total_resets
             FROM chat_state WHERE chat_id = ?1",
        )?;

        let state = stmt.query_row([chat_id], map_row).optional()?;
        Ok(state.unwrap_or_else(|| ChatState::unstarted(chat_id)))
    }

    /// Replace a chat's state wholesale.
    pub fn upsert(conn: &Connection, state: &ChatState) -> Result<()> {
        let details = state
            .last_reset_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO chat_state (chat_id, streak_start, best_streak_seconds,
                best_streak_start, best_streak_end, last_reset_event_id,
                last_reset_user_id, last_reset_username, last_reset_at,
                last_reset_details, total_resets)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(chat_id) DO UPDATE SET
                streak_start = excluded.streak_start,
                best_streak_seconds = excluded.best_streak_seconds,
                best_streak_start = excluded.best_streak_start,
                best_streak_end = excluded.best_streak_end,
                last_reset_event_id = excluded.last_reset_event_id,
                last_reset_user_id = excluded.last_reset_user_id,
                last_reset_username = excluded.last_reset_username,
                last_reset_at = excluded.last_reset_at,
                last_reset_details = excluded.last_reset_details,
                total_resets = excluded.total_resets",
            params![
                state.chat_id,
                state.streak_start.map(|t| t.to_rfc3339()),
                state.best_streak_seconds,
                state.best_streak_start.map(|t| t.to_rfc3339()),
                state.best_streak_end.map(|t| t.to_rfc3339()),
                state.last_reset_event_id,
                state.last_reset_user_id,
                state.last_reset_username,
                state.last_reset_at.map(|t| t.to_rfc3339()),
                details,
                state.total_resets,
            ],
        )?;

        Ok(())
    }

    /// Chats ranked by their best streak, longest first.
    pub fn chat_leaderboard(conn: &Connection, limit: i64) -> Result<Vec<ChatState>> {
        let mut stmt = conn.prepare(
            "SELECT chat_id, streak_start, best_streak_seconds, best_streak_start,
                    best_streak_end, last_reset_event_id, last_reset_user_id,
                    last_reset_username, last_reset_at, last_reset_details, total_resets
             FROM chat_state
             ORDER BY best_streak_seconds DESC, chat_id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a chat's state row.
    pub fn delete(conn: &Connection, chat_id: i64) -> Result<()> {
        conn.execute("DELETE FROM chat_state WHERE chat_id = ?1", [chat_id])?;
        Ok(())
    }
}

fn map_row(row: &Row) -> rusqlite::Result<ChatState> {
    let details: Option<String> = row.get(9)?;
    let details = details
        .map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(ChatState {
        chat_id: row.get(0)?,
        streak_start: row.get::<_, Option<String>>(1)?.map(|s| parse_datetime(&s)),
        best_streak_seconds: row.get(2)?,
        best_streak_start: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
        best_streak_end: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
        last_reset_event_id: row.get(5)?,
        last_reset_user_id: row.get(6)?,
        last_reset_username: row.get(7)?,
        last_reset_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        last_reset_details: details,
        total_resets: row.get(10)?,
    })
}
