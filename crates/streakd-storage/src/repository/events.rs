//! Occurrence log repository.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::models::{NewOccurrence, Occurrence, OccurrenceKind};

const COLUMNS: &str =
    "id, chat_id, kind, user_id, username, message_id, details, snapshot, created_at";

/// Repository for the append-only occurrence log.
pub struct EventsRepo;

impl EventsRepo {
    /// Insert a new occurrence, returning its id.
    pub fn insert(conn: &Connection, occurrence: &NewOccurrence) -> Result<i64> {
        let details = serde_json::to_string(&occurrence.details)?;
        let snapshot = serde_json::to_string(&occurrence.snapshot)?;

        conn.execute(
            "INSERT INTO events (chat_id, kind, user_id, username, message_id, details, snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                occurrence.chat_id,
                occurrence.kind.as_str(),
                occurrence.user_id,
                occurrence.username,
                occurrence.message_id,
                details,
                snapshot,
                occurrence.created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an occurrence by id.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Occurrence>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM events WHERE id = ?1"))?;
        let occurrence = stmt.query_row([id], map_row).ok();
        Ok(occurrence)
    }

    /// Most recent occurrences for a chat, newest first.
    pub fn recent(conn: &Connection, chat_id: i64, limit: i64) -> Result<Vec<Occurrence>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM events WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2"
        ))?;
        let occurrences = stmt
            .query_map(params![chat_id, limit], map_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(occurrences)
    }

    /// Most recent non-UNDO occurrences for a chat, newest first.
    ///
    /// These are the candidates an undo can roll back.
    pub fn last_undoable(conn: &Connection, chat_id: i64, count: i64) -> Result<Vec<Occurrence>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM events
             WHERE chat_id = ?1 AND kind != 'undo'
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let occurrences = stmt
            .query_map(params![chat_id, count], map_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(occurrences)
    }

    /// Every occurrence for a chat in log order. Used by replay.
    pub fn all_for_chat(conn: &Connection, chat_id: i64) -> Result<Vec<Occurrence>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM events WHERE chat_id = ?1 ORDER BY id ASC"
        ))?;
        let occurrences = stmt
            .query_map([chat_id], map_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(occurrences)
    }

    /// Count occurrences for a chat.
    pub fn count_for_chat(conn: &Connection, chat_id: i64) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE chat_id = ?1",
            [chat_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete every occurrence for a chat.
    pub fn delete_for_chat(conn: &Connection, chat_id: i64) -> Result<i64> {
        let deleted = conn.execute("DELETE FROM events WHERE chat_id = ?1", [chat_id])?;
        Ok(deleted as i64)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<Occurrence> {
    let kind: String = row.get(2)?;
    let details: String = row.get(6)?;
    let snapshot: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Occurrence {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        kind: OccurrenceKind::parse(&kind).unwrap_or(OccurrenceKind::Trigger),
        user_id: row.get(3)?,
        username: row.get(4)?,
        message_id: row.get(5)?,
        details: serde_json::from_str(&details)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        snapshot: serde_json::from_str(&snapshot)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        created_at: parse_datetime(&created_at),
    })
}

/// Parse a datetime from SQLite format.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
