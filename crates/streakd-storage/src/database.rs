//! High-level database interface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use streakd_core::MatchDetail;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{ChatState, Occurrence, UserStats};
use crate::pool::ConnectionPool;
use crate::projector::{self, ResetOutcome, UndoOutcome};
use crate::repository::{EventsRepo, StateRepo, StatsRepo, TriggersRepo};

/// High-level database interface for streakd.
///
/// Projector operations run in a transaction: the occurrence and the new
/// chat state commit together or not at all.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "streakd", "streakd")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("streakd.db"))
    }

    pub(crate) fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    // === State machine ===

    /// Record a trigger detection and restart the streak.
    pub fn apply_trigger(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        message_id: Option<i64>,
        matches: Vec<MatchDetail>,
    ) -> Result<ResetOutcome> {
        self.apply_trigger_at(chat_id, user_id, username, message_id, matches, Utc::now())
    }

    /// As [`Self::apply_trigger`] with an explicit clock, for tests.
    pub fn apply_trigger_at(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        message_id: Option<i64>,
        matches: Vec<MatchDetail>,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let outcome =
            projector::apply_trigger_at(&tx, chat_id, user_id, username, message_id, matches, now)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Record an admin reset and restart the streak.
    pub fn apply_manual_reset(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        reason: &str,
    ) -> Result<ResetOutcome> {
        self.apply_manual_reset_at(chat_id, user_id, username, reason, Utc::now())
    }

    pub fn apply_manual_reset_at(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let outcome = projector::apply_manual_reset_at(&tx, chat_id, user_id, username, reason, now)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Roll back up to `count` most recent resets.
    pub fn apply_undo(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        count: i64,
    ) -> Result<UndoOutcome> {
        self.apply_undo_at(chat_id, user_id, username, count, Utc::now())
    }

    pub fn apply_undo_at(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        count: i64,
        now: DateTime<Utc>,
    ) -> Result<UndoOutcome> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let outcome = projector::apply_undo_at(&tx, chat_id, user_id, username, count, now)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Start the streak clock on first activity.
    pub fn ensure_streak_started(&self, chat_id: i64) -> Result<ChatState> {
        self.ensure_streak_started_at(chat_id, Utc::now())
    }

    pub fn ensure_streak_started_at(&self, chat_id: i64, now: DateTime<Utc>) -> Result<ChatState> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let state = projector::ensure_streak_started_at(&tx, chat_id, now)?;
        tx.commit()?;
        Ok(state)
    }

    // === Queries ===

    /// Current streak state for a chat.
    pub fn chat_state(&self, chat_id: i64) -> Result<ChatState> {
        let conn = self.pool.get()?;
        StateRepo::get(&conn, chat_id)
    }

    /// Rebuild a chat's state from its full occurrence log.
    pub fn replay_chat_state(&self, chat_id: i64) -> Result<ChatState> {
        let conn = self.pool.get()?;
        projector::replay_chat_state(&conn, chat_id)
    }

    /// Most recent occurrences for a chat, newest first.
    pub fn recent_events(&self, chat_id: i64, limit: i64) -> Result<Vec<Occurrence>> {
        let conn = self.pool.get()?;
        EventsRepo::recent(&conn, chat_id, limit)
    }

    /// Reset counters for one user.
    pub fn user_stats(&self, chat_id: i64, user_id: i64) -> Result<Option<UserStats>> {
        let conn = self.pool.get()?;
        StatsRepo::get(&conn, chat_id, user_id)
    }

    /// Top streak breakers for a chat.
    pub fn leaderboard(&self, chat_id: i64, limit: i64) -> Result<Vec<UserStats>> {
        let conn = self.pool.get()?;
        StatsRepo::top(&conn, chat_id, limit)
    }

    /// Chats ranked by best streak across the whole database.
    pub fn chat_leaderboard(&self, limit: i64) -> Result<Vec<ChatState>> {
        let conn = self.pool.get()?;
        StateRepo::chat_leaderboard(&conn, limit)
    }

    // === Maintenance ===

    /// Seed the process-wide default trigger set if none exists yet.
    pub fn seed_default_triggers(&self, lemmas: &[&str]) -> Result<()> {
        let conn = self.pool.get()?;
        TriggersRepo::seed_globals(&conn, lemmas)
    }

    /// Forget everything about a chat: log, state, stats and triggers.
    pub fn clear_chat(&self, chat_id: i64) -> Result<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        EventsRepo::delete_for_chat(&tx, chat_id)?;
        StateRepo::delete(&tx, chat_id)?;
        StatsRepo::delete_for_chat(&tx, chat_id)?;
        TriggersRepo::delete_for_chat(&tx, chat_id)?;
        tx.commit()?;
        info!(chat_id, "chat data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn trigger_commits_event_and_state_together() {
        let db = Database::in_memory().unwrap();

        let outcome = db.apply_trigger_at(1, 42, Some("alice"), None, vec![], t0()).unwrap();

        assert_eq!(db.chat_state(1).unwrap(), outcome.state);
        assert_eq!(db.recent_events(1, 10).unwrap().len(), 1);
    }

    #[test]
    fn leaderboard_ranks_breakers() {
        let db = Database::in_memory().unwrap();

        db.apply_trigger_at(1, 1, Some("alice"), None, vec![], t0()).unwrap();
        db.apply_trigger_at(1, 1, Some("alice"), None, vec![], t0() + Duration::seconds(10))
            .unwrap();
        db.apply_trigger_at(1, 2, Some("bob"), None, vec![], t0() + Duration::seconds(20))
            .unwrap();

        let board = db.leaderboard(1, 10).unwrap();
        assert_eq!(board[0].username.as_deref(), Some("alice"));
        assert_eq!(board[0].total(), 2);
    }

    #[test]
    fn clear_chat_removes_everything() {
        let db = Database::in_memory().unwrap();

        db.apply_trigger_at(1, 42, None, None, vec![], t0()).unwrap();
        db.clear_chat(1).unwrap();

        assert_eq!(db.chat_state(1).unwrap().total_resets, 0);
        assert!(db.recent_events(1, 10).unwrap().is_empty());
        assert!(db.user_stats(1, 42).unwrap().is_none());
    }

    #[test]
    fn replay_is_authoritative() {
        let db = Database::in_memory().unwrap();

        db.apply_trigger_at(1, 42, None, None, vec![], t0()).unwrap();
        db.apply_trigger_at(1, 42, None, None, vec![], t0() + Duration::seconds(300))
            .unwrap();
        db.apply_undo_at(1, 42, None, 1, t0() + Duration::seconds(400)).unwrap();

        assert_eq!(db.replay_chat_state(1).unwrap(), db.chat_state(1).unwrap());
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streakd.db");

        {
            let db = Database::with_path(&path).unwrap();
            db.apply_trigger_at(1, 42, None, None, vec![], t0()).unwrap();
        }

        let db = Database::with_path(&path).unwrap();
        assert_eq!(db.chat_state(1).unwrap().total_resets, 1);
    }
}
