//! The streak service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use streakd_core::{DetectionResult, Detector};
use streakd_storage::{
    ChatState, Database, Occurrence, ResetOutcome, TriggerRegistry, UndoOutcome, UserStats,
};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

/// Most resets a single undo may roll back.
pub const MAX_UNDO: i64 = 10;

/// Shortest trigger word accepted by `add_word`.
const MIN_WORD_CHARS: usize = 2;

/// An inbound chat message. `text` is the body or media caption; `None`
/// for non-text messages, which still advance the streak clock.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub message_id: Option<i64>,
    pub text: Option<String>,
}

/// What a detected trigger did to the streak.
#[derive(Debug, Clone)]
pub struct StreakBroken {
    pub occurrence: Occurrence,
    pub state: ChatState,
    pub broken_seconds: i64,
    pub detection: DetectionResult,
}

/// Snapshot of a chat's streak for display.
#[derive(Debug, Clone)]
pub struct StreakReport {
    pub state: ChatState,
    pub current_seconds: i64,
}

/// Message processing and admin operations over one database.
///
/// Cloning is cheap; clones share the registry cache and chat locks.
#[derive(Clone)]
pub struct StreakService {
    db: Database,
    registry: TriggerRegistry,
    detector: Detector,
    chat_locks: Arc<parking_lot::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl StreakService {
    pub fn new(db: Database, registry: TriggerRegistry, detector: Detector) -> Self {
        Self {
            db,
            registry,
            detector,
            chat_locks: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    /// Per-chat mutex serializing every read-modify-write for that chat.
    ///
    /// Entries are never evicted: a lock must stay unique per chat for
    /// the process lifetime, and an entry is two pointers. A deployment
    /// with unbounded chat churn would need an eviction scheme that
    /// only drops locks with no outstanding clones.
    fn chat_lock(&self, chat_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.chat_locks
            .lock()
            .entry(chat_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Process one inbound message.
    ///
    /// Starts the streak clock on first activity, runs detection on text
    /// and applies a trigger reset when something matched. Returns what
    /// broke, or `None` for harmless messages.
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<Option<StreakBroken>> {
        self.process_message_at(msg, Utc::now()).await
    }

    /// As [`Self::process_message`] with an explicit clock, for tests.
    pub async fn process_message_at(
        &self,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Option<StreakBroken>> {
        let lock = self.chat_lock(msg.chat_id);
        let _guard = lock.lock().await;

        self.db.ensure_streak_started_at(msg.chat_id, now)?;

        let Some(text) = msg.text.as_deref() else {
            return Ok(None);
        };

        let triggers = self.registry.triggers_for(msg.chat_id)?;
        let detection = self.detector.detect(text, &triggers);

        if detection.excluded {
            debug!(
                chat_id = msg.chat_id,
                reason = detection.exclusion_reason.as_deref(),
                "message excluded"
            );
            return Ok(None);
        }
        if !detection.triggered {
            return Ok(None);
        }

        let outcome = self.db.apply_trigger_at(
            msg.chat_id,
            msg.user_id,
            msg.username.as_deref(),
            msg.message_id,
            detection.matches.clone(),
            now,
        )?;

        info!(
            chat_id = msg.chat_id,
            user_id = msg.user_id,
            matches = detection.matches.len(),
            broken_seconds = outcome.broken_seconds,
            "streak broken"
        );

        Ok(Some(StreakBroken {
            occurrence: outcome.occurrence,
            state: outcome.state,
            broken_seconds: outcome.broken_seconds,
            detection,
        }))
    }

    /// Reset the streak by hand.
    pub async fn manual_reset(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        reason: &str,
    ) -> Result<ResetOutcome> {
        let lock = self.chat_lock(chat_id);
        let _guard = lock.lock().await;
        Ok(self.db.apply_manual_reset(chat_id, user_id, username, reason)?)
    }

    /// Roll back recent resets. `count` is clamped to `1..=MAX_UNDO`;
    /// an empty history rolls back nothing and is not an error.
    pub async fn undo(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<&str>,
        count: i64,
    ) -> Result<UndoOutcome> {
        let count = count.clamp(1, MAX_UNDO);
        let lock = self.chat_lock(chat_id);
        let _guard = lock.lock().await;
        Ok(self.db.apply_undo(chat_id, user_id, username, count)?)
    }

    /// Current streak standing for display.
    pub fn streak_report(&self, chat_id: i64) -> Result<StreakReport> {
        self.streak_report_at(chat_id, Utc::now())
    }

    pub fn streak_report_at(&self, chat_id: i64, now: DateTime<Utc>) -> Result<StreakReport> {
        let state = self.db.chat_state(chat_id)?;
        let current_seconds = state.streak_seconds_at(now);
        Ok(StreakReport {
            state,
            current_seconds,
        })
    }

    /// Top streak breakers.
    pub fn leaderboard(&self, chat_id: i64, limit: i64) -> Result<Vec<UserStats>> {
        Ok(self.db.leaderboard(chat_id, limit)?)
    }

    /// Recent occurrence history, newest first.
    pub fn recent_events(&self, chat_id: i64, limit: i64) -> Result<Vec<Occurrence>> {
        Ok(self.db.recent_events(chat_id, limit)?)
    }

    /// Chats ranked by best streak.
    pub fn chat_leaderboard(&self, limit: i64) -> Result<Vec<ChatState>> {
        Ok(self.db.chat_leaderboard(limit)?)
    }

    /// Forget a chat entirely: log, state, stats, triggers and caches.
    pub async fn clear_chat(&self, chat_id: i64) -> Result<()> {
        let lock = self.chat_lock(chat_id);
        let _guard = lock.lock().await;
        self.db.clear_chat(chat_id)?;
        self.registry.invalidate(chat_id);
        Ok(())
    }

    // === Trigger management ===

    /// Add a trigger word; reports `true` when it was genuinely new.
    pub fn add_word(&self, chat_id: i64, word: &str, added_by: Option<i64>) -> Result<bool> {
        let word = word.trim().to_lowercase();
        if word.chars().count() < MIN_WORD_CHARS {
            return Err(ServiceError::InvalidWord(word));
        }
        Ok(self.registry.add_lemma(chat_id, &word, added_by)?)
    }

    /// Remove a trigger word and its generated rules.
    pub fn remove_word(&self, chat_id: i64, word: &str) -> Result<bool> {
        Ok(self.registry.remove_lemma(chat_id, word)?)
    }

    /// Enable one evasion rule by name.
    pub fn enable_rule(&self, chat_id: i64, rule: &str) -> Result<()> {
        Ok(self.registry.set_rule_enabled(chat_id, rule, true)?)
    }

    /// Disable one evasion rule by name.
    pub fn disable_rule(&self, chat_id: i64, rule: &str) -> Result<()> {
        Ok(self.registry.set_rule_enabled(chat_id, rule, false)?)
    }

    /// Every trigger word with its enabled flag.
    pub fn list_words(&self, chat_id: i64) -> Result<Vec<(String, bool)>> {
        Ok(self.registry.list_lemmas(chat_id)?)
    }

    /// Every evasion rule with its enabled flag.
    pub fn list_rules(&self, chat_id: i64) -> Result<Vec<(String, bool)>> {
        Ok(self.registry.list_rules(chat_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use streakd_core::IdentityLemmatizer;

    fn service() -> StreakService {
        let db = Database::in_memory().unwrap();
        db.seed_default_triggers(&["тест"]).unwrap();
        let registry = TriggerRegistry::new(db.clone());
        let detector = Detector::new(Arc::new(IdentityLemmatizer));
        StreakService::new(db, registry, detector)
    }

    fn msg(chat_id: i64, user_id: i64, text: &str) -> InboundMessage {
        InboundMessage {
            chat_id,
            user_id,
            username: Some("alice".to_string()),
            message_id: Some(1),
            text: Some(text.to_string()),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn harmless_message_starts_clock_only() {
        let svc = service();

        let result = svc.process_message_at(&msg(1, 42, "доброе утро"), t0()).await.unwrap();
        assert!(result.is_none());

        let report = svc.streak_report_at(1, t0() + Duration::seconds(125)).unwrap();
        assert_eq!(report.current_seconds, 125);
        assert_eq!(report.state.total_resets, 0);
    }

    #[tokio::test]
    async fn non_text_message_starts_clock() {
        let svc = service();

        let photo = InboundMessage {
            chat_id: 1,
            user_id: 42,
            username: None,
            message_id: Some(1),
            text: None,
        };
        svc.process_message_at(&photo, t0()).await.unwrap();

        assert!(svc.streak_report_at(1, t0()).unwrap().state.is_started());
    }

    #[tokio::test]
    async fn trigger_breaks_streak() {
        let svc = service();

        svc.process_message_at(&msg(1, 42, "привет"), t0()).await.unwrap();
        let broken = svc
            .process_message_at(&msg(1, 42, "ну это тест"), t0() + Duration::seconds(125))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(broken.broken_seconds, 125);
        assert!(broken.detection.triggered);
        assert_eq!(broken.state.total_resets, 1);
    }

    #[tokio::test]
    async fn evasive_spelling_breaks_streak() {
        let svc = service();

        let broken = svc
            .process_message_at(&msg(1, 42, "т е с т"), t0())
            .await
            .unwrap();
        assert!(broken.is_some());
    }

    #[tokio::test]
    async fn quoted_trigger_does_not_break() {
        let svc = service();

        let result = svc
            .process_message_at(&msg(1, 42, "он сказал \"тест\" вчера"), t0())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(svc.streak_report_at(1, t0()).unwrap().state.total_resets, 0);
    }

    #[tokio::test]
    async fn undo_count_is_clamped() {
        let svc = service();

        for i in 0..3 {
            svc.process_message_at(
                &msg(1, 42, "тест"),
                t0() + Duration::seconds(i * 10),
            )
            .await
            .unwrap();
        }

        // Requests above MAX_UNDO clamp to MAX_UNDO; 3 events exist.
        let outcome = svc.undo(1, 42, None, 999).await.unwrap();
        assert_eq!(outcome.undone_count, 3);

        // Zero and negative requests clamp up to one.
        let outcome = svc.undo(2, 42, None, 0).await.unwrap();
        assert_eq!(outcome.undone_count, 0);
        svc.process_message_at(&msg(2, 42, "тест"), t0()).await.unwrap();
        svc.process_message_at(&msg(2, 42, "тест"), t0() + Duration::seconds(5))
            .await
            .unwrap();
        let outcome = svc.undo(2, 42, None, 0).await.unwrap();
        assert_eq!(outcome.undone_count, 1);
    }

    #[tokio::test]
    async fn manual_reset_restarts_streak() {
        let svc = service();

        svc.process_message_at(&msg(1, 42, "привет"), t0()).await.unwrap();
        let outcome = svc.manual_reset(1, 42, Some("alice"), "порядок").await.unwrap();

        assert_eq!(outcome.state.total_resets, 1);
        assert!(outcome.state.is_started());
    }

    #[tokio::test]
    async fn add_word_validates_length() {
        let svc = service();

        let err = svc.add_word(1, "я", None).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidWord(_)));

        assert!(svc.add_word(1, "Привет", Some(42)).unwrap());
        let words = svc.list_words(1).unwrap();
        assert!(words.iter().any(|(w, _)| w == "привет"));
    }

    #[tokio::test]
    async fn added_word_detected_immediately() {
        let svc = service();

        svc.add_word(1, "банан", None).unwrap();
        let broken = svc
            .process_message_at(&msg(1, 42, "хочу банан"), t0())
            .await
            .unwrap();
        assert!(broken.is_some());
    }

    #[tokio::test]
    async fn disabled_rule_stops_matching() {
        let svc = service();

        svc.disable_rule(1, "тест_spaced").unwrap();
        svc.disable_rule(1, "тест_translit_spaced").unwrap();

        let result = svc.process_message_at(&msg(1, 42, "т е с т"), t0()).await.unwrap();
        assert!(result.is_none());

        svc.enable_rule(1, "тест_spaced").unwrap();
        let result = svc
            .process_message_at(&msg(1, 42, "т е с т"), t0() + Duration::seconds(1))
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn removed_word_no_longer_triggers() {
        let svc = service();

        assert!(svc.remove_word(1, "тест").unwrap());
        let result = svc.process_message_at(&msg(1, 42, "тест"), t0()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn leaderboard_tracks_breakers() {
        let svc = service();

        svc.process_message_at(&msg(1, 42, "тест"), t0()).await.unwrap();
        svc.process_message_at(&msg(1, 42, "тест"), t0() + Duration::seconds(10))
            .await
            .unwrap();

        let board = svc.leaderboard(1, 10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].trigger_count, 2);
    }

    #[tokio::test]
    async fn clear_chat_wipes_history_and_custom_words() {
        let svc = service();

        svc.add_word(1, "банан", None).unwrap();
        svc.process_message_at(&msg(1, 42, "тест"), t0()).await.unwrap();
        svc.clear_chat(1).await.unwrap();

        assert_eq!(svc.streak_report_at(1, t0()).unwrap().state.total_resets, 0);
        assert!(svc.recent_events(1, 10).unwrap().is_empty());
        // The next reference reseeds from the global defaults.
        let words = svc.list_words(1).unwrap();
        assert!(words.iter().any(|(w, _)| w == "тест"));
        assert!(!words.iter().any(|(w, _)| w == "банан"));
    }

    #[tokio::test]
    async fn chat_leaderboard_ranks_chats() {
        let svc = service();

        svc.process_message_at(&msg(1, 42, "привет"), t0()).await.unwrap();
        svc.process_message_at(&msg(1, 42, "тест"), t0() + Duration::seconds(500))
            .await
            .unwrap();
        svc.process_message_at(&msg(2, 42, "привет"), t0()).await.unwrap();
        svc.process_message_at(&msg(2, 42, "тест"), t0() + Duration::seconds(50))
            .await
            .unwrap();

        let board = svc.chat_leaderboard(10).unwrap();
        assert_eq!(board[0].chat_id, 1);
        assert_eq!(board[0].best_streak_seconds, 500);
    }

    #[tokio::test]
    async fn concurrent_messages_serialize_per_chat() {
        let svc = service();

        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.process_message(&msg(1, 42, &format!("тест {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Every message triggered; counts must be exact, not raced.
        let report = svc.streak_report(1).unwrap();
        assert_eq!(report.state.total_resets, 8);
        let board = svc.leaderboard(1, 10).unwrap();
        assert_eq!(board[0].trigger_count, 8);
    }
}
