//! Trigger registry with a TTL read cache.
//!
//! Reads go through a per-chat cache so the hot message path does not
//! hit SQLite every time; mutations invalidate the chat's entry
//! synchronously so the next read is consistent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use streakd_core::ChatTriggers;
use tracing::debug;

use crate::database::Database;
use crate::error::Result;
use crate::repository::TriggersRepo;

/// How long a cached trigger set stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CacheEntry {
    triggers: ChatTriggers,
    fetched_at: Instant,
}

/// Per-chat trigger sets backed by the database.
#[derive(Clone)]
pub struct TriggerRegistry {
    db: Database,
    cache: Arc<RwLock<HashMap<i64, CacheEntry>>>,
    ttl: Duration,
}

impl TriggerRegistry {
    pub fn new(db: Database) -> Self {
        Self::with_ttl(db, DEFAULT_TTL)
    }

    /// Registry with an explicit TTL, for tests.
    pub fn with_ttl(db: Database, ttl: Duration) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Trigger set for a chat, seeding it from the global defaults on
    /// first reference.
    pub fn triggers_for(&self, chat_id: i64) -> Result<ChatTriggers> {
        if let Some(entry) = self.cache.read().get(&chat_id) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.triggers.clone());
            }
        }

        let triggers = self.load(chat_id)?;
        self.cache.write().insert(
            chat_id,
            CacheEntry {
                triggers: triggers.clone(),
                fetched_at: Instant::now(),
            },
        );
        debug!(chat_id, "trigger cache refreshed");
        Ok(triggers)
    }

    fn load(&self, chat_id: i64) -> Result<ChatTriggers> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        let triggers = TriggersRepo::load(&tx, chat_id)?;
        tx.commit()?;
        Ok(triggers)
    }

    /// Add a lemma (and its generated rules) to a chat.
    ///
    /// Idempotent: re-adding re-enables and reports `false`.
    pub fn add_lemma(&self, chat_id: i64, lemma: &str, added_by: Option<i64>) -> Result<bool> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        let added = TriggersRepo::add_lemma(&tx, chat_id, lemma, added_by)?;
        tx.commit()?;

        self.invalidate(chat_id);
        Ok(added)
    }

    /// Remove a lemma and every `{lemma}_*` rule from a chat.
    pub fn remove_lemma(&self, chat_id: i64, lemma: &str) -> Result<bool> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        let removed = TriggersRepo::remove_lemma(&tx, chat_id, lemma)?;
        tx.commit()?;

        self.invalidate(chat_id);
        Ok(removed)
    }

    /// Enable or disable one rule; unknown names report `NotFound`
    /// without mutating anything.
    pub fn set_rule_enabled(&self, chat_id: i64, rule: &str, enabled: bool) -> Result<()> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        TriggersRepo::set_rule_enabled(&tx, chat_id, rule, enabled)?;
        tx.commit()?;

        self.invalidate(chat_id);
        Ok(())
    }

    /// Every lemma for a chat with its enabled flag.
    pub fn list_lemmas(&self, chat_id: i64) -> Result<Vec<(String, bool)>> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        let lemmas = TriggersRepo::list_lemmas(&tx, chat_id)?;
        tx.commit()?;
        Ok(lemmas)
    }

    /// Every rule for a chat with its enabled flag.
    pub fn list_rules(&self, chat_id: i64) -> Result<Vec<(String, bool)>> {
        let conn = self.db.pool().get()?;
        let tx = conn.unchecked_transaction()?;
        TriggersRepo::ensure_chat_seeded(&tx, chat_id)?;
        let rules = TriggersRepo::list_rules(&tx, chat_id)?;
        tx.commit()?;
        Ok(rules)
    }

    /// Drop one chat's cache entry.
    pub fn invalidate(&self, chat_id: i64) {
        self.cache.write().remove(&chat_id);
    }

    /// Drop the whole cache.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TriggerRegistry {
        let db = Database::in_memory().unwrap();
        db.seed_default_triggers(&["тест"]).unwrap();
        TriggerRegistry::new(db)
    }

    #[test]
    fn first_reference_seeds_from_globals() {
        let reg = registry();
        let triggers = reg.triggers_for(1).unwrap();

        assert!(triggers.lemmas.contains("тест"));
        assert!(triggers.rules.contains_key("тест_spaced"));
    }

    #[test]
    fn mutation_visible_within_ttl() {
        let reg = registry();
        reg.triggers_for(1).unwrap();

        // Cached entry is fresh, but the mutation must still be seen.
        reg.set_rule_enabled(1, "тест_spaced", false).unwrap();
        let triggers = reg.triggers_for(1).unwrap();
        assert_eq!(triggers.rules.get("тест_spaced"), Some(&false));
    }

    #[test]
    fn add_lemma_idempotent() {
        let reg = registry();

        assert!(reg.add_lemma(1, "привет", Some(42)).unwrap());
        assert!(!reg.add_lemma(1, "привет", Some(42)).unwrap());

        let triggers = reg.triggers_for(1).unwrap();
        assert!(triggers.lemmas.contains("привет"));
        assert!(triggers.rules.contains_key("привет_lookalike"));
    }

    #[test]
    fn remove_lemma_drops_rules() {
        let reg = registry();
        reg.add_lemma(1, "привет", None).unwrap();

        assert!(reg.remove_lemma(1, "привет").unwrap());
        let triggers = reg.triggers_for(1).unwrap();
        assert!(!triggers.lemmas.contains("привет"));
        assert!(!triggers.rules.keys().any(|r| r.starts_with("привет_")));
    }

    #[test]
    fn unknown_rule_not_found() {
        let reg = registry();
        let err = reg.set_rule_enabled(1, "nope_spaced", false).unwrap_err();
        assert!(matches!(err, crate::error::StorageError::NotFound(_)));
    }

    #[test]
    fn chats_do_not_share_mutations() {
        let reg = registry();
        reg.add_lemma(1, "привет", None).unwrap();

        let other = reg.triggers_for(2).unwrap();
        assert!(!other.lemmas.contains("привет"));
    }

    #[test]
    fn expired_entry_is_refetched() {
        let db = Database::in_memory().unwrap();
        db.seed_default_triggers(&["тест"]).unwrap();
        let reg = TriggerRegistry::with_ttl(db.clone(), Duration::from_millis(10));

        reg.triggers_for(1).unwrap();

        // Mutate behind the cache's back, then wait out the TTL.
        {
            let conn = db.pool().get().unwrap();
            TriggersRepo::set_rule_enabled(&conn, 1, "тест_spaced", false).unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));

        let triggers = reg.triggers_for(1).unwrap();
        assert_eq!(triggers.rules.get("тест_spaced"), Some(&false));
    }
}
