//! Trigger set repository.
//!
//! Trigger rows come in two kinds: `lemma` (a plain word the lemma layer
//! looks up) and `rule` (a generated evasion rule name). New chats are
//! lazily seeded by copying the global defaults.

use rusqlite::{params, Connection};
use streakd_core::{generate_variants, ChatTriggers};

use crate::error::{Result, StorageError};

const KIND_LEMMA: &str = "lemma";
const KIND_RULE: &str = "rule";

/// Repository for per-chat and global trigger sets.
pub struct TriggersRepo;

impl TriggersRepo {
    /// Populate `global_triggers` with `lemmas` and their generated
    /// rules if the table is still empty.
    pub fn seed_globals(conn: &Connection, lemmas: &[&str]) -> Result<()> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM global_triggers", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        for lemma in lemmas {
            let lemma = lemma.trim().to_lowercase();
            conn.execute(
                "INSERT OR IGNORE INTO global_triggers (kind, value, enabled) VALUES (?1, ?2, 1)",
                params![KIND_LEMMA, lemma],
            )?;
            for variant in generate_variants(&lemma) {
                conn.execute(
                    "INSERT OR IGNORE INTO global_triggers (kind, value, enabled) VALUES (?1, ?2, ?3)",
                    params![KIND_RULE, variant.name, variant.enabled],
                )?;
            }
        }

        Ok(())
    }

    /// Copy the global defaults into a chat that has no triggers yet.
    pub fn ensure_chat_seeded(conn: &Connection, chat_id: i64) -> Result<()> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_triggers WHERE chat_id = ?1",
            [chat_id],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Ok(());
        }

        conn.execute(
            "INSERT INTO chat_triggers (chat_id, kind, value, enabled)
             SELECT ?1, kind, value, enabled FROM global_triggers",
            [chat_id],
        )?;

        Ok(())
    }

    /// Load a chat's trigger set: enabled lemmas plus every rule with
    /// its enabled flag.
    pub fn load(conn: &Connection, chat_id: i64) -> Result<ChatTriggers> {
        let mut triggers = ChatTriggers::default();

        let mut stmt = conn.prepare(
            "SELECT value FROM chat_triggers
             WHERE chat_id = ?1 AND kind = ?2 AND enabled = 1",
        )?;
        let lemmas = stmt.query_map(params![chat_id, KIND_LEMMA], |row| row.get(0))?;
        for lemma in lemmas {
            triggers.lemmas.insert(lemma?);
        }

        let mut stmt = conn.prepare(
            "SELECT value, enabled FROM chat_triggers WHERE chat_id = ?1 AND kind = ?2",
        )?;
        let rules = stmt.query_map(params![chat_id, KIND_RULE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;
        for rule in rules {
            let (name, enabled) = rule?;
            triggers.rules.insert(name, enabled);
        }

        Ok(triggers)
    }

    /// Add a lemma and its generated rules to a chat.
    ///
    /// Re-adding an existing lemma re-enables it and reports `false`;
    /// a genuinely new lemma reports `true`.
    pub fn add_lemma(
        conn: &Connection,
        chat_id: i64,
        lemma: &str,
        added_by: Option<i64>,
    ) -> Result<bool> {
        let lemma = lemma.trim().to_lowercase();

        let updated = conn.execute(
            "UPDATE chat_triggers SET enabled = 1
             WHERE chat_id = ?1 AND kind = ?2 AND value = ?3",
            params![chat_id, KIND_LEMMA, lemma],
        )?;
        let newly_added = updated == 0;

        if newly_added {
            conn.execute(
                "INSERT INTO chat_triggers (chat_id, kind, value, enabled, added_by)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![chat_id, KIND_LEMMA, lemma, added_by],
            )?;
        }

        for variant in generate_variants(&lemma) {
            conn.execute(
                "INSERT OR IGNORE INTO chat_triggers (chat_id, kind, value, enabled, added_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![chat_id, KIND_RULE, variant.name, variant.enabled, added_by],
            )?;
        }

        Ok(newly_added)
    }

    /// Remove a lemma and every rule named `{lemma}_*` from a chat.
    ///
    /// Reports whether the lemma existed.
    pub fn remove_lemma(conn: &Connection, chat_id: i64, lemma: &str) -> Result<bool> {
        let lemma = lemma.trim().to_lowercase();

        let removed = conn.execute(
            "DELETE FROM chat_triggers WHERE chat_id = ?1 AND kind = ?2 AND value = ?3",
            params![chat_id, KIND_LEMMA, lemma],
        )?;

        let pattern = format!("{}\\_%", escape_like(&lemma));
        conn.execute(
            "DELETE FROM chat_triggers
             WHERE chat_id = ?1 AND kind = ?2 AND value LIKE ?3 ESCAPE '\\'",
            params![chat_id, KIND_RULE, pattern],
        )?;

        Ok(removed > 0)
    }

    /// Enable or disable a single rule by name.
    pub fn set_rule_enabled(
        conn: &Connection,
        chat_id: i64,
        rule: &str,
        enabled: bool,
    ) -> Result<()> {
        let updated = conn.execute(
            "UPDATE chat_triggers SET enabled = ?1
             WHERE chat_id = ?2 AND kind = ?3 AND value = ?4",
            params![enabled, chat_id, KIND_RULE, rule],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("rule {rule}")));
        }
        Ok(())
    }

    /// Every lemma for a chat with its enabled flag, sorted by value.
    pub fn list_lemmas(conn: &Connection, chat_id: i64) -> Result<Vec<(String, bool)>> {
        Self::list_kind(conn, chat_id, KIND_LEMMA)
    }

    /// Every rule for a chat with its enabled flag, sorted by name.
    pub fn list_rules(conn: &Connection, chat_id: i64) -> Result<Vec<(String, bool)>> {
        Self::list_kind(conn, chat_id, KIND_RULE)
    }

    fn list_kind(conn: &Connection, chat_id: i64, kind: &str) -> Result<Vec<(String, bool)>> {
        let mut stmt = conn.prepare(
            "SELECT value, enabled FROM chat_triggers
             WHERE chat_id = ?1 AND kind = ?2 ORDER BY value",
        )?;
        let rows = stmt
            .query_map(params![chat_id, kind], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Delete every trigger row for a chat.
    pub fn delete_for_chat(conn: &Connection, chat_id: i64) -> Result<()> {
        conn.execute("DELETE FROM chat_triggers WHERE chat_id = ?1", [chat_id])?;
        Ok(())
    }
}

/// Escape LIKE wildcards so a lemma is matched literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_seed_globals_once() {
        let conn = setup_db();

        TriggersRepo::seed_globals(&conn, &["тест"]).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM global_triggers", [], |row| row.get(0))
            .unwrap();
        assert!(count > 1, "lemma plus generated rules expected");

        // Second seed with different words must not overwrite.
        TriggersRepo::seed_globals(&conn, &["другое"]).unwrap();
        let after: i64 = conn
            .query_row("SELECT COUNT(*) FROM global_triggers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, after);
    }

    #[test]
    fn test_chat_seeded_from_globals() {
        let conn = setup_db();
        TriggersRepo::seed_globals(&conn, &["тест"]).unwrap();

        TriggersRepo::ensure_chat_seeded(&conn, 1).unwrap();
        let triggers = TriggersRepo::load(&conn, 1).unwrap();

        assert!(triggers.lemmas.contains("тест"));
        assert!(triggers.rules.contains_key("тест_lookalike"));
    }

    #[test]
    fn test_chats_mutate_independently() {
        let conn = setup_db();
        TriggersRepo::seed_globals(&conn, &["тест"]).unwrap();
        TriggersRepo::ensure_chat_seeded(&conn, 1).unwrap();
        TriggersRepo::ensure_chat_seeded(&conn, 2).unwrap();

        TriggersRepo::remove_lemma(&conn, 1, "тест").unwrap();

        assert!(!TriggersRepo::load(&conn, 1).unwrap().lemmas.contains("тест"));
        assert!(TriggersRepo::load(&conn, 2).unwrap().lemmas.contains("тест"));
    }

    #[test]
    fn test_add_lemma_registers_rules() {
        let conn = setup_db();

        assert!(TriggersRepo::add_lemma(&conn, 1, "Привет", Some(42)).unwrap());
        let triggers = TriggersRepo::load(&conn, 1).unwrap();

        assert!(triggers.lemmas.contains("привет"));
        assert!(triggers.rules.contains_key("привет_spaced"));
        assert_eq!(triggers.rules.get("привет_spaced"), Some(&true));
    }

    #[test]
    fn test_re_add_is_idempotent() {
        let conn = setup_db();

        assert!(TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap());
        let before = TriggersRepo::load(&conn, 1).unwrap();

        assert!(!TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap());
        let after = TriggersRepo::load(&conn, 1).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_remove_lemma_drops_prefixed_rules() {
        let conn = setup_db();

        TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap();
        assert!(TriggersRepo::remove_lemma(&conn, 1, "тест").unwrap());

        let triggers = TriggersRepo::load(&conn, 1).unwrap();
        assert!(triggers.lemmas.is_empty());
        assert!(triggers.rules.is_empty());

        assert!(!TriggersRepo::remove_lemma(&conn, 1, "тест").unwrap());
    }

    #[test]
    fn test_disabled_lemma_not_loaded() {
        let conn = setup_db();

        TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap();
        conn.execute(
            "UPDATE chat_triggers SET enabled = 0 WHERE kind = 'lemma' AND value = 'тест'",
            [],
        )
        .unwrap();

        let triggers = TriggersRepo::load(&conn, 1).unwrap();
        assert!(!triggers.lemmas.contains("тест"));

        // Re-adding re-enables it.
        TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap();
        assert!(TriggersRepo::load(&conn, 1).unwrap().lemmas.contains("тест"));
    }

    #[test]
    fn test_set_rule_enabled() {
        let conn = setup_db();

        TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap();
        TriggersRepo::set_rule_enabled(&conn, 1, "тест_spaced", false).unwrap();

        let triggers = TriggersRepo::load(&conn, 1).unwrap();
        assert_eq!(triggers.rules.get("тест_spaced"), Some(&false));
    }

    #[test]
    fn test_unknown_rule_is_not_found() {
        let conn = setup_db();

        let err = TriggersRepo::set_rule_enabled(&conn, 1, "nope_spaced", true).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_list_lemmas_and_rules() {
        let conn = setup_db();

        TriggersRepo::add_lemma(&conn, 1, "тест", None).unwrap();
        let lemmas = TriggersRepo::list_lemmas(&conn, 1).unwrap();
        assert_eq!(lemmas, vec![("тест".to_string(), true)]);

        let rules = TriggersRepo::list_rules(&conn, 1).unwrap();
        assert!(rules.iter().any(|(name, _)| name == "тест_lookalike"));
    }
}
