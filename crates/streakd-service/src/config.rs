//! Service configuration from the environment.

use std::path::PathBuf;

use streakd_storage::Database;
use tracing::info;

use crate::error::Result;

/// Trigger words seeded when no `STREAKD_TRIGGERS` is set.
const DEFAULT_TRIGGERS: &[&str] = &["тест"];

/// Runtime configuration for the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Database file; `None` means the platform app-data directory.
    pub db_path: Option<PathBuf>,
    /// Default trigger lemmas new installations start from.
    pub default_triggers: Vec<String>,
}

impl ServiceConfig {
    /// Read configuration from `STREAKD_DB` and `STREAKD_TRIGGERS`
    /// (comma-separated lemmas).
    pub fn from_env() -> Self {
        let db_path = std::env::var("STREAKD_DB").ok().map(PathBuf::from);

        let default_triggers = std::env::var("STREAKD_TRIGGERS")
            .map(|raw| {
                raw.split(',')
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|words| !words.is_empty())
            .unwrap_or_else(|| DEFAULT_TRIGGERS.iter().map(|w| w.to_string()).collect());

        Self {
            db_path,
            default_triggers,
        }
    }

    /// Open the configured database and seed the default trigger set.
    pub fn open_database(&self) -> Result<Database> {
        let db = match &self.db_path {
            Some(path) => Database::with_path(path)?,
            None => Database::new()?,
        };

        let lemmas: Vec<&str> = self.default_triggers.iter().map(String::as_str).collect();
        db.seed_default_triggers(&lemmas)?;
        info!(triggers = ?self.default_triggers, "database ready");

        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_unset() {
        // Env access in tests is racy across the suite, so build the
        // parsing path directly.
        let config = ServiceConfig {
            db_path: None,
            default_triggers: DEFAULT_TRIGGERS.iter().map(|w| w.to_string()).collect(),
        };
        assert!(!config.default_triggers.is_empty());
    }
}
