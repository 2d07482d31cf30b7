//! Data models for the event log and state projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use streakd_core::MatchDetail;

/// Kind of an occurrence in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceKind {
    /// A trigger word was detected in a message.
    Trigger,
    /// An admin reset the streak by hand.
    ManualReset,
    /// A previous reset (or several) was rolled back.
    Undo,
}

impl OccurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceKind::Trigger => "trigger",
            OccurrenceKind::ManualReset => "manual_reset",
            OccurrenceKind::Undo => "undo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trigger" => Some(OccurrenceKind::Trigger),
            "manual_reset" => Some(OccurrenceKind::ManualReset),
            "undo" => Some(OccurrenceKind::Undo),
            _ => None,
        }
    }
}

/// Kind-specific payload of an occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OccurrenceDetails {
    /// The matches that broke the streak.
    Trigger { matches: Vec<MatchDetail> },
    /// Why the streak was reset manually.
    ManualReset { reason: String },
    /// Which occurrences were rolled back.
    Undo {
        undone_event_ids: Vec<i64>,
        undone_count: i64,
    },
}

/// A chat's streak state as a value, embedded into occurrences.
///
/// An occurrence's snapshot is always the state strictly before that
/// occurrence was applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub streak_start: Option<DateTime<Utc>>,
    pub best_streak_seconds: i64,
    pub best_streak_start: Option<DateTime<Utc>>,
    pub best_streak_end: Option<DateTime<Utc>>,
    pub last_reset_event_id: Option<i64>,
    pub last_reset_user_id: Option<i64>,
    pub last_reset_username: Option<String>,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub last_reset_details: Option<OccurrenceDetails>,
    pub total_resets: i64,
}

/// An occurrence not yet written to the log.
#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub chat_id: i64,
    pub kind: OccurrenceKind,
    pub user_id: i64,
    pub username: Option<String>,
    pub message_id: Option<i64>,
    pub details: OccurrenceDetails,
    pub snapshot: StateSnapshot,
    pub created_at: DateTime<Utc>,
}

/// A persisted occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: i64,
    pub chat_id: i64,
    pub kind: OccurrenceKind,
    pub user_id: i64,
    pub username: Option<String>,
    pub message_id: Option<i64>,
    pub details: OccurrenceDetails,
    pub snapshot: StateSnapshot,
    pub created_at: DateTime<Utc>,
}

impl Occurrence {
    /// Attaches the id assigned on insert.
    pub fn from_new(id: i64, new: NewOccurrence) -> Self {
        Self {
            id,
            chat_id: new.chat_id,
            kind: new.kind,
            user_id: new.user_id,
            username: new.username,
            message_id: new.message_id,
            details: new.details,
            snapshot: new.snapshot,
            created_at: new.created_at,
        }
    }
}

/// Current streak state for one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub chat_id: i64,
    pub streak_start: Option<DateTime<Utc>>,
    pub best_streak_seconds: i64,
    pub best_streak_start: Option<DateTime<Utc>>,
    pub best_streak_end: Option<DateTime<Utc>>,
    pub last_reset_event_id: Option<i64>,
    pub last_reset_user_id: Option<i64>,
    pub last_reset_username: Option<String>,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub last_reset_details: Option<OccurrenceDetails>,
    pub total_resets: i64,
}

impl ChatState {
    /// State of a chat nothing has ever happened in.
    pub fn unstarted(chat_id: i64) -> Self {
        Self {
            chat_id,
            streak_start: None,
            best_streak_seconds: 0,
            best_streak_start: None,
            best_streak_end: None,
            last_reset_event_id: None,
            last_reset_user_id: None,
            last_reset_username: None,
            last_reset_at: None,
            last_reset_details: None,
            total_resets: 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.streak_start.is_some()
    }

    /// Elapsed streak seconds at `now`; zero when unstarted.
    pub fn streak_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        self.streak_start
            .map(|start| (now - start).num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn to_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            streak_start: self.streak_start,
            best_streak_seconds: self.best_streak_seconds,
            best_streak_start: self.best_streak_start,
            best_streak_end: self.best_streak_end,
            last_reset_event_id: self.last_reset_event_id,
            last_reset_user_id: self.last_reset_user_id,
            last_reset_username: self.last_reset_username.clone(),
            last_reset_at: self.last_reset_at,
            last_reset_details: self.last_reset_details.clone(),
            total_resets: self.total_resets,
        }
    }

    pub fn from_snapshot(chat_id: i64, snapshot: StateSnapshot) -> Self {
        Self {
            chat_id,
            streak_start: snapshot.streak_start,
            best_streak_seconds: snapshot.best_streak_seconds,
            best_streak_start: snapshot.best_streak_start,
            best_streak_end: snapshot.best_streak_end,
            last_reset_event_id: snapshot.last_reset_event_id,
            last_reset_user_id: snapshot.last_reset_user_id,
            last_reset_username: snapshot.last_reset_username,
            last_reset_at: snapshot.last_reset_at,
            last_reset_details: snapshot.last_reset_details,
            total_resets: snapshot.total_resets,
        }
    }
}

/// Per-user reset counters within one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub trigger_count: i64,
    pub manual_reset_count: i64,
}

impl UserStats {
    /// Total resets this user caused.
    pub fn total(&self) -> i64 {
        self.trigger_count + self.manual_reset_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn occurrence_kind_round_trips() {
        for kind in [
            OccurrenceKind::Trigger,
            OccurrenceKind::ManualReset,
            OccurrenceKind::Undo,
        ] {
            assert_eq!(OccurrenceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OccurrenceKind::parse("bogus"), None);
    }

    #[test]
    fn details_serialize_with_type_tag() {
        let details = OccurrenceDetails::ManualReset {
            reason: "clean slate".to_string(),
        };
        let json = serde_json::to_string(&details).unwrap();
        assert!(json.contains("\"type\":\"manual_reset\""));
        assert!(json.contains("clean slate"));

        let back: OccurrenceDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(back, details);
    }

    #[test]
    fn streak_seconds_at_counts_elapsed() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut state = ChatState::unstarted(1);
        assert_eq!(state.streak_seconds_at(start), 0);

        state.streak_start = Some(start);
        let later = start + chrono::Duration::seconds(125);
        assert_eq!(state.streak_seconds_at(later), 125);
    }

    #[test]
    fn snapshot_round_trips_through_state() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut state = ChatState::unstarted(7);
        state.streak_start = Some(start);
        state.best_streak_seconds = 42;
        state.total_resets = 3;

        let restored = ChatState::from_snapshot(7, state.to_snapshot());
        assert_eq!(restored, state);
    }

    #[test]
    fn user_stats_total() {
        let stats = UserStats {
            chat_id: 1,
            user_id: 2,
            username: None,
            trigger_count: 3,
            manual_reset_count: 2,
        };
        assert_eq!(stats.total(), 5);
    }
}
