//! Event-sourced state transitions.
//!
//! Every function here runs inside a caller-provided transaction so an
//! occurrence and its state update commit together or not at all. The
//! cached `chat_state` row is a projection of the log; `replay_chat_state`
//! rebuilds it from scratch and serves as the test oracle.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use streakd_core::MatchDetail;
use tracing::debug;

use crate::error::Result;
use crate::models::{
    ChatState, NewOccurrence, Occurrence, OccurrenceDetails, OccurrenceKind, StateSnapshot,
};
use crate::repository::{EventsRepo, StateRepo, StatsRepo};

/// Result of applying a TRIGGER or MANUAL_RESET occurrence.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub occurrence: Occurrence,
    pub state: ChatState,
    /// Elapsed seconds of the streak that was just broken.
    pub broken_seconds: i64,
}

/// Result of applying an UNDO occurrence.
#[derive(Debug, Clone)]
pub struct UndoOutcome {
    /// The rolled-back occurrences, newest first.
    pub undone: Vec<Occurrence>,
    pub state: ChatState,
    /// May be less than requested if history was shorter.
    pub undone_count: i64,
}

/// Records a trigger detection and restarts the streak.
pub fn apply_trigger_at(
    conn: &Connection,
    chat_id: i64,
    user_id: i64,
    username: Option<&str>,
    message_id: Option<i64>,
    matches: Vec<MatchDetail>,
    now: DateTime<Utc>,
) -> Result<ResetOutcome> {
    apply_reset_at(
        conn,
        chat_id,
        user_id,
        username,
        message_id,
        OccurrenceKind::Trigger,
        OccurrenceDetails::Trigger { matches },
        now,
    )
}

/// Records an admin-initiated reset and restarts the streak.
pub fn apply_manual_reset_at(
    conn: &Connection,
    chat_id: i64,
    user_id: i64,
    username: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<ResetOutcome> {
    apply_reset_at(
        conn,
        chat_id,
        user_id,
        username,
        None,
        OccurrenceKind::ManualReset,
        OccurrenceDetails::ManualReset {
            reason: reason.to_string(),
        },
        now,
    )
}

#[allow(clippy::too_many_arguments)]
fn apply_reset_at(
    conn: &Connection,
    chat_id: i64,
    user_id: i64,
    username: Option<&str>,
    message_id: Option<i64>,
    kind: OccurrenceKind,
    details: OccurrenceDetails,
    now: DateTime<Utc>,
) -> Result<ResetOutcome> {
    let old = StateRepo::get(conn, chat_id)?;
    let broken_seconds = old.streak_seconds_at(now);

    let new_occurrence = NewOccurrence {
        chat_id,
        kind,
        user_id,
        username: username.map(str::to_string),
        message_id,
        details: details.clone(),
        snapshot: old.to_snapshot(),
        created_at: now,
    };
    let id = EventsRepo::insert(conn, &new_occurrence)?;

    let mut state = old.clone();
    if broken_seconds > state.best_streak_seconds {
        state.best_streak_seconds = broken_seconds;
        state.best_streak_start = old.streak_start;
        state.best_streak_end = Some(now);
    }
    state.streak_start = Some(now);
    state.total_resets += 1;
    state.last_reset_event_id = Some(id);
    state.last_reset_user_id = Some(user_id);
    state.last_reset_username = username.map(str::to_string);
    state.last_reset_at = Some(now);
    state.last_reset_details = Some(details);

    StateRepo::upsert(conn, &state)?;
    StatsRepo::increment(conn, chat_id, user_id, username, kind)?;

    debug!(chat_id, user_id, kind = kind.as_str(), broken_seconds, "streak reset");

    Ok(ResetOutcome {
        occurrence: Occurrence::from_new(id, new_occurrence),
        state,
        broken_seconds,
    })
}

/// Rolls back up to `count` most recent resettable occurrences.
///
/// The snapshot on the oldest fetched occurrence is the exact pre-image
/// of the whole undone window, so restoring it rewinds the chat to that
/// point in history. Zero eligible occurrences is a no-op, not an error.
pub fn apply_undo_at(
    conn: &Connection,
    chat_id: i64,
    user_id: i64,
    username: Option<&str>,
    count: i64,
    now: DateTime<Utc>,
) -> Result<UndoOutcome> {
    let undone = EventsRepo::last_undoable(conn, chat_id, count)?;
    if undone.is_empty() {
        return Ok(UndoOutcome {
            undone,
            state: StateRepo::get(conn, chat_id)?,
            undone_count: 0,
        });
    }

    let current = StateRepo::get(conn, chat_id)?;
    let restored_snapshot: StateSnapshot = undone[undone.len() - 1].snapshot.clone();
    let undone_ids: Vec<i64> = undone.iter().map(|o| o.id).collect();
    let undone_count = undone.len() as i64;

    let undo_occurrence = NewOccurrence {
        chat_id,
        kind: OccurrenceKind::Undo,
        user_id,
        username: username.map(str::to_string),
        message_id: None,
        details: OccurrenceDetails::Undo {
            undone_event_ids: undone_ids,
            undone_count,
        },
        snapshot: current.to_snapshot(),
        created_at: now,
    };
    EventsRepo::insert(conn, &undo_occurrence)?;

    let restored = ChatState::from_snapshot(chat_id, restored_snapshot);
    StateRepo::upsert(conn, &restored)?;

    for occurrence in &undone {
        StatsRepo::decrement(conn, chat_id, occurrence.user_id, occurrence.kind)?;
    }

    debug!(chat_id, user_id, undone_count, "undo applied");

    Ok(UndoOutcome {
        undone,
        state: restored,
        undone_count,
    })
}

/// Starts the streak clock on first activity if it never ran.
pub fn ensure_streak_started_at(
    conn: &Connection,
    chat_id: i64,
    now: DateTime<Utc>,
) -> Result<ChatState> {
    let mut state = StateRepo::get(conn, chat_id)?;
    if !state.is_started() {
        state.streak_start = Some(now);
        StateRepo::upsert(conn, &state)?;
        debug!(chat_id, "streak clock started");
    }
    Ok(state)
}

/// Rebuilds a chat's state by folding its full occurrence log.
///
/// The authoritative oracle for what `chat_state` must contain after any
/// sequence of operations; `streak_start` set by `ensure_streak_started`
/// alone is a cache-only convenience and is not reconstructed.
pub fn replay_chat_state(conn: &Connection, chat_id: i64) -> Result<ChatState> {
    let occurrences = EventsRepo::all_for_chat(conn, chat_id)?;
    let by_id: std::collections::HashMap<i64, &Occurrence> =
        occurrences.iter().map(|o| (o.id, o)).collect();

    let mut state = ChatState::unstarted(chat_id);
    for occurrence in &occurrences {
        match occurrence.kind {
            OccurrenceKind::Trigger | OccurrenceKind::ManualReset => {
                let broken = state.streak_seconds_at(occurrence.created_at);
                if broken > state.best_streak_seconds {
                    state.best_streak_seconds = broken;
                    state.best_streak_start = state.streak_start;
                    state.best_streak_end = Some(occurrence.created_at);
                }
                state.streak_start = Some(occurrence.created_at);
                state.total_resets += 1;
                state.last_reset_event_id = Some(occurrence.id);
                state.last_reset_user_id = Some(occurrence.user_id);
                state.last_reset_username = occurrence.username.clone();
                state.last_reset_at = Some(occurrence.created_at);
                state.last_reset_details = Some(occurrence.details.clone());
            }
            OccurrenceKind::Undo => {
                if let OccurrenceDetails::Undo {
                    undone_event_ids, ..
                } = &occurrence.details
                {
                    if let Some(oldest) = undone_event_ids
                        .iter()
                        .min()
                        .and_then(|id| by_id.get(id))
                    {
                        state = ChatState::from_snapshot(chat_id, oldest.snapshot.clone());
                    }
                }
            }
        }
    }

    Ok(state)
}
