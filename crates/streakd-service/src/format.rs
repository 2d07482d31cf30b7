//! Russian display strings for chat frontends.

use chrono::{DateTime, Utc};
use streakd_core::duration::{format_duration, format_elapsed_since};
use streakd_core::{MatchDetail, MatchKind};
use streakd_storage::{Occurrence, OccurrenceDetails, UndoOutcome, UserStats};

use crate::service::{StreakBroken, StreakReport};

/// A user's display handle; falls back to the numeric id.
pub fn display_name(username: Option<&str>, user_id: i64) -> String {
    match username {
        Some(name) => format!("@{name}"),
        None => format!("id{user_id}"),
    }
}

/// One match rendered as the surface fragment plus what caught it.
pub fn format_match(m: &MatchDetail) -> String {
    match m.kind {
        MatchKind::Lemma => format!("«{}» (лемма {})", m.text, m.matched),
        MatchKind::Regex => format!("«{}» (правило {})", m.text, m.matched),
    }
}

/// Announcement posted when a trigger breaks the streak.
pub fn streak_broken_message(broken: &StreakBroken) -> String {
    let who = display_name(broken.occurrence.username.as_deref(), broken.occurrence.user_id);
    let held = format_duration(broken.broken_seconds);
    let best = format_duration(broken.state.best_streak_seconds);

    let mut lines = vec![
        format!("💥 {who} сбросил счётчик!"),
        format!("Продержались: {held}"),
        format!("Рекорд: {best}"),
    ];

    if let Some(m) = broken.detection.matches.first() {
        lines.push(format!("Сработало: {}", format_match(m)));
    }

    lines.join("\n")
}

/// Current standing, for the counter command.
pub fn counter_message(report: &StreakReport) -> String {
    if !report.state.is_started() {
        return "Счётчик ещё не запущен. Напишите что-нибудь!".to_string();
    }

    let current = format_duration(report.current_seconds);
    let best = format_duration(report.state.best_streak_seconds);
    format!(
        "⏱ Без срывов: {current}\n🏆 Рекорд: {best}\n🔁 Всего сбросов: {}",
        report.state.total_resets
    )
}

/// Confirmation for an undo, or the nothing-to-undo notice.
pub fn undo_message(outcome: &UndoOutcome) -> String {
    if outcome.undone_count == 0 {
        return "Нечего отменять.".to_string();
    }

    format!(
        "↩️ Отменено сбросов: {}. Счётчик восстановлен.",
        outcome.undone_count
    )
}

/// Ranked list of streak breakers.
pub fn leaderboard_message(board: &[UserStats]) -> String {
    if board.is_empty() {
        return "Пока никто не сбрасывал счётчик. 🎉".to_string();
    }

    let mut out = String::from("🏆 Кто чаще всех срывает счётчик:\n");
    for (rank, stats) in board.iter().enumerate() {
        let who = display_name(stats.username.as_deref(), stats.user_id);
        out.push_str(&format!("{}. {who}: {}\n", rank + 1, stats.total()));
    }
    out.trim_end().to_string()
}

/// Trigger word list with enabled markers.
pub fn triggers_message(words: &[(String, bool)]) -> String {
    if words.is_empty() {
        return "Список слов пуст.".to_string();
    }

    let mut out = String::from("📋 Слова-триггеры:\n");
    for (word, enabled) in words {
        let marker = if *enabled { "✅" } else { "🚫" };
        out.push_str(&format!("{marker} {word}\n"));
    }
    out.trim_end().to_string()
}

/// One line of the event history.
pub fn event_line(occurrence: &Occurrence, now: DateTime<Utc>) -> String {
    let who = display_name(occurrence.username.as_deref(), occurrence.user_id);
    let when = format_elapsed_since(occurrence.created_at, now);
    match &occurrence.details {
        OccurrenceDetails::Trigger { matches } => {
            let what = matches
                .first()
                .map(format_match)
                .unwrap_or_else(|| "?".to_string());
            format!("{when}: {who} сорвался, {what}")
        }
        OccurrenceDetails::ManualReset { reason } => {
            format!("{when}: {who} сбросил вручную ({reason})")
        }
        OccurrenceDetails::Undo { undone_count, .. } => {
            format!("{when}: {who} отменил сбросов: {undone_count}")
        }
    }
}
