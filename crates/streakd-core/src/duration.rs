//! Human-readable streak durations (Russian).

use chrono::{DateTime, Utc};

/// Formats a duration in seconds as `"N дн. M ч. K мин."`.
///
/// Zero components are dropped; a duration under a minute renders as
/// `"0 мин."`, and `"0 минут"` is reserved for nothing-elapsed-yet.
pub fn format_duration(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "0 минут".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} дн."));
    }
    if hours > 0 {
        parts.push(format!("{hours} ч."));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{minutes} мин."));
    }

    parts.join(" ")
}

/// Formats how long ago `ts` was, as `"N сек. назад"` through
/// `"N дн. назад"`, coarsest fitting unit only.
pub fn format_elapsed_since(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - ts).num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds} сек. назад")
    } else if seconds < 3_600 {
        format!("{} мин. назад", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} ч. назад", seconds / 3_600)
    } else {
        format!("{} дн. назад", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn zero_renders_as_zero_minutes() {
        assert_eq!(format_duration(0), "0 минут");
    }

    #[test]
    fn under_a_minute_renders_zero_min() {
        assert_eq!(format_duration(1), "0 мин.");
        assert_eq!(format_duration(59), "0 мин.");
    }

    #[test]
    fn minutes_only() {
        assert_eq!(format_duration(125), "2 мин.");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_duration(3_600 + 120), "1 ч. 2 мин.");
    }

    #[test]
    fn days_hours_minutes() {
        assert_eq!(format_duration(2 * 86_400 + 3 * 3_600 + 60), "2 дн. 3 ч. 1 мин.");
    }

    #[test]
    fn exact_hour_drops_minutes() {
        assert_eq!(format_duration(7_200), "2 ч.");
    }

    #[test]
    fn negative_clamped_to_zero() {
        assert_eq!(format_duration(-10), "0 минут");
    }

    #[test]
    fn elapsed_picks_coarsest_unit() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_elapsed_since(t0, t0 + Duration::seconds(30)), "30 сек. назад");
        assert_eq!(format_elapsed_since(t0, t0 + Duration::seconds(125)), "2 мин. назад");
        assert_eq!(format_elapsed_since(t0, t0 + Duration::hours(5)), "5 ч. назад");
        assert_eq!(format_elapsed_since(t0, t0 + Duration::days(3)), "3 дн. назад");
    }
}
