use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::models::PrayerStatus;

/// Single-character marker for a prayer status
pub fn status_glyph(status: PrayerStatus) -> &'static str {
    match status {
        PrayerStatus::OnTime => "●",
        PrayerStatus::Late => "◐",
        PrayerStatus::Missed => "✗",
        PrayerStatus::NoEntry => "○",
    }
}

/// Heatmap cell for a completion level (see `stats::completion_level`)
pub fn completion_glyph(level: u8) -> &'static str {
    match level {
        0 => "○",
        1 => "◔",
        2 => "◑",
        3 => "◕",
        _ => "●",
    }
}

/// Format a stored instant as local "HH:MM"
pub fn format_time_local(instant: &DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M").to_string()
}

/// Parse a "YYYY-MM-DD" date argument, or today's local date when absent
pub fn parse_date_arg(arg: Option<&str>) -> Result<NaiveDate> {
    match arg {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s)),
    }
}

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u32, total: u32, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}
