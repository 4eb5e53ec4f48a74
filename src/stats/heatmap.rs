use crate::models::{DailyStats, RecentDay, completed_count};

/// Highest heatmap intensity, a fully completed day.
pub const MAX_LEVEL: u8 = 4;

/// Heatmap intensity for a day's completed count: 0 for none, 1 for one,
/// 2 for two or three, 3 for four and 4 for all five.
pub fn completion_level(done: u8) -> u8 {
    match done {
        0 => 0,
        1 => 1,
        2 | 3 => 2,
        4 => 3,
        _ => MAX_LEVEL,
    }
}

/// Per-day summaries for a status grid, oldest first. Takes the same
/// most-recent-first timeline as `compute_stats`.
pub fn daily_summaries(days: &[RecentDay]) -> Vec<DailyStats> {
    days.iter()
        .rev()
        .map(|day| DailyStats {
            date: day.date,
            prayers_done: completed_count(&day.entries) as u8,
            statuses: day.entries.clone().map(|e| e.status),
        })
        .collect()
}
