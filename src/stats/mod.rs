pub mod heatmap;
pub mod streaks;

pub use heatmap::{MAX_LEVEL, completion_level, daily_summaries};
pub use streaks::compute_stats;

/// Days of history fed into streak calculation.
pub const HISTORY_DAYS: usize = 30;
/// Window for weekly totals and per-prayer completion.
pub const WEEK_DAYS: usize = 7;
/// Days shown in the status grid.
pub const HEATMAP_DAYS: usize = 14;
