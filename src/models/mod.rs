pub mod prayer;
pub mod stats;

pub use prayer::{
    DayEntries, DayRecord, PrayerEntry, PrayerSlot, PrayerStatus, SLOT_COUNT, collect_entries,
    completed_count, default_entries,
};
pub use stats::{DailyStats, PrayerStats, RecentDay, SlotStats};
