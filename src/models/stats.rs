use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DayEntries, PrayerSlot, PrayerStatus, SLOT_COUNT};

/// One calendar day of the reconciled timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDay {
    pub date: NaiveDate,
    pub entries: DayEntries,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStats {
    pub completed: u32,
    pub total: u32,
    pub streak: u32,
}

impl SlotStats {
    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerStats {
    pub completed_today: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completed_this_week: u32,
    pub prayer_stats: BTreeMap<PrayerSlot, SlotStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub prayers_done: u8,
    pub statuses: [PrayerStatus; SLOT_COUNT],
}

impl DailyStats {
    pub fn completion_ratio(&self) -> f64 {
        self.prayers_done as f64 / self.statuses.len() as f64
    }
}
