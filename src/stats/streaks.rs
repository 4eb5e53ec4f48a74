use std::collections::BTreeMap;

use super::WEEK_DAYS;
use crate::models::{PrayerSlot, PrayerStats, RecentDay, SlotStats, completed_count};

/// Derive streaks and weekly totals from a timeline ordered most recent first.
pub fn compute_stats(days: &[RecentDay]) -> PrayerStats {
    let completed: Vec<u32> = days.iter().map(|d| completed_count(&d.entries)).collect();
    let week = &days[..days.len().min(WEEK_DAYS)];

    let prayer_stats: BTreeMap<PrayerSlot, SlotStats> = PrayerSlot::ALL
        .iter()
        .map(|&slot| {
            let done = |d: &RecentDay| d.entries[slot.index()].status.is_completed();
            let stats = SlotStats {
                completed: week.iter().filter(|&d| done(d)).count() as u32,
                total: week.len() as u32,
                streak: days.iter().take_while(|&d| done(d)).count() as u32,
            };
            (slot, stats)
        })
        .collect();

    PrayerStats {
        completed_today: completed.first().copied().unwrap_or(0),
        current_streak: completed.iter().take_while(|&&c| c > 0).count() as u32,
        longest_streak: longest_run(&completed),
        total_completed_this_week: completed.iter().take(WEEK_DAYS).sum(),
        prayer_stats,
    }
}

fn longest_run(completed: &[u32]) -> u32 {
    let mut best = 0u32;
    let mut current = 0u32;
    for &count in completed {
        if count > 0 {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}
