use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of daily prayers tracked per day.
pub const SLOT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerSlot {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerSlot {
    pub const ALL: [PrayerSlot; SLOT_COUNT] = [
        PrayerSlot::Fajr,
        PrayerSlot::Dhuhr,
        PrayerSlot::Asr,
        PrayerSlot::Maghrib,
        PrayerSlot::Isha,
    ];

    pub fn all() -> [PrayerSlot; SLOT_COUNT] {
        Self::ALL
    }

    pub fn from_index(index: usize) -> Option<PrayerSlot> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        match self {
            PrayerSlot::Fajr => 0,
            PrayerSlot::Dhuhr => 1,
            PrayerSlot::Asr => 2,
            PrayerSlot::Maghrib => 3,
            PrayerSlot::Isha => 4,
        }
    }

    /// Lowercase name used by the remote `prayer_time` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerSlot::Fajr => "fajr",
            PrayerSlot::Dhuhr => "dhuhr",
            PrayerSlot::Asr => "asr",
            PrayerSlot::Maghrib => "maghrib",
            PrayerSlot::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerSlot::Fajr => "Fajr",
            PrayerSlot::Dhuhr => "Dhuhr",
            PrayerSlot::Asr => "Asr",
            PrayerSlot::Maghrib => "Maghrib",
            PrayerSlot::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PrayerSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fajr" => Ok(PrayerSlot::Fajr),
            "dhuhr" | "zuhr" | "dhur" => Ok(PrayerSlot::Dhuhr),
            "asr" => Ok(PrayerSlot::Asr),
            "maghrib" => Ok(PrayerSlot::Maghrib),
            "isha" => Ok(PrayerSlot::Isha),
            _ => Err(anyhow::anyhow!("Unknown prayer: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerStatus {
    OnTime,
    Late,
    Missed,
    #[default]
    NoEntry,
}

impl PrayerStatus {
    /// Order used when a prayer card is tapped repeatedly.
    pub const CYCLE: [PrayerStatus; 4] = [
        PrayerStatus::OnTime,
        PrayerStatus::Late,
        PrayerStatus::Missed,
        PrayerStatus::NoEntry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerStatus::OnTime => "on_time",
            PrayerStatus::Late => "late",
            PrayerStatus::Missed => "missed",
            PrayerStatus::NoEntry => "no_entry",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrayerStatus::OnTime => "Prayed on time",
            PrayerStatus::Late => "Prayed late",
            PrayerStatus::Missed => "Missed",
            PrayerStatus::NoEntry => "No entry",
        }
    }

    /// Next status in the tap cycle: on_time → late → missed → no_entry → on_time.
    pub fn advance(self) -> PrayerStatus {
        match self {
            PrayerStatus::OnTime => PrayerStatus::Late,
            PrayerStatus::Late => PrayerStatus::Missed,
            PrayerStatus::Missed => PrayerStatus::NoEntry,
            PrayerStatus::NoEntry => PrayerStatus::OnTime,
        }
    }

    /// Advance a status given by its wire name. Unrecognised input starts the
    /// cycle over at `on_time` instead of failing.
    pub fn advance_raw(raw: &str) -> PrayerStatus {
        match PrayerStatus::from_str(raw) {
            Ok(status) => status.advance(),
            Err(_) => PrayerStatus::CYCLE[0],
        }
    }

    /// Legacy checkbox values: `true` means prayed on time.
    pub fn from_completed(completed: bool) -> PrayerStatus {
        if completed {
            PrayerStatus::OnTime
        } else {
            PrayerStatus::NoEntry
        }
    }

    /// `on_time` and `late` count towards streaks.
    pub fn is_completed(&self) -> bool {
        matches!(self, PrayerStatus::OnTime | PrayerStatus::Late)
    }

    pub fn is_recorded(&self) -> bool {
        *self != PrayerStatus::NoEntry
    }
}

impl std::fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PrayerStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(PrayerStatus::OnTime),
            "late" => Ok(PrayerStatus::Late),
            "missed" => Ok(PrayerStatus::Missed),
            "no_entry" => Ok(PrayerStatus::NoEntry),
            _ => Err(anyhow::anyhow!("Unknown prayer status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerEntry {
    pub slot: PrayerSlot,
    pub status: PrayerStatus,
    /// When the status was last recorded; absent while `no_entry`.
    pub timestamp: Option<DateTime<Utc>>,
}

impl PrayerEntry {
    pub fn empty(slot: PrayerSlot) -> Self {
        Self {
            slot,
            status: PrayerStatus::NoEntry,
            timestamp: None,
        }
    }

    pub fn new(slot: PrayerSlot, status: PrayerStatus, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            slot,
            status,
            timestamp,
        }
    }

    /// The entry after one tap, stamped with `now` unless it returns to `no_entry`.
    pub fn advanced(&self, now: DateTime<Utc>) -> PrayerEntry {
        let status = self.status.advance();
        PrayerEntry {
            slot: self.slot,
            status,
            timestamp: status.is_recorded().then_some(now),
        }
    }
}

/// Five entries, one per slot, in slot order.
pub type DayEntries = [PrayerEntry; SLOT_COUNT];

pub fn default_entries() -> DayEntries {
    PrayerSlot::ALL.map(PrayerEntry::empty)
}

/// Place entries in slot order. Slots not present stay `no_entry`; when a
/// slot repeats, the last one wins.
pub fn collect_entries(entries: &[PrayerEntry]) -> DayEntries {
    let mut day = default_entries();
    for entry in entries {
        day[entry.slot.index()] = entry.clone();
    }
    day
}

pub fn completed_count(entries: &[PrayerEntry]) -> u32 {
    entries.iter().filter(|e| e.status.is_completed()).count() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub entries: DayEntries,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
}

impl DayRecord {
    /// A fresh record with every slot at `no_entry`.
    pub fn new(user_id: &str, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date,
            entries: default_entries(),
            created_at: now,
            updated_at: now,
            synced: false,
        }
    }

    pub fn entry(&self, slot: PrayerSlot) -> &PrayerEntry {
        &self.entries[slot.index()]
    }

    pub fn completed_count(&self) -> u32 {
        completed_count(&self.entries)
    }

    /// Replace the entries as a local edit: bumps `updated_at`, clears `synced`.
    pub fn apply_local_edit(&mut self, entries: DayEntries, now: DateTime<Utc>) {
        self.entries = entries;
        self.updated_at = now;
        self.synced = false;
    }
}
