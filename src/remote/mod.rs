//! Remote prayer table
//!
//! The remote keeps one row per (user, date, prayer) while the device keeps
//! one record per day. This module owns the mapping between the two shapes;
//! adapters only move rows.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::repository::format_date;
use crate::error::RemoteError;
use crate::models::{DayEntries, DayRecord, PrayerEntry, PrayerSlot, PrayerStatus, collect_entries};

pub use memory::MemoryRemote;
pub use sqlite::SqliteRemote;

/// One row of the remote `prayer_tracker` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub user_id: String,
    pub prayer_date: String,
    pub prayer_time: String,
    pub prayer_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteRow {
    pub fn from_entry(
        user_id: &str,
        date: NaiveDate,
        entry: &PrayerEntry,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            prayer_date: format_date(date),
            prayer_time: entry.slot.as_str().to_string(),
            prayer_status: entry.status.as_str().to_string(),
            created_at,
            updated_at: entry.timestamp.unwrap_or(now),
        }
    }

    /// Same (user, date, prayer) key; rows are unique on it by convention.
    pub fn same_key(&self, other: &RemoteRow) -> bool {
        self.user_id == other.user_id
            && self.prayer_date == other.prayer_date
            && self.prayer_time == other.prayer_time
    }

    /// Decode into an entry. Rows naming an unknown prayer are dropped; an
    /// unknown status reads as `no_entry`.
    pub fn to_entry(&self) -> Option<PrayerEntry> {
        let slot = match PrayerSlot::from_str(&self.prayer_time) {
            Ok(slot) => slot,
            Err(_) => {
                log::warn!(
                    "ignoring remote row with unknown prayer_time '{}' for {}",
                    self.prayer_time,
                    self.prayer_date
                );
                return None;
            }
        };
        let status = PrayerStatus::from_str(&self.prayer_status).unwrap_or_else(|_| {
            log::warn!(
                "unknown remote prayer_status '{}' for {} {}, reading as no_entry",
                self.prayer_status,
                self.prayer_date,
                slot
            );
            PrayerStatus::NoEntry
        });
        let timestamp = status.is_recorded().then_some(self.updated_at);
        Some(PrayerEntry::new(slot, status, timestamp))
    }
}

/// Fan a day record out into one row per prayer.
pub fn fan_out(record: &DayRecord, now: DateTime<Utc>) -> Vec<RemoteRow> {
    record
        .entries
        .iter()
        .map(|entry| RemoteRow::from_entry(&record.user_id, record.date, entry, record.created_at, now))
        .collect()
}

/// Fold remote entries back into a full day. Missing prayers stay `no_entry`.
pub fn fan_in(entries: &[PrayerEntry]) -> DayEntries {
    collect_entries(entries)
}

/// Remote table keyed by (user, date, prayer).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows stored for one user's date.
    async fn fetch_rows(&self, user_id: &str, date: NaiveDate) -> Result<Vec<RemoteRow>, RemoteError>;

    /// Update the row with the same key, or insert it if none exists.
    async fn upsert_row(&self, row: RemoteRow) -> Result<(), RemoteError>;

    async fn fetch_entries(&self, user_id: &str, date: NaiveDate) -> Result<Vec<PrayerEntry>, RemoteError> {
        let rows = self.fetch_rows(user_id, date).await?;
        Ok(rows.iter().filter_map(RemoteRow::to_entry).collect())
    }

    async fn upsert_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        entry: &PrayerEntry,
        created_at: DateTime<Utc>,
    ) -> Result<(), RemoteError> {
        let row = RemoteRow::from_entry(user_id, date, entry, created_at, Utc::now());
        self.upsert_row(row).await
    }
}
