//! In-memory view of loaded days and optimistic status updates.
//!
//! A tap is visible in the cached day as soon as it is applied; persisting
//! and scheduling the push follow. If either of those fails, only the tapped
//! prayer is put back.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::scheduler::SyncScheduler;
use super::service::SyncService;
use crate::models::{DayRecord, PrayerEntry, PrayerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Visible in the cache, not yet stored.
    Applied,
    /// Being written to the local store.
    Persisting,
    /// Stored locally with a sync queued.
    Confirmed,
    /// Undone; the cache holds the previous entry again.
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: PrayerSlot,
    pub previous: PrayerEntry,
    pub next: PrayerEntry,
    state: WriteState,
}

impl PendingWrite {
    pub fn state(&self) -> WriteState {
        self.state
    }

    fn advance_to(&mut self, next: WriteState) {
        let allowed = matches!(
            (self.state, next),
            (WriteState::Applied, WriteState::Persisting)
                | (WriteState::Persisting, WriteState::Confirmed)
                | (WriteState::Persisting, WriteState::RolledBack)
        );
        debug_assert!(allowed, "invalid write transition {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

type DayKey = (String, NaiveDate);

pub struct DayTracker {
    service: Arc<SyncService>,
    scheduler: Arc<SyncScheduler>,
    days: HashMap<DayKey, DayRecord>,
}

impl DayTracker {
    pub fn new(service: Arc<SyncService>, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            service,
            scheduler,
            days: HashMap::new(),
        }
    }

    pub fn service(&self) -> &Arc<SyncService> {
        &self.service
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    /// Resolve a day and keep it cached for later taps.
    pub async fn load_day(&mut self, user_id: &str, date: NaiveDate) -> DayRecord {
        let record = self.service.resolve_day(user_id, date).await;
        self.days.insert((user_id.to_string(), date), record.clone());
        record
    }

    /// Cache a record the caller already holds.
    pub fn insert_day(&mut self, record: DayRecord) {
        self.days.insert((record.user_id.clone(), record.date), record);
    }

    pub fn day(&self, user_id: &str, date: NaiveDate) -> Option<&DayRecord> {
        self.days.get(&(user_id.to_string(), date))
    }

    /// Advance one prayer of a cached day in memory only. Returns `None` if
    /// the day is not loaded, the user id is empty, or the index is not a slot.
    pub fn begin_update(&mut self, user_id: &str, date: NaiveDate, slot_index: usize) -> Option<PendingWrite> {
        if user_id.trim().is_empty() {
            log::warn!("update ignored: no user id");
            return None;
        }
        let Some(slot) = PrayerSlot::from_index(slot_index) else {
            log::warn!("update ignored: slot index {} out of range", slot_index);
            return None;
        };
        let Some(day) = self.days.get_mut(&(user_id.to_string(), date)) else {
            log::warn!("update ignored: {} is not loaded for {}", date, user_id);
            return None;
        };

        let previous = day.entries[slot.index()].clone();
        let next = previous.advanced(Utc::now());
        day.entries[slot.index()] = next.clone();

        Some(PendingWrite {
            user_id: user_id.to_string(),
            date,
            slot,
            previous,
            next,
            state: WriteState::Applied,
        })
    }

    /// Store an applied write and queue the push, or undo it.
    pub fn commit(&mut self, mut write: PendingWrite) -> PendingWrite {
        write.advance_to(WriteState::Persisting);
        let key = (write.user_id.clone(), write.date);
        let Some(entries) = self.days.get(&key).map(|d| d.entries.clone()) else {
            log::warn!("{} was evicted before its write was stored", write.date);
            write.advance_to(WriteState::RolledBack);
            return write;
        };

        match self.service.save_day(&write.user_id, write.date, entries) {
            Ok(saved) => {
                self.days.insert(key, saved);
            }
            Err(e) => {
                log::error!("could not store {} {}: {}", write.slot, write.date, e);
                self.restore_slot(&write);
                write.advance_to(WriteState::RolledBack);
                return write;
            }
        }

        if let Err(e) = self.scheduler.schedule() {
            log::error!("could not queue sync for {}: {}", write.date, e);
            self.restore_slot(&write);
            if let Some(day) = self.day(&write.user_id, write.date) {
                let entries = day.entries.clone();
                match self.service.save_day(&write.user_id, write.date, entries) {
                    Ok(saved) => self.insert_day(saved),
                    Err(e) => log::error!("could not store rollback for {}: {}", write.date, e),
                }
            }
            write.advance_to(WriteState::RolledBack);
            return write;
        }

        write.advance_to(WriteState::Confirmed);
        write
    }

    /// Tap a prayer: advance its status, store the day, queue a sync.
    /// The day is resolved first if it is not cached yet.
    pub async fn update_status(&mut self, user_id: &str, date: NaiveDate, slot_index: usize) -> Option<PendingWrite> {
        if self.day(user_id, date).is_none() && !user_id.trim().is_empty() {
            self.load_day(user_id, date).await;
        }
        let write = self.begin_update(user_id, date, slot_index)?;
        Some(self.commit(write))
    }

    fn restore_slot(&mut self, write: &PendingWrite) {
        if let Some(day) = self.days.get_mut(&(write.user_id.clone(), write.date)) {
            day.entries[write.slot.index()] = write.previous.clone();
        }
    }
}
