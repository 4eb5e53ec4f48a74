use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RemoteRow, RemoteStore};
use crate::db::repository::format_date;
use crate::error::RemoteError;
use crate::models::PrayerSlot;

/// In-process remote table. Slots and fetches can be made to fail so the
/// engine's degraded paths can be driven deterministically.
#[derive(Default)]
pub struct MemoryRemote {
    rows: Mutex<Vec<RemoteRow>>,
    failing_slots: Mutex<HashSet<String>>,
    fail_fetch: AtomicBool,
    fetches: AtomicUsize,
    upserts: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert for `slot` fail until `heal` is called.
    pub fn fail_slot(&self, slot: PrayerSlot) {
        lock(&self.failing_slots).insert(slot.as_str().to_string());
    }

    pub fn set_fetch_failure(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        lock(&self.failing_slots).clear();
        self.set_fetch_failure(false);
    }

    /// Write a row directly, as another device would.
    pub fn insert_row(&self, row: RemoteRow) {
        lock(&self.rows).push(row);
    }

    pub fn rows(&self) -> Vec<RemoteRow> {
        lock(&self.rows).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_rows(&self, user_id: &str, date: NaiveDate) -> Result<Vec<RemoteRow>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected fetch failure".into()));
        }
        let date = format_date(date);
        Ok(lock(&self.rows)
            .iter()
            .filter(|r| r.user_id == user_id && r.prayer_date == date)
            .cloned()
            .collect())
    }

    async fn upsert_row(&self, row: RemoteRow) -> Result<(), RemoteError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_slots).contains(&row.prayer_time) {
            return Err(RemoteError::Query(format!(
                "injected failure for {}",
                row.prayer_time
            )));
        }

        let mut rows = lock(&self.rows);
        match rows.iter_mut().find(|r| r.same_key(&row)) {
            Some(existing) => {
                existing.prayer_status = row.prayer_status;
                existing.updated_at = row.updated_at;
            }
            None => rows.push(row),
        }
        Ok(())
    }
}
