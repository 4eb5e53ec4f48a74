use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::connectivity::Connectivity;
use super::reconcile::{Resolution, reconcile};
use super::scheduler::{JobFuture, SyncScheduler};
use crate::db::LocalStore;
use crate::db::repository::format_timestamp;
use crate::error::StoreError;
use crate::models::{DayEntries, DayRecord, PrayerStats, RecentDay, default_entries};
use crate::remote::{RemoteStore, fan_in};
use crate::stats::compute_stats;

pub const META_LAST_SAVE: &str = "last_prayer_save";
pub const META_LAST_SYNC: &str = "last_sync";

/// When a partially pushed day counts as synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Every prayer of the day must have been written.
    #[default]
    RequireAll,
    /// At least one prayer written is enough.
    BestEffort,
}

impl SyncPolicy {
    pub fn allows_mark(&self, succeeded: usize, failed: usize) -> bool {
        match self {
            SyncPolicy::RequireAll => failed == 0,
            SyncPolicy::BestEffort => succeeded > 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub offline: bool,
    pub days_attempted: usize,
    pub days_synced: usize,
    pub slots_pushed: usize,
    pub slots_failed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        !self.offline && self.slots_failed == 0 && self.days_synced == self.days_attempted
    }
}

/// Reconciles the local log with the remote table.
pub struct SyncService {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Connectivity,
    policy: SyncPolicy,
}

impl SyncService {
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Connectivity,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            local,
            remote,
            connectivity,
            policy,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// A debounced scheduler whose job is `sync_all` on this service.
    pub fn debounced(self: &Arc<Self>, window: Duration) -> SyncScheduler {
        let service = Arc::clone(self);
        SyncScheduler::new(
            window,
            Arc::new(move || -> JobFuture {
                let service = Arc::clone(&service);
                Box::pin(async move {
                    service.sync_all().await;
                })
            }),
        )
    }

    // ─── Pull ────────────────────────────────────────────────────────────────

    /// The canonical record for a user's date. Never fails: storage and
    /// network problems degrade to whatever the device already knows.
    pub async fn resolve_day(&self, user_id: &str, date: NaiveDate) -> DayRecord {
        let now = Utc::now();
        if user_id.trim().is_empty() {
            log::warn!("resolve_day called without a user id, returning an empty day");
            return DayRecord::new(user_id, date, now);
        }

        let local = self.read_local(user_id, date);
        let remote = self.fetch_remote(user_id, date).await;

        match reconcile(local, remote) {
            Resolution::KeepLocal(record) => record,
            Resolution::LocalPending(record) => {
                log::debug!("{} has unsynced edits for {}, pushing before reading", user_id, date);
                self.sync_all().await;
                self.read_local(user_id, date).unwrap_or(record)
            }
            Resolution::AdoptRemote { local, entries } => {
                let record = match local {
                    Some(existing) if existing.entries == entries => return existing,
                    Some(mut existing) => {
                        existing.entries = entries;
                        existing.updated_at = now;
                        existing.synced = true;
                        existing
                    }
                    None => {
                        let mut fresh = DayRecord::new(user_id, date, now);
                        fresh.entries = entries;
                        fresh.synced = true;
                        fresh
                    }
                };
                self.store_quietly(&record);
                record
            }
            Resolution::Materialize => {
                // Nothing to push for an empty day, so it starts out synced.
                let mut record = DayRecord::new(user_id, date, now);
                record.synced = true;
                self.store_quietly(&record);
                record
            }
        }
    }

    fn read_local(&self, user_id: &str, date: NaiveDate) -> Option<DayRecord> {
        self.local.get_by_date(date, user_id).unwrap_or_else(|e| {
            log::warn!("local read failed for {} {}: {}", user_id, date, e);
            None
        })
    }

    async fn fetch_remote(&self, user_id: &str, date: NaiveDate) -> Option<DayEntries> {
        if !self.connectivity.is_online() {
            return None;
        }
        match self.remote.fetch_entries(user_id, date).await {
            Ok(entries) if entries.is_empty() => None,
            Ok(entries) => Some(fan_in(&entries)),
            Err(e) => {
                log::warn!("remote fetch failed for {} {}, using local copy: {}", user_id, date, e);
                None
            }
        }
    }

    fn store_quietly(&self, record: &DayRecord) {
        if let Err(e) = self.local.put(record) {
            log::warn!("could not store {} for {}: {}", record.date, record.user_id, e);
        }
    }

    // ─── Local writes ────────────────────────────────────────────────────────

    /// Persist new entries for a day as a pending local edit. The existing
    /// record is updated in place; a new one is created only if none exists.
    pub fn save_day(&self, user_id: &str, date: NaiveDate, entries: DayEntries) -> Result<DayRecord, StoreError> {
        let now = Utc::now();
        let record = match self.local.get_by_date(date, user_id)? {
            Some(mut existing) => {
                existing.apply_local_edit(entries, now);
                existing
            }
            None => {
                let mut fresh = DayRecord::new(user_id, date, now);
                fresh.entries = entries;
                fresh
            }
        };
        self.local.put(&record)?;

        if let Err(e) = self.local.set_meta(META_LAST_SAVE, &format_timestamp(&now)) {
            log::debug!("could not record last save time: {}", e);
        }
        Ok(record)
    }

    // ─── Push ────────────────────────────────────────────────────────────────

    /// Push every unsynced day, one remote row per prayer. Failures are
    /// logged and leave the day pending for the next pass.
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.connectivity.is_online() {
            log::debug!("offline, skipping sync");
            report.offline = true;
            return report;
        }

        let unsynced = match self.local.get_unsynced() {
            Ok(records) => records,
            Err(e) => {
                log::error!("could not read unsynced days: {}", e);
                return report;
            }
        };
        if unsynced.is_empty() {
            log::debug!("no unsynced days");
        }

        for record in unsynced {
            if !self.connectivity.is_online() {
                log::info!("went offline mid-sync, {} days left pending", report.days_attempted);
                report.offline = true;
                break;
            }
            if record.user_id.trim().is_empty() {
                log::error!("skipping day {} ({}) with no user id", record.date, record.id);
                continue;
            }

            report.days_attempted += 1;
            let (pushed, failed) = self.push_day(&record).await;
            report.slots_pushed += pushed;
            report.slots_failed += failed;

            if !self.policy.allows_mark(pushed, failed) {
                log::warn!(
                    "{} for {}: {} of {} prayers failed, leaving it pending",
                    record.date,
                    record.user_id,
                    failed,
                    pushed + failed
                );
                continue;
            }
            match self.local.mark_synced_if_unchanged(&record.id, &record.updated_at) {
                Ok(true) => report.days_synced += 1,
                Ok(false) => log::debug!("{} was edited during sync, keeping it pending", record.date),
                Err(e) => log::error!("could not mark {} synced: {}", record.date, e),
            }
        }

        if let Err(e) = self.local.set_meta(META_LAST_SYNC, &format_timestamp(&Utc::now())) {
            log::debug!("could not record last sync time: {}", e);
        }
        log::info!(
            "sync finished: {}/{} days synced, {} prayers failed",
            report.days_synced,
            report.days_attempted,
            report.slots_failed
        );
        report
    }

    async fn push_day(&self, record: &DayRecord) -> (usize, usize) {
        let (mut pushed, mut failed) = (0, 0);
        for entry in &record.entries {
            match self
                .remote
                .upsert_entry(&record.user_id, record.date, entry, record.created_at)
                .await
            {
                Ok(()) => pushed += 1,
                Err(e) => {
                    log::warn!("failed to push {} for {}: {}", entry.slot, record.date, e);
                    failed += 1;
                }
            }
        }
        (pushed, failed)
    }

    // ─── Timeline ────────────────────────────────────────────────────────────

    /// The last `days` days ending at `today`, most recent first, as the
    /// device currently knows them. Days with no record read as all `no_entry`.
    /// Stops early at the start of the calendar range.
    pub fn recent_days(&self, user_id: &str, today: NaiveDate, days: usize) -> Vec<RecentDay> {
        if user_id.trim().is_empty() {
            log::warn!("recent_days called without a user id");
            return Vec::new();
        }
        (0..days as u64)
            .map_while(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| {
                let entries = self
                    .read_local(user_id, date)
                    .map(|r| r.entries)
                    .unwrap_or_else(default_entries);
                RecentDay { date, entries }
            })
            .collect()
    }

    pub fn prayer_stats(&self, user_id: &str, today: NaiveDate, history_days: usize) -> PrayerStats {
        compute_stats(&self.recent_days(user_id, today, history_days))
    }
}
