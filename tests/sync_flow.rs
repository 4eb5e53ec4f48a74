use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use hijra::db::LocalStore;
use hijra::models::{PrayerEntry, PrayerSlot, PrayerStatus, default_entries};
use hijra::remote::{MemoryRemote, RemoteStore, SqliteRemote};
use hijra::stats::compute_stats;
use hijra::sync::{
    Connectivity, DayTracker, SyncPolicy, SyncService, WriteState, watch_connectivity,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// A device with its own local database, sharing `remote` with other devices.
fn device(dir: &TempDir, name: &str, remote: Arc<dyn RemoteStore>, online: bool) -> Arc<SyncService> {
    let local = LocalStore::open(&dir.path().join(format!("{name}.db"))).unwrap();
    Arc::new(SyncService::new(
        Arc::new(local),
        remote,
        Connectivity::new(online),
        SyncPolicy::RequireAll,
    ))
}

fn shared_remote(dir: &TempDir) -> Arc<SqliteRemote> {
    Arc::new(SqliteRemote::open(&dir.path().join("remote.db")).unwrap())
}

#[tokio::test]
async fn day_pushed_from_one_device_is_pulled_on_another() {
    let dir = TempDir::new().unwrap();
    let remote = shared_remote(&dir);
    let phone = device(&dir, "phone", remote.clone(), true);
    let laptop = device(&dir, "laptop", remote.clone(), true);

    let mut entries = default_entries();
    entries[0] = PrayerEntry::new(PrayerSlot::Fajr, PrayerStatus::OnTime, Some(Utc::now()));
    entries[3] = PrayerEntry::new(PrayerSlot::Maghrib, PrayerStatus::Late, Some(Utc::now()));
    entries[4] = PrayerEntry::new(PrayerSlot::Isha, PrayerStatus::Missed, Some(Utc::now()));
    phone.save_day("u1", date(), entries.clone()).unwrap();

    let report = phone.sync_all().await;
    assert!(report.is_clean());

    let pulled = laptop.resolve_day("u1", date()).await;
    assert_eq!(pulled.entries, entries);
    assert!(pulled.synced);
}

#[tokio::test]
async fn resolve_day_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let remote = shared_remote(&dir);
    let phone = device(&dir, "phone", remote.clone(), true);

    let mut entries = default_entries();
    entries[1] = PrayerEntry::new(PrayerSlot::Dhuhr, PrayerStatus::OnTime, Some(Utc::now()));
    phone.save_day("u1", date(), entries).unwrap();
    phone.sync_all().await;

    let first = phone.resolve_day("u1", date()).await;
    let second = phone.resolve_day("u1", date()).await;
    assert_eq!(first, second);

    // A day nobody has touched resolves the same way twice too.
    let empty_day = date().succ_opt().unwrap();
    let first = phone.resolve_day("u1", empty_day).await;
    let second = phone.resolve_day("u1", empty_day).await;
    assert_eq!(first, second);
    assert_eq!(first.entries, default_entries());
}

#[tokio::test]
async fn unsynced_local_edit_wins_over_remote() {
    let dir = TempDir::new().unwrap();
    let remote = shared_remote(&dir);
    let phone = device(&dir, "phone", remote.clone(), true);
    let laptop = device(&dir, "laptop", remote.clone(), false);

    let mut remote_entries = default_entries();
    remote_entries[0] = PrayerEntry::new(PrayerSlot::Fajr, PrayerStatus::Missed, Some(Utc::now()));
    phone.save_day("u1", date(), remote_entries).unwrap();
    phone.sync_all().await;

    // Edited offline on the laptop, then it comes back online.
    let mut local_entries = default_entries();
    local_entries[0] = PrayerEntry::new(PrayerSlot::Fajr, PrayerStatus::OnTime, Some(Utc::now()));
    laptop.save_day("u1", date(), local_entries.clone()).unwrap();
    laptop.connectivity().set_online(true);

    let resolved = laptop.resolve_day("u1", date()).await;
    assert_eq!(resolved.entries, local_entries);

    // The phone sees the laptop's edit afterwards.
    let seen = phone.resolve_day("u1", date()).await;
    assert_eq!(seen.entry(PrayerSlot::Fajr).status, PrayerStatus::OnTime);
}

#[tokio::test]
async fn failed_slot_is_retried_on_next_pass() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(MemoryRemote::new());
    let phone = device(&dir, "phone", remote.clone(), true);

    let mut entries = default_entries();
    entries[2] = PrayerEntry::new(PrayerSlot::Asr, PrayerStatus::Late, Some(Utc::now()));
    phone.save_day("u1", date(), entries).unwrap();

    remote.fail_slot(PrayerSlot::Asr);
    let report = phone.sync_all().await;
    assert_eq!(report.slots_failed, 1);
    assert_eq!(phone.local().get_unsynced().unwrap().len(), 1);

    remote.heal();
    let report = phone.sync_all().await;
    assert!(report.is_clean());
    assert!(phone.local().get_unsynced().unwrap().is_empty());
    let asr = remote.rows().into_iter().find(|r| r.prayer_time == "asr").unwrap();
    assert_eq!(asr.prayer_status, "late");
}

#[tokio::test(start_paused = true)]
async fn taps_reach_the_remote_after_one_debounced_sync() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(MemoryRemote::new());
    let phone = device(&dir, "phone", remote.clone(), true);
    let scheduler = Arc::new(phone.debounced(Duration::from_millis(2000)));
    let mut tracker = DayTracker::new(Arc::clone(&phone), Arc::clone(&scheduler));

    for _ in 0..3 {
        let write = tracker.update_status("u1", date(), 0).await.unwrap();
        assert_eq!(write.state(), WriteState::Confirmed);
    }
    tracker.update_status("u1", date(), 4).await.unwrap();
    assert_eq!(remote.upsert_count(), 0);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    tokio::task::yield_now().await;

    assert_eq!(remote.upsert_count(), 5);
    let fajr = remote.rows().into_iter().find(|r| r.prayer_time == "fajr").unwrap();
    assert_eq!(fajr.prayer_status, "missed");
    let isha = remote.rows().into_iter().find(|r| r.prayer_time == "isha").unwrap();
    assert_eq!(isha.prayer_status, "on_time");
    assert!(phone.local().get_unsynced().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_edits_sync_when_connectivity_returns() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(MemoryRemote::new());
    let phone = device(&dir, "phone", remote.clone(), false);
    let scheduler = Arc::new(phone.debounced(Duration::from_millis(2000)));
    let _watcher = watch_connectivity(phone.connectivity(), &scheduler);
    let mut tracker = DayTracker::new(Arc::clone(&phone), Arc::clone(&scheduler));

    tracker.update_status("u1", date(), 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(remote.upsert_count(), 0);
    assert_eq!(phone.local().get_unsynced().unwrap().len(), 1);

    phone.connectivity().set_online(true);
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    tokio::task::yield_now().await;

    assert_eq!(remote.upsert_count(), 5);
    assert!(phone.local().get_unsynced().unwrap().is_empty());
}

#[tokio::test]
async fn stats_follow_the_reconciled_timeline() {
    let dir = TempDir::new().unwrap();
    let remote = shared_remote(&dir);
    let phone = device(&dir, "phone", remote.clone(), true);
    let laptop = device(&dir, "laptop", remote.clone(), true);

    // Days 1..=5 before today each have Fajr on time; today is empty.
    for offset in 1..=5 {
        let day = date() - chrono::Duration::days(offset);
        let mut entries = default_entries();
        entries[0] = PrayerEntry::new(PrayerSlot::Fajr, PrayerStatus::OnTime, Some(Utc::now()));
        phone.save_day("u1", day, entries).unwrap();
    }
    phone.sync_all().await;

    for offset in 0..=5 {
        laptop.resolve_day("u1", date() - chrono::Duration::days(offset)).await;
    }
    let stats = compute_stats(&laptop.recent_days("u1", date(), 30));
    assert_eq!(stats.current_streak, 0);
    assert_eq!(stats.longest_streak, 5);
    assert_eq!(stats.prayer_stats[&PrayerSlot::Fajr].completed, 5);
    assert_eq!(laptop.prayer_stats("u1", date(), 30), stats);
}
