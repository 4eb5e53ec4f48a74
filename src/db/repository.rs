use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::migrations::run_migrations;
use crate::error::StoreError;
use crate::models::{DayRecord, PrayerEntry, SLOT_COUNT, collect_entries};

// ─── Column codecs ───────────────────────────────────────────────────────────

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

type RawRow = (String, String, String, String, String, String, i32);

const SELECT_COLUMNS: &str = "SELECT id, user_id, date, entries, created_at, updated_at, synced
                              FROM day_records";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<DayRecord, StoreError> {
    let (id, user_id, date, entries, created_at, updated_at, synced) = raw;
    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| corrupt(format!("bad date '{}': {}", date, e)))?;
    let created_at =
        parse_timestamp(&created_at).ok_or_else(|| corrupt(format!("bad created_at '{}'", created_at)))?;
    let updated_at =
        parse_timestamp(&updated_at).ok_or_else(|| corrupt(format!("bad updated_at '{}'", updated_at)))?;

    let list: Vec<PrayerEntry> = serde_json::from_str(&entries)?;
    if list.len() != SLOT_COUNT {
        return Err(corrupt(format!("expected {} entries, found {}", SLOT_COUNT, list.len())));
    }
    let entries = collect_entries(&list);

    Ok(DayRecord {
        id,
        user_id,
        date,
        entries,
        created_at,
        updated_at,
        synced: synced != 0,
    })
}

// ─── Local store ─────────────────────────────────────────────────────────────

/// Per-device store of day records. Every record carries a `synced` flag
/// that is false while it holds edits the remote has not seen.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a record by id.
    pub fn put(&self, record: &DayRecord) -> Result<(), StoreError> {
        let entries = serde_json::to_string(&record.entries)?;
        self.conn().execute(
            "INSERT INTO day_records (id, user_id, date, entries, created_at, updated_at, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                user_id = ?2, date = ?3, entries = ?4,
                created_at = ?5, updated_at = ?6, synced = ?7",
            params![
                record.id,
                record.user_id,
                format_date(record.date),
                entries,
                format_timestamp(&record.created_at),
                format_timestamp(&record.updated_at),
                record.synced as i32,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<DayRecord>, StoreError> {
        let raw = self
            .conn()
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], read_row)
            .optional()?;
        raw.map(decode_row).transpose()
    }

    /// The record for one user's date, if any. Dates repeat across users so
    /// both keys are matched; the newest wins should duplicates ever exist.
    pub fn get_by_date(&self, date: NaiveDate, user_id: &str) -> Result<Option<DayRecord>, StoreError> {
        let raw = self
            .conn()
            .query_row(
                &format!(
                    "{SELECT_COLUMNS} WHERE date = ?1 AND user_id = ?2
                     ORDER BY updated_at DESC LIMIT 1"
                ),
                params![format_date(date), user_id],
                read_row,
            )
            .optional()?;
        raw.map(decode_row).transpose()
    }

    pub fn get_by_user(&self, user_id: &str) -> Result<Vec<DayRecord>, StoreError> {
        self.query_all(
            &format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY date"),
            params![user_id],
        )
    }

    /// Every record still waiting to be pushed, across all users and dates.
    pub fn get_unsynced(&self) -> Result<Vec<DayRecord>, StoreError> {
        self.query_all(
            &format!("{SELECT_COLUMNS} WHERE synced = 0 ORDER BY date, user_id"),
            [],
        )
    }

    fn query_all<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<DayRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_row).collect()
    }

    /// Flag a record as pushed. Returns false when no such record exists.
    pub fn mark_synced(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM day_records WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            tx.execute("UPDATE day_records SET synced = 1 WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(exists)
    }

    /// Flag a record as pushed only if it has not been edited since
    /// `updated_at`. An edit made while a sync pass was in flight keeps the
    /// record pending.
    pub fn mark_synced_if_unchanged(&self, id: &str, updated_at: &DateTime<Utc>) -> Result<bool, StoreError> {
        let changed = self.conn().execute(
            "UPDATE day_records SET synced = 1 WHERE id = ?1 AND updated_at = ?2",
            params![id, format_timestamp(updated_at)],
        )?;
        Ok(changed > 0)
    }

    pub fn count_unsynced(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM day_records WHERE synced = 0", [], |row| row.get(0))?)
    }

    // ─── App meta ────────────────────────────────────────────────────────────

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn()
            .query_row("SELECT value FROM app_meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// Reject every write, to exercise callers' failure paths.
    #[cfg(test)]
    pub(crate) fn set_read_only(&self, read_only: bool) {
        let pragma = if read_only {
            "PRAGMA query_only = ON;"
        } else {
            "PRAGMA query_only = OFF;"
        };
        self.conn().execute_batch(pragma).expect("toggle query_only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrayerSlot, PrayerStatus};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(user: &str, day: &str) -> DayRecord {
        DayRecord::new(user, date(day), Utc::now())
    }

    #[test]
    fn put_is_an_idempotent_upsert() {
        let store = LocalStore::open_in_memory().unwrap();
        let mut rec = record("u1", "2024-03-15");
        store.put(&rec).unwrap();
        store.put(&rec).unwrap();

        rec.entries[0].status = PrayerStatus::Late;
        rec.entries[0].timestamp = Some(Utc::now());
        store.put(&rec).unwrap();

        let all = store.get_by_user("u1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], rec);
    }

    #[test]
    fn get_by_date_filters_by_user() {
        let store = LocalStore::open_in_memory().unwrap();
        store.put(&record("u1", "2024-03-15")).unwrap();
        store.put(&record("u2", "2024-03-15")).unwrap();

        let found = store.get_by_date(date("2024-03-15"), "u2").unwrap().unwrap();
        assert_eq!(found.user_id, "u2");
        assert!(store.get_by_date(date("2024-03-15"), "u3").unwrap().is_none());
        assert!(store.get_by_date(date("2024-03-16"), "u1").unwrap().is_none());
    }

    #[test]
    fn unsynced_spans_users_and_mark_synced_clears() {
        let store = LocalStore::open_in_memory().unwrap();
        let a = record("u1", "2024-03-15");
        let b = record("u2", "2024-03-16");
        let mut c = record("u1", "2024-03-17");
        c.synced = true;
        for r in [&a, &b, &c] {
            store.put(r).unwrap();
        }

        let pending: Vec<String> = store.get_unsynced().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(pending, vec![a.id.clone(), b.id.clone()]);

        assert!(store.mark_synced(&a.id).unwrap());
        assert_eq!(store.count_unsynced().unwrap(), 1);
        assert!(store.get(&a.id).unwrap().unwrap().synced);
    }

    #[test]
    fn mark_synced_on_missing_record_is_a_noop() {
        let store = LocalStore::open_in_memory().unwrap();
        assert!(!store.mark_synced("nope").unwrap());
        assert_eq!(store.count_unsynced().unwrap(), 0);
    }

    #[test]
    fn mark_synced_if_unchanged_respects_newer_edits() {
        let store = LocalStore::open_in_memory().unwrap();
        let mut rec = record("u1", "2024-03-15");
        store.put(&rec).unwrap();
        let seen = rec.updated_at;

        let mut entries = rec.entries.clone();
        entries[PrayerSlot::Isha.index()].status = PrayerStatus::OnTime;
        rec.apply_local_edit(entries, seen + chrono::Duration::seconds(1));
        store.put(&rec).unwrap();

        assert!(!store.mark_synced_if_unchanged(&rec.id, &seen).unwrap());
        assert!(!store.get(&rec.id).unwrap().unwrap().synced);
        assert!(store.mark_synced_if_unchanged(&rec.id, &rec.updated_at).unwrap());
    }

    #[test]
    fn corrupt_entries_surface_as_errors() {
        let store = LocalStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO day_records VALUES ('x', 'u1', '2024-03-15', '[]', ?1, ?1, 0)",
                params![format_timestamp(&Utc::now())],
            )
            .unwrap();
        let err = store.get("x").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hijra.db");
        let rec = record("u1", "2024-03-15");
        {
            let store = LocalStore::open(&path).unwrap();
            store.put(&rec).unwrap();
            store.set_meta("last_sync", "yesterday").unwrap();
        }
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get(&rec.id).unwrap(), Some(rec));
        assert_eq!(store.get_meta("last_sync").unwrap().as_deref(), Some("yesterday"));
    }
}
