use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RemoteRow, RemoteStore};
use crate::db::repository::{format_date, format_timestamp, parse_timestamp};
use crate::error::RemoteError;

/// `prayer_tracker` table in a SQLite database shared between devices.
///
/// The table has no unique constraint on (user, date, prayer); writes look
/// the row up first and update it in place.
pub struct SqliteRemote {
    conn: Mutex<Connection>,
}

impl SqliteRemote {
    pub fn open(path: &Path) -> Result<Self, RemoteError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, RemoteError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RemoteError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS prayer_tracker (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id        TEXT NOT NULL,
                prayer_date    TEXT NOT NULL,
                prayer_time    TEXT NOT NULL,
                prayer_status  TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_prayer_tracker_user_date
                ON prayer_tracker(user_id, prayer_date);
        ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for SqliteRemote {
    async fn fetch_rows(&self, user_id: &str, date: NaiveDate) -> Result<Vec<RemoteRow>, RemoteError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, prayer_date, prayer_time, prayer_status, created_at, updated_at
             FROM prayer_tracker WHERE user_id = ?1 AND prayer_date = ?2
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id, format_date(date)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (user_id, prayer_date, prayer_time, prayer_status, created_at, updated_at) in rows {
            let parse = |s: &str| {
                parse_timestamp(s).ok_or_else(|| RemoteError::Query(format!("bad timestamp '{}'", s)))
            };
            result.push(RemoteRow {
                created_at: parse(&created_at)?,
                updated_at: parse(&updated_at)?,
                user_id,
                prayer_date,
                prayer_time,
                prayer_status,
            });
        }
        Ok(result)
    }

    async fn upsert_row(&self, row: RemoteRow) -> Result<(), RemoteError> {
        let conn = self.conn();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM prayer_tracker
                 WHERE user_id = ?1 AND prayer_date = ?2 AND prayer_time = ?3
                 ORDER BY id LIMIT 1",
                params![row.user_id, row.prayer_date, row.prayer_time],
                |r| r.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE prayer_tracker SET prayer_status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![row.prayer_status, format_timestamp(&row.updated_at), id],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO prayer_tracker
                        (user_id, prayer_date, prayer_time, prayer_status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        row.user_id,
                        row.prayer_date,
                        row.prayer_time,
                        row.prayer_status,
                        format_timestamp(&row.created_at),
                        format_timestamp(&row.updated_at),
                    ],
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrayerEntry, PrayerSlot, PrayerStatus};
    use chrono::Utc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn check_then_write_keeps_one_row_per_key() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let created = Utc::now();
        for status in [PrayerStatus::OnTime, PrayerStatus::Late, PrayerStatus::Missed] {
            let entry = PrayerEntry::new(PrayerSlot::Dhuhr, status, Some(Utc::now()));
            remote.upsert_entry("u1", date(), &entry, created).await.unwrap();
        }

        let rows = remote.fetch_rows("u1", date()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prayer_time, "dhuhr");
        assert_eq!(rows[0].prayer_status, "missed");
        assert_eq!(rows[0].created_at, created);
    }

    #[tokio::test]
    async fn entries_keep_their_timestamps() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let stamp = Utc::now();
        let entry = PrayerEntry::new(PrayerSlot::Fajr, PrayerStatus::OnTime, Some(stamp));
        remote.upsert_entry("u1", date(), &entry, Utc::now()).await.unwrap();

        let entries = remote.fetch_entries("u1", date()).await.unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[tokio::test]
    async fn shared_file_is_visible_to_a_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.db");
        let a = SqliteRemote::open(&path).unwrap();
        let b = SqliteRemote::open(&path).unwrap();

        let entry = PrayerEntry::new(PrayerSlot::Isha, PrayerStatus::Late, Some(Utc::now()));
        a.upsert_entry("u1", date(), &entry, Utc::now()).await.unwrap();
        assert_eq!(b.fetch_entries("u1", date()).await.unwrap(), vec![entry]);
    }
}
