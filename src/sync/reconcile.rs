//! Day-level conflict resolution between the device and the remote.
//!
//! The unit of conflict is the whole day even though the remote stores one
//! row per prayer: a record with unsynced local edits wins outright, and
//! otherwise the remote copy replaces the local one. Slots are never merged
//! individually, so a local edit to one prayer also overrides remote changes
//! made to the other four.

use crate::models::{DayEntries, DayRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Local holds edits the remote has not seen; it wins and should be pushed.
    LocalPending(DayRecord),
    /// The remote knows nothing about the day; the local record stands.
    KeepLocal(DayRecord),
    /// The remote is authoritative; the local record (if any) takes its entries.
    AdoptRemote {
        local: Option<DayRecord>,
        entries: DayEntries,
    },
    /// Neither side has the day.
    Materialize,
}

/// Decide which side owns a day. `remote` is `None` when the remote has no
/// rows for the day or could not be reached.
pub fn reconcile(local: Option<DayRecord>, remote: Option<DayEntries>) -> Resolution {
    match (local, remote) {
        (Some(local), Some(_)) if !local.synced => Resolution::LocalPending(local),
        (local, Some(entries)) => Resolution::AdoptRemote { local, entries },
        (Some(local), None) => Resolution::KeepLocal(local),
        (None, None) => Resolution::Materialize,
    }
}
