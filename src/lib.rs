//! Offline-first prayer log: a local SQLite store, a remote adapter with one
//! row per prayer, day-level reconciliation, debounced background sync and
//! streak statistics over the reconciled timeline.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod stats;
pub mod sync;
pub mod utils;
