pub mod connectivity;
pub mod reconcile;
pub mod scheduler;
pub mod service;
pub mod tracker;

pub use connectivity::{Connectivity, watch_connectivity};
pub use reconcile::{Resolution, reconcile};
pub use scheduler::{DEFAULT_WINDOW, SyncScheduler};
pub use service::{META_LAST_SAVE, META_LAST_SYNC, SyncPolicy, SyncReport, SyncService};
pub use tracker::{DayTracker, PendingWrite, WriteState};
