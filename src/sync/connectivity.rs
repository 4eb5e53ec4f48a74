use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::scheduler::SyncScheduler;

/// Online/offline signal. Clones share the same flag.
#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the flag; subscribers are only woken by an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            log::info!("connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Schedule a sync every time the device comes back online.
///
/// The task holds the scheduler weakly. It ends once the scheduler has been
/// dropped or every `Connectivity` handle is gone, whichever comes first.
pub fn watch_connectivity(connectivity: &Connectivity, scheduler: &Arc<SyncScheduler>) -> JoinHandle<()> {
    let mut rx = connectivity.subscribe();
    let scheduler: Weak<SyncScheduler> = Arc::downgrade(scheduler);
    tokio::spawn(async move {
        let mut was_online = *rx.borrow_and_update();
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !was_online {
                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                log::debug!("back online, scheduling sync");
                if let Err(e) = scheduler.schedule() {
                    log::warn!("could not schedule reconnect sync: {}", e);
                }
            }
            was_online = online;
        }
        log::debug!("connectivity watcher stopped");
    })
}
