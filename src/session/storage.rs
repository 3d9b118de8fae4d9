//! Client-local key/value session storage.
//!
//! `SessionStorage` is the seam the tracker and UI glue write through.
//! `SharedStorage` models one origin's storage area shared by several tabs:
//! every mutation that actually changes a value is broadcast as a
//! [`StorageEvent`] to the *other* tabs, never back to the writer.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

/// Storage keys used by the session lifecycle
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const ROLE: &str = "role";
    pub const LAST_ACTIVITY: &str = "lastActivity";
    pub const USERNAME: &str = "username";

    pub const ALL: [&str; 4] = [TOKEN, ROLE, LAST_ACTIVITY, USERNAME];
}

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// Single-tab storage with no change notifications
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

pub type TabId = u64;

/// Change notification seen by other tabs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// `None` when the whole area was cleared
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub source: TabId,
}

impl StorageEvent {
    /// Whether this change may have touched `key`
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

struct SharedInner {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_tab: AtomicU64,
}

/// One origin's storage area, shared between tabs
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<SharedInner>,
}

impl SharedStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SharedInner {
                entries: RwLock::new(HashMap::new()),
                events,
                next_tab: AtomicU64::new(1),
            }),
        }
    }

    /// Open a new tab onto this storage area
    pub fn open_tab(&self) -> TabStorage {
        TabStorage {
            id: self.inner.next_tab.fetch_add(1, Ordering::Relaxed),
            inner: self.inner.clone(),
        }
    }
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// A tab's handle onto a [`SharedStorage`]
#[derive(Clone)]
pub struct TabStorage {
    id: TabId,
    inner: Arc<SharedInner>,
}

impl TabStorage {
    pub fn id(&self) -> TabId {
        self.id
    }

    /// Changes made by other tabs from now on
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            tab: self.id,
            rx: self.inner.events.subscribe(),
        }
    }

    fn notify(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<String>) {
        if key.is_some() && old_value == new_value {
            return;
        }
        // No receivers is fine: nobody else is open
        let _ = self.inner.events.send(StorageEvent {
            key: key.map(str::to_string),
            old_value,
            new_value,
            source: self.id,
        });
    }
}

impl SessionStorage for TabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let old = self
            .inner
            .entries
            .write()
            .insert(key.to_string(), value.to_string());
        self.notify(Some(key), old, Some(value.to_string()));
    }

    fn remove(&self, key: &str) {
        let old = self.inner.entries.write().remove(key);
        if old.is_some() {
            self.notify(Some(key), old, None);
        }
    }

    fn clear(&self) {
        let had_entries = {
            let mut entries = self.inner.entries.write();
            let had = !entries.is_empty();
            entries.clear();
            had
        };
        if had_entries {
            self.notify(None, None, None);
        }
    }
}

/// Receiver half of the cross-tab channel; skips the tab's own writes
pub struct StorageEvents {
    tab: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Next change from another tab; `None` once storage is gone
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == self.tab => continue,
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(tab = self.tab, skipped, "Storage listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Pending change from another tab, without waiting
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source == self.tab => continue,
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
