//! Process-wide settings service.
//!
//! Every component holds a clone of the same [`SettingsStore`] and calls
//! [`SettingsStore::read`] when it needs values; nobody keeps a copy that it
//! assumes is still fresh. Writes replace the whole record and are followed
//! by a change signal to every listener.
//!
//! Writes made by another process over the same durable record are picked up
//! by [`SettingsStore::refresh`], which the running shell calls on a fixed
//! interval.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::backend::{MemoryBackend, SettingsBackend, TomlFileBackend};
use super::model::Settings;
use crate::error::Result;

/// Identifies a listener registered with [`SettingsStore::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Settings) + Send + Sync>;

#[derive(Default)]
struct Outbox {
    queue: VecDeque<Settings>,
    delivering: bool,
}

struct Inner {
    backend: Box<dyn SettingsBackend>,
    /// Last record this store wrote or observed. This is the write gate:
    /// held across persist, never while listeners run.
    last_seen: Mutex<Settings>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    /// Committed records waiting to reach listeners, in commit order.
    outbox: Mutex<Outbox>,
    next_listener: AtomicU64,
    tx: watch::Sender<Settings>,
}

/// Shared handle to the settings record. Cloning is cheap.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("current", &*self.inner.tx.borrow())
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    pub fn new(backend: impl SettingsBackend + 'static) -> Self {
        let initial = load_or_default(&backend);
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                backend: Box::new(backend),
                last_seen: Mutex::new(initial),
                listeners: Mutex::new(Vec::new()),
                outbox: Mutex::new(Outbox::default()),
                next_listener: AtomicU64::new(1),
                tx,
            }),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Store backed by the TOML file in the data directory.
    ///
    /// Falls back to an in-memory record when the data directory is
    /// unavailable, so startup never fails on storage.
    pub fn open_default() -> Self {
        match TomlFileBackend::default_location() {
            Ok(backend) => Self::new(backend),
            Err(e) => {
                warn!("settings storage unavailable, using in-memory defaults: {e}");
                Self::in_memory()
            }
        }
    }

    /// Read the full record from storage.
    ///
    /// Never fails: a missing record yields the defaults, and so does an
    /// unreadable or corrupt one.
    pub fn read(&self) -> Settings {
        load_or_default(self.inner.backend.as_ref())
    }

    /// Replace the record and notify listeners.
    ///
    /// Listeners run after the record is persisted and the write gate is
    /// released, so they may call back into the store. Records reach
    /// listeners in commit order; a write made while another thread is
    /// delivering is handed to that thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the record fails validation or cannot be
    /// persisted. Listeners are not notified in either case.
    pub fn write(&self, settings: Settings) -> Result<()> {
        self.commit(self.last_seen(), settings)?;
        self.deliver();
        Ok(())
    }

    /// Read-modify-write under the write gate.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn update<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let last_seen = self.last_seen();
        let mut settings = self.read();
        f(&mut settings);
        self.commit(last_seen, settings)?;
        self.deliver();
        Ok(settings)
    }

    /// Set one field by its camelCase key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys, unparsable or invalid values, and
    /// storage failures.
    pub fn set_key(&self, key: &str, value: &str) -> Result<Settings> {
        let last_seen = self.last_seen();
        let mut settings = self.read();
        settings.set(key, value)?;
        self.commit(last_seen, settings)?;
        self.deliver();
        Ok(settings)
    }

    /// Restore and persist the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    pub fn reset(&self) -> Result<Settings> {
        let defaults = Settings::default();
        self.write(defaults)?;
        Ok(defaults)
    }

    /// Pick up a record written elsewhere (another process, another store
    /// over the same file). Returns `true` and notifies listeners when it
    /// differs from the last record this store saw.
    pub fn refresh(&self) -> bool {
        {
            let mut last_seen = self.last_seen();
            let current = self.read();
            if current == *last_seen {
                return false;
            }
            debug!("settings changed outside this process");
            *last_seen = current;
            self.outbox().queue.push_back(current);
        }
        self.deliver();
        true
    }

    /// Register a listener invoked after every successful write or refresh.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Settings) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Async view of the same change signal.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.inner.tx.subscribe()
    }

    fn last_seen(&self) -> MutexGuard<'_, Settings> {
        self.inner
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.inner
            .outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist under the gate and queue the record for listeners. The gate
    /// is released on return.
    fn commit(&self, mut last_seen: MutexGuard<'_, Settings>, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.inner.backend.persist(&settings)?;
        *last_seen = settings;
        self.outbox().queue.push_back(settings);
        Ok(())
    }

    /// Drain the outbox to listeners with no store lock held. Only one
    /// caller delivers at a time; nested or concurrent callers leave their
    /// records to it.
    fn deliver(&self) {
        {
            let mut outbox = self.outbox();
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }
        let _delivering = DeliveringGuard(self);
        loop {
            let settings = {
                let mut outbox = self.outbox();
                match outbox.queue.pop_front() {
                    Some(settings) => settings,
                    None => {
                        outbox.delivering = false;
                        return;
                    }
                }
            };
            let listeners: Vec<Listener> = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();
            for listener in listeners {
                listener(&settings);
            }
            self.inner.tx.send_replace(settings);
        }
    }
}

/// Clears the delivering flag if a listener panics mid-delivery.
struct DeliveringGuard<'a>(&'a SettingsStore);

impl Drop for DeliveringGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.outbox().delivering = false;
        }
    }
}

fn load_or_default(backend: &dyn SettingsBackend) -> Settings {
    match backend.load() {
        Ok(Some(settings)) => settings.sanitized(),
        Ok(None) => Settings::default(),
        Err(e) => {
            warn!("failed to load settings, using defaults: {e}");
            Settings::default()
        }
    }
}
