//! Time-bounded certificate cache keyed by certificate URL.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A PEM certificate together with the instant it stops being fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCertificate {
    /// PEM-encoded certificate.
    pub pem: String,
    /// Absolute expiry; the entry is never served at or after this instant.
    pub expires_at: Instant,
}

impl CachedCertificate {
    /// Return `true` if the entry is stale at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Stores fetched certificates for as long as their origin declared them fresh.
pub trait CertificateStore: Send + Sync {
    /// Return the fresh entry for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<CachedCertificate>;

    /// Store `pem` under `key` for `ttl`. A zero `ttl` stores nothing.
    fn put(&self, key: &str, pem: String, ttl: Duration);

    /// Drop the entry for `key`, if any.
    fn remove(&self, key: &str);

    /// Drop every expired entry and return how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Process-local [`CertificateStore`] backed by a locked hash map.
///
/// Expired entries are evicted lazily on lookup; [`spawn_eviction_task`] can
/// additionally sweep them in the background.
#[derive(Debug, Default)]
pub struct InMemoryCertificateStore {
    entries: RwLock<HashMap<String, CachedCertificate>>,
}

impl InMemoryCertificateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Return `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CertificateStore for InMemoryCertificateStore {
    fn get(&self, key: &str) -> Option<CachedCertificate> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent fetch may have replaced it.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(key);
            debug!("evicted expired certificate for {key}");
        }
        None
    }

    fn put(&self, key: &str, pem: String, ttl: Duration) {
        if ttl.is_zero() {
            debug!("not caching certificate for {key}: no freshness lifetime");
            return;
        }
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            debug!("not caching certificate for {key}: lifetime {ttl:?} out of range");
            return;
        };
        self.entries
            .write()
            .insert(key.to_owned(), CachedCertificate { pem, expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        before - entries.len()
    }
}

static SHARED_STORE: Lazy<Arc<InMemoryCertificateStore>> =
    Lazy::new(|| Arc::new(InMemoryCertificateStore::new()));

/// Return the process-wide certificate store.
#[must_use]
pub fn shared_store() -> Arc<InMemoryCertificateStore> {
    Arc::clone(&SHARED_STORE)
}

/// Periodically purge expired entries from `store`.
///
/// The task holds only a weak reference and exits once the store is dropped.
/// Like any tokio task it is cancelled when the runtime shuts down, so it
/// never keeps the process alive.
///
/// # Panics
///
/// Panics if `period` is zero or if called outside a tokio runtime.
pub fn spawn_eviction_task<S>(store: &Arc<S>, period: Duration) -> JoinHandle<()>
where
    S: CertificateStore + 'static,
{
    let weak: Weak<S> = Arc::downgrade(store);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(store) = weak.upgrade() else {
                break;
            };
            let evicted = store.purge_expired();
            if evicted > 0 {
                debug!("evicted {evicted} expired certificate(s)");
            }
        }
    })
}
