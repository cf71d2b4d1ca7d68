//! Rebuildable read snapshots keyed by id.
//!
//! A snapshot is built off to the side and then swapped into the map, so a
//! reader holding an `Arc` always sees one complete generation. Nothing
//! here is authoritative; every value can be rebuilt from storage.

use crate::error::AppError;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Snapshot<V> {
    pub generation: u64,
    pub built_at: Instant,
    pub value: V,
}

impl<V> Snapshot<V> {
    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }
}

pub struct SnapshotCache<K, V> {
    entries: RwLock<HashMap<K, Arc<Snapshot<V>>>>,
    generation: AtomicU64,
    ttl: Duration,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<Arc<Snapshot<V>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// The cached snapshot if it is younger than the TTL.
    pub fn fresh(&self, key: &K) -> Option<Arc<Snapshot<V>>> {
        self.get(key).filter(|snap| snap.age() < self.ttl)
    }

    pub fn install(&self, key: K, value: V) -> Arc<Snapshot<V>> {
        let snapshot = Arc::new(Snapshot {
            generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
            built_at: Instant::now(),
            value,
        });
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, snapshot.clone());
        snapshot
    }

    /// Serves a fresh snapshot, rebuilding it with `build` when stale or
    /// missing. Concurrent rebuilds of one key are harmless: the last
    /// install wins and each caller gets a complete value.
    pub fn get_or_build<F>(&self, key: &K, build: F) -> Result<Arc<Snapshot<V>>, AppError>
    where
        F: FnOnce() -> Result<V, AppError>,
    {
        if let Some(snapshot) = self.fresh(key) {
            return Ok(snapshot);
        }
        let value = build()?;
        Ok(self.install(key.clone(), value))
    }

    pub fn keys(&self) -> Vec<K> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }

    /// Drops snapshots older than `max_age`; returns how many were removed.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, snap| snap.age() < max_age);
        before - entries.len()
    }
}
