//! Scope-keyed collection cache shared by all stores.
//!
//! Each scope holds the last collection fetched for it, a dirty flag and a
//! generation counter. Invalidation and local patches bump the generation, so
//! a fetch that started before either can no longer overwrite the entry.
//! Mutations take a per-scope async lock to keep writes to the same scope in
//! order.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Entry<T> {
    items: Option<Vec<T>>,
    dirty: bool,
    generation: u64,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            items: None,
            dirty: true,
            generation: 0,
        }
    }
}

/// Proof that a fetch was started for `key` at a given generation.
#[derive(Debug)]
pub struct FetchTicket<K> {
    key: K,
    generation: u64,
}

pub struct ScopedCache<K, T> {
    entries: Mutex<HashMap<K, Entry<T>>>,
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K, T> Default for ScopedCache<K, T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> ScopedCache<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Items for `key` if they were fetched and not invalidated since.
    pub fn get(&self, key: &K) -> Option<Vec<T>> {
        self.entries()
            .get(key)
            .filter(|e| !e.dirty)
            .and_then(|e| e.items.clone())
    }

    /// Items for `key` regardless of the dirty flag.
    pub fn peek(&self, key: &K) -> Option<Vec<T>> {
        self.entries().get(key).and_then(|e| e.items.clone())
    }

    pub fn is_fresh(&self, key: &K) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|e| !e.dirty && e.items.is_some())
    }

    pub fn begin_fetch(&self, key: K) -> FetchTicket<K> {
        let generation = self.entries().entry(key.clone()).or_default().generation;
        FetchTicket { key, generation }
    }

    /// Stores `items` unless the scope changed while the fetch was in flight.
    /// Returns whether the result was kept.
    pub fn complete_fetch(&self, ticket: FetchTicket<K>, items: Vec<T>) -> bool {
        let mut entries = self.entries();
        let entry = entries.entry(ticket.key.clone()).or_default();
        if entry.generation != ticket.generation {
            debug!(
                "discarding stale fetch for {:?} (generation {} != {})",
                ticket.key, ticket.generation, entry.generation
            );
            return false;
        }
        entry.items = Some(items);
        entry.dirty = false;
        true
    }

    pub fn invalidate(&self, key: &K) {
        if let Some(entry) = self.entries().get_mut(key) {
            debug!("invalidating {:?}", key);
            entry.dirty = true;
            entry.generation += 1;
        }
    }

    pub fn invalidate_all(&self) {
        for entry in self.entries().values_mut() {
            entry.dirty = true;
            entry.generation += 1;
        }
    }

    /// Edits the held collection in place. Does nothing when the scope was
    /// never loaded.
    pub fn patch(&self, key: &K, f: impl FnOnce(&mut Vec<T>)) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(key) {
            Some(Entry {
                items: Some(items),
                generation,
                ..
            }) => {
                f(items);
                *generation += 1;
                true
            }
            _ => false,
        }
    }

    fn scope_lock(&self, key: &K) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Serializes mutations against one scope.
    pub async fn lock_scope(&self, key: &K) -> OwnedMutexGuard<()> {
        self.scope_lock(key).lock_owned().await
    }

    /// Locks several scopes in ascending key order.
    pub async fn lock_scopes(&self, keys: &[K]) -> Vec<OwnedMutexGuard<()>>
    where
        K: Ord,
    {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock_scope(key).await);
        }
        guards
    }
}

/// The scope a view is currently showing. Every selection bumps the epoch,
/// which lets a finished load tell whether its scope is still the active one.
pub struct ActiveScope<K> {
    current: Mutex<(Option<K>, u64)>,
}

impl<K> Default for ActiveScope<K> {
    fn default() -> Self {
        Self {
            current: Mutex::new((None, 0)),
        }
    }
}

impl<K: Clone> ActiveScope<K> {
    pub fn select(&self, key: Option<K>) -> u64 {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.0 = key;
        current.1 += 1;
        current.1
    }

    pub fn current(&self) -> (Option<K>, u64) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current().1 == epoch
    }
}

/// What a view shows for its scope. A failed load and an empty collection
/// are different states.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    /// No scope selected, nothing fetched.
    Idle,
    Loading,
    Ready(Vec<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            _ => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
