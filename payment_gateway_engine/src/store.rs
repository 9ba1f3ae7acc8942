//! The pending store: a TTL-bounded in-memory map of prepared-but-unsettled entities.
//!
//! This is the single shared mutable resource in the engine and the idempotency gate for
//! inbound callbacks. [`PendingStore::with_entry`] runs its closure under the map's shard lock,
//! which makes each per-key state transition atomic with respect to concurrent duplicate
//! webhooks; different keys proceed in parallel on different shards. Closures must not block or
//! await — outbound vendor calls always happen outside the lock.
//!
//! Entries are evicted lazily on access once their TTL lapses, and in bulk by the server's
//! sweeper via [`PendingStore::evict_expired`]. Terminal entries are not actively deleted; they
//! become inert because the commitable check fails.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::errors::StoreError;

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

pub struct PendingStore<T> {
    entries: DashMap<String, Entry<T>>,
    ttl: Duration,
}

impl<T> PendingStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    /// Insert a new entry. An id that is still pending is rejected; an expired entry under the
    /// same id is replaced.
    pub fn insert(&self, id: String, value: T) -> Result<(), StoreError> {
        let now = Instant::now();
        match self.entries.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if now.duration_since(occupied.get().inserted_at) <= self.ttl {
                    return Err(StoreError::DuplicateId(occupied.key().clone()));
                }
                occupied.insert(Entry { value, inserted_at: now });
                Ok(())
            },
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Entry { value, inserted_at: now });
                Ok(())
            },
        }
    }

    /// Run `f` against the entry under the shard lock. Returns `None` when the id is absent or
    /// the entry has expired (expired entries are removed on the spot). `f` must not block.
    pub fn with_entry<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        {
            let mut entry = self.entries.get_mut(id)?;
            if entry.inserted_at.elapsed() <= self.ttl {
                return Some(f(&mut entry.value));
            }
        }
        // Lapsed; drop the guard before removing to avoid a shard deadlock.
        self.entries.remove(id);
        None
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> PendingStore<T> {
    /// Clone out an entry without mutating it.
    pub fn get(&self, id: &str) -> Option<T> {
        let entry = self.entries.get(id)?;
        if entry.inserted_at.elapsed() <= self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }
}
