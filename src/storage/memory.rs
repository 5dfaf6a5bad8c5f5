// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU state store with per-entry expiry.
//!
//! Used when no `REDIS_URL` is configured and throughout the tests. Entries
//! beyond the capacity are evicted least-recently-used first.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;

use super::{StateStore, StoreError};

/// Default number of keys kept in memory.
pub const DEFAULT_CAPACITY: usize = 100_000;

enum Stored {
    Text(String),
    List(Vec<String>),
}

struct Entry {
    value: Stored,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct MemoryStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if !entry.is_live() {
            entries.pop(key);
            return Ok(None);
        }
        match &entry.value {
            Stored::Text(value) => Ok(Some(value.clone())),
            Stored::List(_) => Err(StoreError::Corrupt(format!("{key} holds a list"))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.lock()?.put(
            key.to_string(),
            Entry {
                value: Stored::Text(value.to_string()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.pop(key);
        Ok(())
    }

    async fn push_front(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let expires_at = Instant::now() + ttl;

        if let Some(entry) = entries.get_mut(key).filter(|e| e.is_live()) {
            let Stored::List(items) = &mut entry.value else {
                return Err(StoreError::Corrupt(format!("{key} holds a string")));
            };
            items.insert(0, value.to_string());
            entry.expires_at = expires_at;
            return Ok(());
        }

        entries.put(
            key.to_string(),
            Entry {
                value: Stored::List(vec![value.to_string()]),
                expires_at,
            },
        );
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.lock()?;
        let Some(entry) = entries.get(key) else {
            return Ok(Vec::new());
        };
        if !entry.is_live() {
            entries.pop(key);
            return Ok(Vec::new());
        }
        match &entry.value {
            Stored::List(items) => Ok(items.clone()),
            Stored::Text(_) => Err(StoreError::Corrupt(format!("{key} holds a string"))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
