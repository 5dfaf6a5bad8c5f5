// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # State Store
//!
//! Key/value storage shared by every gateway instance. It holds relay dedup
//! markers, per-sender nonce bookkeeping, nonce-fix entries and whitehat
//! bundle lists.
//!
//! ## Backends
//!
//! - [`RedisStore`]: production backend, the source of truth when several
//!   gateway instances run side by side
//! - [`MemoryStore`]: in-process LRU backend for single-instance runs and tests
//!
//! ## Key Layout
//!
//! ```text
//! tx-sent-to-relay:{hash}            RFC3339 timestamp       24h
//! sender-max-nonce:{sender}          decimal                 24h
//! sender-nonce-hash:{sender}:{nonce} tx hash                 24h
//! sender-of-tx:{hash}                sender address          24h
//! nonce-fix:{sender}                 JSON NonceFixEntry      4h
//! whitehat-bundle:{id}               list of raw txs         24h
//! ```
//!
//! Addresses and hashes are lowercased before they are used in keys.

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis_store;
pub mod state;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use state::{NonceFixEntry, RouterState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("state store operation timed out")]
    Timeout,

    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Atomic per-key operations; no cross-key transactions are assumed.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Prepend to a list and refresh its TTL.
    async fn push_front(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Whole list, most recent first. Missing keys yield an empty list.
    async fn list(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
