// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed accessors over the raw [`StateStore`] key space.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StateStore, StoreError};

/// Retention of relay markers, nonce bookkeeping and bundles.
pub const ROUTING_TTL: Duration = Duration::from_secs(24 * 3600);

pub const NONCE_FIX_TTL: Duration = Duration::from_secs(4 * 3600);

/// Active nonce-fix record for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceFixEntry {
    pub tx_hash: B256,
    /// On-chain nonce observed when the entry was armed.
    pub nonce: u64,
    pub num_tries: u64,
}

fn tx_sent_key(hash: &B256) -> String {
    format!("tx-sent-to-relay:{hash:#x}")
}

fn max_nonce_key(sender: &Address) -> String {
    format!("sender-max-nonce:{sender:#x}")
}

fn sender_nonce_key(sender: &Address, nonce: u64) -> String {
    format!("sender-nonce-hash:{sender:#x}:{nonce}")
}

fn sender_of_tx_key(hash: &B256) -> String {
    format!("sender-of-tx:{hash:#x}")
}

fn nonce_fix_key(sender: &Address) -> String {
    format!("nonce-fix:{sender:#x}")
}

fn whitehat_key(bundle_id: &str) -> String {
    format!("whitehat-bundle:{}", bundle_id.to_lowercase())
}

#[derive(Clone)]
pub struct RouterState {
    store: Arc<dyn StateStore>,
}

impl RouterState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    // -- relay dedup ---------------------------------------------------------

    pub async fn tx_sent_at(&self, hash: &B256) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.store.get(&tx_sent_key(hash)).await? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::Corrupt(format!("tx-sent timestamp `{raw}`: {e}")))
    }

    pub async fn set_tx_sent(&self, hash: &B256, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.store
            .set(&tx_sent_key(hash), &at.to_rfc3339(), ROUTING_TTL)
            .await
    }

    // -- nonce bookkeeping ---------------------------------------------------

    pub async fn sender_max_nonce(&self, sender: &Address) -> Result<Option<u64>, StoreError> {
        let Some(raw) = self.store.get(&max_nonce_key(sender)).await? else {
            return Ok(None);
        };
        raw.parse::<u64>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("sender max nonce `{raw}`")))
    }

    /// Raise the high-water mark; lower values are ignored.
    pub async fn raise_sender_max_nonce(
        &self,
        sender: &Address,
        nonce: u64,
    ) -> Result<(), StoreError> {
        // A corrupt value is overwritten rather than wedging the sender.
        let current = match self.sender_max_nonce(sender).await {
            Err(StoreError::Corrupt(_)) => None,
            other => other?,
        };
        if current.is_some_and(|c| c >= nonce) {
            return Ok(());
        }
        self.reset_sender_max_nonce(sender, nonce).await
    }

    /// Overwrite the high-water mark, e.g. with the node nonce after a failure.
    pub async fn reset_sender_max_nonce(
        &self,
        sender: &Address,
        nonce: u64,
    ) -> Result<(), StoreError> {
        self.store
            .set(&max_nonce_key(sender), &nonce.to_string(), ROUTING_TTL)
            .await
    }

    pub async fn hash_for_sender_nonce(
        &self,
        sender: &Address,
        nonce: u64,
    ) -> Result<Option<B256>, StoreError> {
        let Some(raw) = self.store.get(&sender_nonce_key(sender, nonce)).await? else {
            return Ok(None);
        };
        raw.parse::<B256>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("sender nonce hash `{raw}`")))
    }

    pub async fn set_hash_for_sender_nonce(
        &self,
        sender: &Address,
        nonce: u64,
        hash: &B256,
    ) -> Result<(), StoreError> {
        self.store
            .set(
                &sender_nonce_key(sender, nonce),
                &format!("{hash:#x}"),
                ROUTING_TTL,
            )
            .await
    }

    pub async fn sender_of_tx(&self, hash: &B256) -> Result<Option<Address>, StoreError> {
        let Some(raw) = self.store.get(&sender_of_tx_key(hash)).await? else {
            return Ok(None);
        };
        raw.parse::<Address>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("sender of tx `{raw}`")))
    }

    pub async fn set_sender_of_tx(&self, hash: &B256, sender: &Address) -> Result<(), StoreError> {
        self.store
            .set(
                &sender_of_tx_key(hash),
                &format!("{sender:#x}"),
                ROUTING_TTL,
            )
            .await
    }

    // -- nonce fix -----------------------------------------------------------

    pub async fn nonce_fix(&self, sender: &Address) -> Result<Option<NonceFixEntry>, StoreError> {
        let Some(raw) = self.store.get(&nonce_fix_key(sender)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("nonce-fix entry: {e}")))
    }

    pub async fn set_nonce_fix(
        &self,
        sender: &Address,
        entry: &NonceFixEntry,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entry)
            .map_err(|e| StoreError::Corrupt(format!("nonce-fix entry: {e}")))?;
        self.store
            .set(&nonce_fix_key(sender), &raw, NONCE_FIX_TTL)
            .await
    }

    pub async fn delete_nonce_fix(&self, sender: &Address) -> Result<(), StoreError> {
        self.store.delete(&nonce_fix_key(sender)).await
    }

    // -- whitehat bundles ----------------------------------------------------

    pub async fn append_whitehat_tx(&self, bundle_id: &str, raw_tx: &str) -> Result<(), StoreError> {
        self.store
            .push_front(&whitehat_key(bundle_id), raw_tx, ROUTING_TTL)
            .await
    }

    pub async fn whitehat_bundle(&self, bundle_id: &str) -> Result<Vec<String>, StoreError> {
        self.store.list(&whitehat_key(bundle_id)).await
    }
}
