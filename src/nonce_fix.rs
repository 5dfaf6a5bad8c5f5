// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Nonce Fix
//!
//! Some wallets keep resubmitting a transaction the relay has given up on,
//! and stop only after seeing the account nonce move past it four times in
//! a row. While an entry is active for a sender, `eth_getTransactionCount`
//! is answered locally with `stored nonce + 1`.
//!
//! ## States
//!
//! ```text
//! Clear --arm--> Active(0) --count--> Active(1..3) --count--> Active(4) --count--> Clear
//!                    ^                                                     (proxied)
//!                    +-- re-armed by a newer failing tx (replaces entry) --+
//! ```
//!
//! Entries are kept in the state store with a 4h TTL, so every gateway
//! instance sees the same counter.

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use tracing::{debug, info};

use crate::audit::{AuditEvent, AuditEventType};
use crate::background::JobQueue;
use crate::blockchain::{NodeClient, NodeError};
use crate::relay::{StatusError, StatusPoller, TxStatus};
use crate::storage::{NonceFixEntry, RouterState, StoreError};

/// Number of masked `eth_getTransactionCount` answers per entry.
pub const MAX_MASKED_RESPONSES: u64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum NonceFixError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Status(#[from] StatusError),
}

pub struct NonceFix {
    state: RouterState,
    node: Arc<dyn NodeClient>,
    status: Arc<dyn StatusPoller>,
    jobs: JobQueue,
}

impl NonceFix {
    pub fn new(
        state: RouterState,
        node: Arc<dyn NodeClient>,
        status: Arc<dyn StatusPoller>,
        jobs: JobQueue,
    ) -> Self {
        Self {
            state,
            node,
            status,
            jobs,
        }
    }

    /// Start masking for `sender`, replacing any entry for an older hash.
    ///
    /// The sender's nonce high-water mark is reset to the on-chain nonce, so
    /// the failed slot can be reused.
    pub async fn arm(&self, sender: &Address, tx_hash: B256) -> Result<(), NonceFixError> {
        let nonce = self.node.transaction_count(*sender).await?;
        let entry = NonceFixEntry {
            tx_hash,
            nonce,
            num_tries: 0,
        };
        self.state.delete_nonce_fix(sender).await?;
        self.state.set_nonce_fix(sender, &entry).await?;
        self.state.reset_sender_max_nonce(sender, nonce).await?;

        info!(sender = %sender, tx_hash = %tx_hash, nonce, "Nonce fix armed");
        self.jobs.audit(
            AuditEvent::new(AuditEventType::NonceFixArmed)
                .with_tx(tx_hash, *sender)
                .with_details(serde_json::json!({ "nonce": nonce })),
        );
        Ok(())
    }

    /// Masked nonce for `address`, or `None` when the call should be proxied.
    pub async fn intercept_transaction_count(
        &self,
        address: &Address,
    ) -> Result<Option<u64>, NonceFixError> {
        let Some(mut entry) = self.state.nonce_fix(address).await? else {
            return Ok(None);
        };

        if entry.num_tries >= MAX_MASKED_RESPONSES {
            self.state.delete_nonce_fix(address).await?;
            info!(sender = %address, tx_hash = %entry.tx_hash, "Nonce fix exhausted");
            return Ok(None);
        }

        entry.num_tries += 1;
        self.state.set_nonce_fix(address, &entry).await?;

        let masked = entry.nonce + 1;
        debug!(sender = %address, tries = entry.num_tries, masked, "Serving masked nonce");
        self.jobs.audit(
            AuditEvent::new(AuditEventType::NonceFixServed)
                .with_tx(entry.tx_hash, *address)
                .with_details(serde_json::json!({ "tries": entry.num_tries, "nonce": masked })),
        );
        Ok(Some(masked))
    }

    /// Reconcile after `eth_getTransactionReceipt` returned `null`.
    pub async fn on_null_receipt(&self, tx_hash: B256) -> Result<(), NonceFixError> {
        let Some(sender) = self.state.sender_of_tx(&tx_hash).await? else {
            return Ok(());
        };
        let status = self.status.status(tx_hash).await?;
        let entry = self.state.nonce_fix(&sender).await?;

        match (status, entry) {
            (TxStatus::Failed, None) => self.arm(&sender, tx_hash).await?,
            (TxStatus::Failed, Some(entry)) if entry.tx_hash == tx_hash => {}
            (TxStatus::Failed, Some(entry)) => {
                info!(sender = %sender, stale = %entry.tx_hash, "Dropping superseded nonce fix");
                self.state.delete_nonce_fix(&sender).await?;
            }
            (_, Some(entry)) if entry.tx_hash == tx_hash => {
                info!(sender = %sender, tx_hash = %tx_hash, ?status, "Nonce fix no longer needed");
                self.state.delete_nonce_fix(&sender).await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// A fresh submission from `sender` ends any masking in progress.
    pub async fn clear(&self, sender: &Address) -> Result<(), NonceFixError> {
        self.state.delete_nonce_fix(sender).await?;
        Ok(())
    }
}
