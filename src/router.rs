// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Router
//!
//! Owns the mempool-vs-relay decision for every submitted raw transaction.
//!
//! ## Pipeline
//!
//! 1. Decode and sanity-check the nonce
//! 2. Record `hash -> sender`, end any nonce fix for the sender
//! 3. Compliance screening
//! 4. Whitehat bundle collection, which takes every transaction in that mode
//! 5. Cancellation handling (near-empty self-send)
//! 6. Oversized payload policy
//! 7. Protection evaluation; unprotected transactions go to the mempool
//! 8. Relay dedup, nonce window, bookkeeping, relay submission
//!
//! ## Consistency
//!
//! Dedup and nonce bookkeeping live in the state store, not in process
//! memory, so the checks hold across instances. The dedup marker is written
//! before the relay call; two near-simultaneous identical submissions may
//! both reach the relay, which deduplicates by hash itself.

use std::sync::Arc;

use alloy::primitives::{address, Address, B256};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditEventType};
use crate::background::{Job, JobQueue};
use crate::blockchain::{decode_raw_transaction, DecodedTransaction, NodeClient};
use crate::compliance::ComplianceFilter;
use crate::error::GatewayError;
use crate::nonce_fix::NonceFix;
use crate::preferences::{RoutingPreferences, TxPrivacyPreferences};
use crate::protection;
use crate::relay::{PrivateTxSubmission, RelayClient, StatusPoller, TxStatus};
use crate::rpc::{call::ETH_SEND_RAW_TRANSACTION, RpcRequest, RpcResponse};
use crate::storage::RouterState;

/// Nonces above this are treated as malformed input.
pub const MAX_SANE_NONCE: u64 = 1_000_000_000;

/// Transactions larger than this need an allow-listed destination.
pub const MAX_TX_SIZE_BYTES: usize = 128 * 1024;

/// Contracts known to legitimately receive large payloads.
pub const LARGE_TX_DESTINATIONS: &[Address] = &[
    address!("0x1c479675ad559DC151F6Ec7ed3FbF8ceE79582B6"),
    address!("0xFF00000000000000000000000000000000000010"),
    address!("0x3dB52cE065f728011Ac6732222270b3F2360d919"),
];

/// A relay-bound transaction with unknown status may be resent after this.
pub const UNKNOWN_STATUS_RESEND_AFTER_SECS: i64 = 5 * 60;

/// One `eth_sendRawTransaction`-style submission.
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    /// Client request id, echoed on proxied mempool calls.
    pub id: &'a Value,
    pub raw: &'a str,
    pub preferences: &'a RoutingPreferences,
    pub whitehat_bundle: Option<&'a str>,
    /// Explicit expiry block from an `eth_sendPrivateTransaction` body.
    pub max_block_number: Option<u64>,
    /// Skip the protection check and always route privately.
    pub force_private: bool,
}

/// Result of routing one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Answer the client with this hash.
    Hash(B256),
    /// The mempool's own response, to be relayed to the client.
    Mempool(RpcResponse),
}

pub struct TransactionRouter {
    state: RouterState,
    node: Arc<dyn NodeClient>,
    relay: Arc<dyn RelayClient>,
    status: Arc<dyn StatusPoller>,
    compliance: Arc<ComplianceFilter>,
    nonce_fix: Arc<NonceFix>,
    jobs: JobQueue,
}

impl TransactionRouter {
    pub fn new(
        state: RouterState,
        node: Arc<dyn NodeClient>,
        relay: Arc<dyn RelayClient>,
        status: Arc<dyn StatusPoller>,
        compliance: Arc<ComplianceFilter>,
        nonce_fix: Arc<NonceFix>,
        jobs: JobQueue,
    ) -> Self {
        Self {
            state,
            node,
            relay,
            status,
            compliance,
            nonce_fix,
            jobs,
        }
    }

    pub async fn send_raw_transaction(
        &self,
        submission: &Submission<'_>,
    ) -> Result<Routed, GatewayError> {
        let tx = decode_raw_transaction(submission.raw)
            .map_err(|e| GatewayError::invalid_params(format!("invalid raw transaction: {e}")))?;

        if tx.nonce > MAX_SANE_NONCE {
            return Err(GatewayError::invalid_params("nonce too high"));
        }

        let origin = submission.preferences.origin_id.as_str();
        info!(
            tx_hash = %tx.hash,
            sender = %tx.sender,
            nonce = tx.nonce,
            origin_id = %origin,
            "Routing raw transaction"
        );

        if let Err(e) = self.nonce_fix.clear(&tx.sender).await {
            warn!(sender = %tx.sender, error = %e, "Failed to clear nonce fix");
        }
        if let Err(e) = self.state.set_sender_of_tx(&tx.hash, &tx.sender).await {
            warn!(tx_hash = %tx.hash, error = %e, "Failed to record sender of tx");
        }

        if self.compliance.is_blocked(&tx.sender) {
            warn!(tx_hash = %tx.hash, sender = %tx.sender, "Sender is sanctioned, blocking");
            self.audit(AuditEventType::ComplianceBlocked, &tx, origin, None);
            return Err(GatewayError::blocked());
        }

        if let Some(bundle_id) = submission.whitehat_bundle {
            self.state.append_whitehat_tx(bundle_id, &tx.raw).await?;
            info!(tx_hash = %tx.hash, bundle_id, "Collected transaction into whitehat bundle");
            self.jobs.audit(
                AuditEvent::new(AuditEventType::WhitehatCollected)
                    .with_origin(origin)
                    .with_tx(tx.hash, tx.sender)
                    .with_details(json!({ "bundle": bundle_id })),
            );
            return Ok(Routed::Hash(tx.hash));
        }

        if tx.is_cancellation() {
            if let Some(routed) = self.try_cancel(&tx, origin).await? {
                return Ok(routed);
            }
            return self.send_to_mempool(submission, &tx).await;
        }

        if tx.size_bytes > MAX_TX_SIZE_BYTES
            && !tx
                .destination
                .is_some_and(|to| LARGE_TX_DESTINATIONS.contains(&to))
        {
            warn!(tx_hash = %tx.hash, size = tx.size_bytes, "Oversized transaction rejected");
            self.audit(
                AuditEventType::PolicyRejected,
                &tx,
                origin,
                Some("transaction too large"),
            );
            return Err(GatewayError::policy("transaction too large"));
        }

        if !submission.force_private {
            let decision = protection::evaluate_transaction(&tx);
            if !decision.is_required() {
                info!(tx_hash = %tx.hash, ?decision, "Protection not required");
                return self.send_to_mempool(submission, &tx).await;
            }
        }

        self.send_to_relay(submission, &tx).await
    }

    /// Forward a client-requested cancellation to the relay.
    pub async fn cancel_private_transaction(&self, tx_hash: B256) -> Result<(), GatewayError> {
        info!(tx_hash = %tx_hash, "Forwarding cancellation to relay");
        self.relay.cancel_private_transaction(tx_hash).await?;
        Ok(())
    }

    /// `Some` when the cancellation was handled by the relay path.
    async fn try_cancel(
        &self,
        tx: &DecodedTransaction,
        origin: &str,
    ) -> Result<Option<Routed>, GatewayError> {
        let Some(prior) = self.state.hash_for_sender_nonce(&tx.sender, tx.nonce).await? else {
            return Ok(None);
        };
        if self.state.tx_sent_at(&prior).await?.is_none() {
            return Ok(None);
        }

        if self.state.tx_sent_at(&tx.hash).await?.is_some() {
            info!(tx_hash = %tx.hash, prior = %prior, "Cancellation already sent");
            return Ok(Some(Routed::Hash(prior)));
        }

        self.state.set_tx_sent(&tx.hash, Utc::now()).await?;
        if let Err(e) = self.relay.cancel_private_transaction(prior).await {
            warn!(tx_hash = %tx.hash, prior = %prior, error = %e, "Relay rejected cancellation");
            self.audit(AuditEventType::RelayRejected, tx, origin, Some(&e.to_string()));
            return Err(e.into());
        }

        info!(tx_hash = %tx.hash, prior = %prior, "Cancellation sent to relay");
        self.jobs.audit(
            AuditEvent::new(AuditEventType::CancellationSubmitted)
                .with_origin(origin)
                .with_tx(tx.hash, tx.sender)
                .with_details(json!({ "cancelled": format!("{prior:#x}") })),
        );
        Ok(Some(Routed::Hash(prior)))
    }

    async fn send_to_mempool(
        &self,
        submission: &Submission<'_>,
        tx: &DecodedTransaction,
    ) -> Result<Routed, GatewayError> {
        let request = RpcRequest::new(
            submission.id.clone(),
            ETH_SEND_RAW_TRANSACTION,
            vec![Value::String(tx.raw.clone())],
        );
        let endpoint = submission.preferences.mempool_rpc.as_ref();
        let response = self.node.forward(&request, endpoint).await?;

        info!(tx_hash = %tx.hash, custom_endpoint = endpoint.is_some(), "Sent to mempool");
        self.audit(
            AuditEventType::MempoolForwarded,
            tx,
            &submission.preferences.origin_id,
            response.error.as_ref().map(|e| e.message.as_str()),
        );
        Ok(Routed::Mempool(response))
    }

    async fn send_to_relay(
        &self,
        submission: &Submission<'_>,
        tx: &DecodedTransaction,
    ) -> Result<Routed, GatewayError> {
        let origin = submission.preferences.origin_id.as_str();

        if let Some(sent_at) = self.state.tx_sent_at(&tx.hash).await? {
            let status = self.status.status(tx.hash).await?;
            let age = Utc::now() - sent_at;
            let resend = match status {
                TxStatus::Failed => true,
                TxStatus::Unknown => {
                    age >= ChronoDuration::seconds(UNKNOWN_STATUS_RESEND_AFTER_SECS)
                }
                TxStatus::Pending | TxStatus::Included | TxStatus::Cancelled => false,
            };
            if !resend {
                info!(tx_hash = %tx.hash, ?status, "Already sent to relay, skipping");
                self.audit(AuditEventType::RelayDeduplicated, tx, origin, None);
                return Ok(Routed::Hash(tx.hash));
            }
            info!(tx_hash = %tx.hash, ?status, "Resending to relay");
        }

        let min_nonce = self.node.transaction_count(tx.sender).await?;
        let stored_max = match self.state.sender_max_nonce(&tx.sender).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(sender = %tx.sender, error = %e, "Failed to read sender max nonce");
                None
            }
        };
        let max_nonce = stored_max.unwrap_or(min_nonce).max(min_nonce);
        if tx.nonce < min_nonce || tx.nonce > max_nonce.saturating_add(1) {
            warn!(
                tx_hash = %tx.hash,
                nonce = tx.nonce,
                min_nonce,
                max_nonce,
                "Nonce outside accepted window"
            );
            self.audit(AuditEventType::PolicyRejected, tx, origin, Some("invalid nonce"));
            return Err(GatewayError::policy("invalid nonce"));
        }

        self.state.set_tx_sent(&tx.hash, Utc::now()).await?;
        self.jobs.submit(Job::SetMaxNonce {
            sender: tx.sender,
            nonce: tx.nonce,
        });
        if let Err(e) = self
            .state
            .set_hash_for_sender_nonce(&tx.sender, tx.nonce, &tx.hash)
            .await
        {
            warn!(tx_hash = %tx.hash, error = %e, "Failed to index sender nonce");
        }

        let block_range = submission.preferences.block_range;
        let max_block_number = match (submission.max_block_number, block_range) {
            (Some(explicit), _) => Some(explicit),
            (None, Some(range)) => Some(self.node.block_number().await?.saturating_add(range)),
            (None, None) => None,
        };

        let relay_submission = PrivateTxSubmission {
            tx: tx.raw.clone(),
            max_block_number: max_block_number.map(|b| format!("{b:#x}")),
            preferences: TxPrivacyPreferences::from(submission.preferences),
        };

        if let Err(e) = self.relay.send_private_transaction(&relay_submission).await {
            warn!(tx_hash = %tx.hash, error = %e, "Relay rejected transaction");
            if e.is_failed_too_many_times() {
                if let Err(arm_err) = self.nonce_fix.arm(&tx.sender, tx.hash).await {
                    warn!(tx_hash = %tx.hash, error = %arm_err, "Failed to arm nonce fix");
                }
            }
            self.audit(AuditEventType::RelayRejected, tx, origin, Some(&e.to_string()));
            return Err(e.into());
        }

        info!(
            tx_hash = %tx.hash,
            fast = submission.preferences.fast,
            builders = submission.preferences.target_builders.len(),
            "Sent to relay"
        );
        self.jobs.audit(
            AuditEvent::new(AuditEventType::RelaySubmitted)
                .with_origin(origin)
                .with_tx(tx.hash, tx.sender)
                .with_details(json!({
                    "fast": submission.preferences.fast,
                    "hints": submission.preferences.privacy_hints,
                    "builders": submission.preferences.target_builders,
                    "maxBlockNumber": max_block_number,
                })),
        );
        Ok(Routed::Hash(tx.hash))
    }

    fn audit(
        &self,
        event_type: AuditEventType,
        tx: &DecodedTransaction,
        origin: &str,
        error: Option<&str>,
    ) {
        let mut event = AuditEvent::new(event_type)
            .with_origin(origin)
            .with_tx(tx.hash, tx.sender);
        if let Some(error) = error {
            event = event.failed(error);
        }
        self.jobs.audit(event);
    }
}
