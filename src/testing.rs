// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the external collaborators and a signed-tx helper.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{Address, Bytes, TxKind, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::audit::{AuditEvent, AuditSink};
use crate::blockchain::{NodeClient, NodeError};
use crate::relay::{
    PrivateTxSubmission, RelayClient, RelayError, StatusError, StatusPoller, TxStatus,
};
use crate::rpc::{RpcRequest, RpcResponse};

/// Calldata starting with a selector that is not on the safe list.
pub const SWAP_CALLDATA: [u8; 8] = [0x38, 0xed, 0x17, 0x39, 0, 0, 0, 1];

pub fn test_signer(seed: u8) -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::repeat_byte(seed.max(1))).unwrap()
}

#[derive(Debug, Clone)]
pub struct TxSpec {
    pub nonce: u64,
    pub gas: u64,
    pub to: Option<Address>,
    pub data: Vec<u8>,
}

impl Default for TxSpec {
    fn default() -> Self {
        Self {
            nonce: 0,
            gas: 150_000,
            to: Some(Address::with_last_byte(0x55)),
            data: SWAP_CALLDATA.to_vec(),
        }
    }
}

/// Sign a legacy transaction; returns the `0x` raw payload and its hash.
pub fn signed_tx(signer: &PrivateKeySigner, spec: TxSpec) -> (String, B256) {
    let tx = TxLegacy {
        chain_id: Some(1),
        nonce: spec.nonce,
        gas_price: 1_000_000_000,
        gas_limit: spec.gas,
        to: spec.to.map(TxKind::Call).unwrap_or(TxKind::Create),
        value: U256::ZERO,
        input: Bytes::from(spec.data),
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).unwrap();
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    let hash = *envelope.tx_hash();
    (alloy::hex::encode_prefixed(envelope.encoded_2718()), hash)
}

// -- node ---------------------------------------------------------------------

#[derive(Default)]
pub struct FakeNode {
    nonces: Mutex<HashMap<Address, u64>>,
    block: AtomicU64,
    results: Mutex<HashMap<String, Value>>,
    delays: Mutex<HashMap<String, Duration>>,
    forwarded: Mutex<Vec<(RpcRequest, Option<Url>)>>,
    fail: Mutex<Option<NodeError>>,
}

impl FakeNode {
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.lock().unwrap().insert(address, nonce);
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    /// Result returned for every forwarded call of `method`.
    pub fn set_result(&self, method: &str, result: Value) {
        self.results
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
    }

    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(method.to_string(), delay);
    }

    pub fn fail_with(&self, error: NodeError) {
        *self.fail.lock().unwrap() = Some(error);
    }

    pub fn forwarded(&self) -> Vec<(RpcRequest, Option<Url>)> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn forwarded_methods(&self) -> Vec<String> {
        self.forwarded()
            .into_iter()
            .map(|(r, _)| r.method)
            .collect()
    }
}

#[async_trait]
impl NodeClient for FakeNode {
    async fn forward(
        &self,
        request: &RpcRequest,
        endpoint: Option<&Url>,
    ) -> Result<RpcResponse, NodeError> {
        let delay = self.delays.lock().unwrap().get(&request.method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.forwarded
            .lock()
            .unwrap()
            .push((request.clone(), endpoint.cloned()));
        if let Some(error) = self.fail.lock().unwrap().clone() {
            return Err(error);
        }
        let result = self
            .results
            .lock()
            .unwrap()
            .get(&request.method)
            .cloned()
            .unwrap_or_else(|| Value::String(format!("{}-result", request.method)));
        Ok(RpcResponse::result(request.id.clone(), result))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, NodeError> {
        if let Some(error) = self.fail.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .nonces
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0))
    }

    async fn block_number(&self) -> Result<u64, NodeError> {
        Ok(self.block.load(Ordering::SeqCst))
    }
}

// -- relay --------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRelay {
    sent: Mutex<Vec<PrivateTxSubmission>>,
    cancelled: Mutex<Vec<B256>>,
    error: Mutex<Option<RelayError>>,
}

impl FakeRelay {
    pub fn reject_with(&self, error: RelayError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn sent(&self) -> Vec<PrivateTxSubmission> {
        self.sent.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<B256> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayClient for FakeRelay {
    async fn send_private_transaction(
        &self,
        submission: &PrivateTxSubmission,
    ) -> Result<(), RelayError> {
        self.sent.lock().unwrap().push(submission.clone());
        match self.error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn cancel_private_transaction(&self, tx_hash: B256) -> Result<(), RelayError> {
        self.cancelled.lock().unwrap().push(tx_hash);
        match self.error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// -- status -------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStatus {
    statuses: Mutex<HashMap<B256, TxStatus>>,
    calls: AtomicUsize,
    fail: Mutex<Option<StatusError>>,
}

impl FakeStatus {
    pub fn set(&self, hash: B256, status: TxStatus) {
        self.statuses.lock().unwrap().insert(hash, status);
    }

    pub fn fail_with(&self, error: StatusError) {
        *self.fail.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusPoller for FakeStatus {
    async fn status(&self, tx_hash: B256) -> Result<TxStatus, StatusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .unwrap_or(TxStatus::Unknown))
    }
}

// -- audit --------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
