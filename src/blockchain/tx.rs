// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw transaction decoding.

use alloy::{
    consensus::{transaction::SignerRecoverable, Transaction, TxEnvelope},
    eips::eip2718::Decodable2718,
    primitives::{Address, Bytes, B256},
};

/// A signed transaction as seen by the router. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub hash: B256,
    pub sender: Address,
    pub nonce: u64,
    pub gas: u64,
    pub data: Bytes,
    /// `None` for contract creation.
    pub destination: Option<Address>,
    pub size_bytes: usize,
    /// The original payload, `0x`-prefixed, as received.
    pub raw: String,
}

impl DecodedTransaction {
    /// Near-empty self-send: the conventional wallet "cancel" shape.
    pub fn is_cancellation(&self) -> bool {
        self.data.len() <= 2 && self.destination == Some(self.sender)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid transaction encoding: {0}")]
    Encoding(String),

    #[error("invalid signature: {0}")]
    Signature(String),
}

pub fn decode_raw_transaction(raw: &str) -> Result<DecodedTransaction, DecodeError> {
    let raw = raw.trim();
    let bytes = alloy::hex::decode(raw).map_err(|e| DecodeError::Hex(e.to_string()))?;

    let mut buf = bytes.as_slice();
    let envelope =
        TxEnvelope::decode_2718(&mut buf).map_err(|e| DecodeError::Encoding(e.to_string()))?;
    if !buf.is_empty() {
        return Err(DecodeError::Encoding(format!(
            "{} trailing bytes",
            buf.len()
        )));
    }

    let sender = envelope
        .recover_signer()
        .map_err(|e| DecodeError::Signature(e.to_string()))?;

    Ok(DecodedTransaction {
        hash: *envelope.tx_hash(),
        sender,
        nonce: envelope.nonce(),
        gas: envelope.gas_limit(),
        data: envelope.input().clone(),
        destination: envelope.to(),
        size_bytes: bytes.len(),
        raw: alloy::hex::encode_prefixed(&bytes),
    })
}
