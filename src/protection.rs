// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Protection Evaluator
//!
//! Decides whether a transaction must be routed privately. The selector
//! allow-list below is the only one in the crate.

use crate::blockchain::DecodedTransaction;

/// Below this the relay rejects the transaction anyway.
pub const MIN_PROTECTED_GAS: u64 = 42_000;

/// `transfer(address,uint256)` and `approve(address,uint256)`.
pub const SAFE_SELECTORS: &[[u8; 4]] = &[[0xa9, 0x05, 0x9c, 0xbb], [0x09, 0x5e, 0xa7, 0xb3]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionDecision {
    LowGas,
    /// Plain value transfer or cancellation-shaped transaction.
    NoCalldata,
    SafeSelector,
    Required,
}

impl ProtectionDecision {
    pub fn is_required(self) -> bool {
        self == ProtectionDecision::Required
    }
}

pub fn evaluate(gas: u64, data: &[u8]) -> ProtectionDecision {
    if gas < MIN_PROTECTED_GAS {
        return ProtectionDecision::LowGas;
    }
    if data.is_empty() {
        return ProtectionDecision::NoCalldata;
    }
    if data.len() >= 4 && SAFE_SELECTORS.iter().any(|safe| safe[..] == data[..4]) {
        ProtectionDecision::SafeSelector
    } else {
        ProtectionDecision::Required
    }
}

pub fn evaluate_transaction(tx: &DecodedTransaction) -> ProtectionDecision {
    evaluate(tx.gas, &tx.data)
}
