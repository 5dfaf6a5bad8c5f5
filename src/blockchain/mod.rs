// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-facing primitives.
//!
//! This module provides:
//! - Raw transaction decoding and sender recovery
//! - The public node client used for proxying and nonce/block lookups

pub mod node;
pub mod tx;

pub use node::{HttpNodeClient, NodeClient, NodeError};
pub use tx::{decode_raw_transaction, DecodeError, DecodedTransaction};
