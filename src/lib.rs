// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Protect RPC - frontrunning-protection JSON-RPC gateway
//!
//! Sits in front of a public Ethereum node and a private transaction relay.
//! Transactions that could be frontrun are routed privately to the relay;
//! everything else is proxied to the node.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers (Axum)
//! - `dispatcher` - per-method handling and ordered batch fan-out
//! - `router` - transaction routing between relay and mempool
//! - `preferences` - URL preference parsing and origin presets
//! - `nonce_fix` - masking nonces of transactions the relay gave up on
//! - `storage` - shared router state (Redis or in-memory)
//! - `blockchain` / `relay` - upstream clients

pub mod api;
pub mod audit;
pub mod background;
pub mod blockchain;
pub mod compliance;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod nonce_fix;
pub mod preferences;
pub mod protection;
pub mod relay;
pub mod router;
pub mod rpc;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
