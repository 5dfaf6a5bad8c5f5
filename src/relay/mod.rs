// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Private Relay Client
//!
//! Signed JSON-RPC calls to the private transaction relay.
//!
//! ## Transport
//!
//! Every request carries `X-Flashbots-Signature: <address>:<signature>`,
//! where the signature is an EIP-191 personal signature over the `0x` hex
//! string of `keccak256(body)`.
//!
//! ## Errors
//!
//! A JSON-RPC error returned by the relay is a business rejection and its
//! message reaches the client unchanged. Transport failures and timeouts are
//! reported generically.

use std::time::Duration;

use alloy::{
    primitives::{keccak256, B256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::preferences::TxPrivacyPreferences;
use crate::rpc::{
    call::{ETH_CANCEL_PRIVATE_TRANSACTION, ETH_SEND_PRIVATE_TRANSACTION},
    RpcRequest, RpcResponse,
};

pub mod status;

pub use status::{HttpStatusPoller, StatusError, StatusPoller, TxStatus};

pub const SIGNATURE_HEADER: &str = "X-Flashbots-Signature";

/// Relay message meaning the wallet should stop resubmitting this transaction.
pub const FAILED_TOO_MANY_TIMES: &str = "Bundle submitted has already failed too many times";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("{message}")]
    Rejected { code: i64, message: String },

    #[error("relay request failed: {0}")]
    Transport(String),

    #[error("relay request timed out")]
    Timeout,

    #[error("relay returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to sign relay request: {0}")]
    Signing(String),
}

impl RelayError {
    pub fn is_failed_too_many_times(&self) -> bool {
        matches!(self, RelayError::Rejected { message, .. } if message.contains(FAILED_TOO_MANY_TIMES))
    }
}

/// One private transaction as submitted to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateTxSubmission {
    pub tx: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_number: Option<String>,
    pub preferences: TxPrivacyPreferences,
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send_private_transaction(
        &self,
        submission: &PrivateTxSubmission,
    ) -> Result<(), RelayError>;

    async fn cancel_private_transaction(&self, tx_hash: B256) -> Result<(), RelayError>;
}

pub struct FlashbotsRelay {
    url: Url,
    http: Client,
    signer: PrivateKeySigner,
}

impl FlashbotsRelay {
    pub fn new(url: Url, signer: PrivateKeySigner, timeout: Duration) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        info!(relay = %url, signer = %signer.address(), "Relay client configured");

        Ok(Self { url, http, signer })
    }

    fn sign_body(&self, body: &[u8]) -> Result<String, RelayError> {
        signature_header(&self.signer, body)
    }

    async fn call(&self, method: &str, params: Value) -> Result<RpcResponse, RelayError> {
        let request = RpcRequest::new(json!(1), method, vec![params]);
        let body = request.to_bytes();
        let signature = self.sign_body(&body)?;

        let response = self
            .http
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout
                } else {
                    RelayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let parsed = RpcResponse::from_slice(&bytes).map_err(|e| {
            RelayError::InvalidResponse(format!("HTTP {}: {e}", status.as_u16()))
        })?;

        if let Some(error) = parsed.error {
            return Err(RelayError::Rejected {
                code: error.code,
                message: error.message,
            });
        }
        Ok(parsed)
    }
}

/// Build the signature header value for a request body.
pub fn signature_header(signer: &PrivateKeySigner, body: &[u8]) -> Result<String, RelayError> {
    let digest = alloy::hex::encode_prefixed(keccak256(body));
    let signature = signer
        .sign_message_sync(digest.as_bytes())
        .map_err(|e| RelayError::Signing(e.to_string()))?;
    Ok(format!(
        "{:#x}:{}",
        signer.address(),
        alloy::hex::encode_prefixed(signature.as_bytes())
    ))
}

#[async_trait]
impl RelayClient for FlashbotsRelay {
    async fn send_private_transaction(
        &self,
        submission: &PrivateTxSubmission,
    ) -> Result<(), RelayError> {
        let params = serde_json::to_value(submission)
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        let response = self.call(ETH_SEND_PRIVATE_TRANSACTION, params).await?;
        // Only the absence of an error matters; the router answers with the hash.
        debug!(result = ?response.result, "Relay accepted private transaction");
        Ok(())
    }

    async fn cancel_private_transaction(&self, tx_hash: B256) -> Result<(), RelayError> {
        let params = json!({ "txHash": format!("{tx_hash:#x}") });
        self.call(ETH_CANCEL_PRIVATE_TRANSACTION, params).await?;
        Ok(())
    }
}
