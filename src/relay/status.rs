// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay transaction status lookups (`GET {base}/{hash}`).

use std::time::Duration;

use alloy::primitives::B256;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Unknown,
    Pending,
    Included,
    Failed,
    Cancelled,
}

impl TxStatus {
    /// Unrecognised values are treated as `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => TxStatus::Pending,
            "included" => TxStatus::Included,
            "failed" => TxStatus::Failed,
            "cancelled" | "canceled" => TxStatus::Cancelled,
            _ => TxStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("status request failed: {0}")]
    Transport(String),

    #[error("status request timed out")]
    Timeout,

    #[error("status api returned HTTP {0}")]
    Status(u16),

    #[error("status api returned an invalid body: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait StatusPoller: Send + Sync {
    async fn status(&self, tx_hash: B256) -> Result<TxStatus, StatusError>;
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

pub struct HttpStatusPoller {
    base: Url,
    http: Client,
}

impl HttpStatusPoller {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, StatusError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatusError::Transport(e.to_string()))?;
        Ok(Self { base, http })
    }

    fn status_url(&self, tx_hash: B256) -> String {
        format!("{}/{tx_hash:#x}", self.base.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl StatusPoller for HttpStatusPoller {
    async fn status(&self, tx_hash: B256) -> Result<TxStatus, StatusError> {
        let response = self
            .http
            .get(self.status_url(tx_hash))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StatusError::Timeout
                } else {
                    StatusError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(StatusError::Status(response.status().as_u16()));
        }

        let body: StatusBody = response
            .json()
            .await
            .map_err(|e| StatusError::InvalidResponse(e.to_string()))?;
        Ok(TxStatus::parse(&body.status))
    }
}
