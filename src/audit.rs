// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for routing decisions.
//!
//! Every transaction the gateway handles produces one [`AuditEvent`]. Events
//! travel through the background queue, so recording them never delays a
//! client response. Persistence lives behind [`AuditSink`]; the default sink
//! writes structured log lines under the `audit` target.

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Routing outcomes
    RelaySubmitted,
    RelayDeduplicated,
    MempoolForwarded,
    CancellationSubmitted,
    WhitehatCollected,

    // Rejections
    ComplianceBlocked,
    PolicyRejected,
    RelayRejected,

    // Nonce fix
    NonceFixArmed,
    NonceFixServed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Origin tag from the caller's preferences, empty when unset.
    pub origin_id: String,
    pub tx_hash: Option<B256>,
    pub sender: Option<Address>,
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            origin_id: String::new(),
            tx_hash: None,
            sender: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_origin(mut self, origin_id: impl Into<String>) -> Self {
        self.origin_id = origin_id.into();
        self
    }

    pub fn with_tx(mut self, tx_hash: B256, sender: Address) -> Self {
        self.tx_hash = Some(tx_hash);
        self.sender = Some(sender);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes events as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let details = event
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = ?event.event_type,
            origin_id = %event.origin_id,
            tx_hash = ?event.tx_hash,
            sender = ?event.sender,
            success = event.success,
            error = event.error.as_deref().unwrap_or(""),
            details = %details,
            "audit"
        );
    }
}
