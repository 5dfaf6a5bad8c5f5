// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway error taxonomy.
//!
//! Every failure a client can observe is a [`GatewayError`]. The kind decides
//! the HTTP status for single calls; the JSON-RPC code and message travel in
//! the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::error;

use crate::blockchain::NodeError;
use crate::nonce_fix::NonceFixError;
use crate::relay::{RelayError, StatusError};
use crate::rpc::{codes, RpcErrorObject, RpcResponse};
use crate::storage::StoreError;

/// Message returned for compliance and origin rejections.
pub const BLOCKED_MESSAGE: &str = "blocked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed JSON, bad params, invalid preference values.
    Client,
    /// Compliance-list hits and blocked origins.
    Blocked,
    /// Node, relay, status poller or state store failures.
    Upstream,
    /// Routing policy rejections (nonce window, oversized payloads).
    Policy,
}

impl ErrorKind {
    /// HTTP status for a single call that failed with this kind.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Client => StatusCode::BAD_REQUEST,
            ErrorKind::Blocked => StatusCode::UNAUTHORIZED,
            ErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Policy => StatusCode::OK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub code: i64,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, code: i64, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, codes::INVALID_REQUEST, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, codes::INVALID_PARAMS, message)
    }

    pub fn blocked() -> Self {
        Self::new(ErrorKind::Blocked, codes::SERVER_ERROR, BLOCKED_MESSAGE)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, codes::INTERNAL_ERROR, message)
    }

    pub fn internal() -> Self {
        Self::upstream("internal error")
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Policy, codes::INTERNAL_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn to_rpc_error(&self) -> RpcErrorObject {
        RpcErrorObject::new(self.code, self.message.clone())
    }

    /// Wrap as a JSON-RPC response for the given request id.
    pub fn into_rpc_response(self, id: Value) -> RpcResponse {
        RpcResponse::error(id, self.to_rpc_error())
    }
}

impl From<NodeError> for GatewayError {
    fn from(err: NodeError) -> Self {
        error!(error = %err, "Node call failed");
        match err {
            NodeError::Timeout => GatewayError::upstream("upstream request timed out"),
            _ => GatewayError::upstream("upstream node unavailable"),
        }
    }
}

/// Relay business rejections keep their message; transport failures do not.
impl From<RelayError> for GatewayError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Rejected { message, .. } => GatewayError::upstream(message),
            other => {
                error!(error = %other, "Relay call failed");
                GatewayError::upstream("relay unavailable")
            }
        }
    }
}

impl From<StatusError> for GatewayError {
    fn from(err: StatusError) -> Self {
        error!(error = %err, "Status lookup failed");
        GatewayError::upstream("relay status unavailable")
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "State store call failed");
        GatewayError::internal()
    }
}

impl From<NonceFixError> for GatewayError {
    fn from(err: NonceFixError) -> Self {
        match err {
            NonceFixError::Store(e) => e.into(),
            NonceFixError::Node(e) => e.into(),
            NonceFixError::Status(e) => e.into(),
        }
    }
}

/// Body-level failures (nothing to echo an id from) answer with `id: null`.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_rpc_response(Value::Null))).into_response()
    }
}
