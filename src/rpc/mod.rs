// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 wire types.
//!
//! The request `id` is kept as a raw [`Value`] so that numbers stay numbers
//! and strings stay strings when echoed back to the client.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub mod call;

pub use call::{Call, CallDecodeError, PrivateTxParams};

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic server error used for authorization rejections.
    pub const SERVER_ERROR: i64 = -32000;
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

fn empty_params() -> Value {
    Value::Array(Vec::new())
}

fn params_or_empty<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(empty_params()),
        params => Ok(params),
    }
}

/// One decoded JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id: Value,
    pub method: String,
    /// Positional array or named object; `null` and absent read as `[]`.
    #[serde(default = "empty_params", deserialize_with = "params_or_empty")]
    #[schema(value_type = Object)]
    pub params: Value,
    #[serde(default = "default_version")]
    pub jsonrpc: String,
}

impl RpcRequest {
    pub fn new(id: Value, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Value::Array(params),
            jsonrpc: default_version(),
        }
    }

    /// Positional params, if the call used them.
    pub fn positional_params(&self) -> Option<&[Value]> {
        self.params.as_array().map(Vec::as_slice)
    }

    /// Serialize for forwarding to an upstream JSON-RPC endpoint.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of strings and JSON values cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// JSON-RPC response.
///
/// `result: null` is a meaningful answer (e.g. a receipt that is not mined
/// yet), so a present-but-null result deserializes to `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id: Value,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Parse a raw upstream response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// True when the call succeeded with a JSON `null` result.
    pub fn is_null_result(&self) -> bool {
        self.error.is_none() && matches!(self.result, Some(Value::Null) | None)
    }
}
