// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-method typed decoding of JSON-RPC params.
//!
//! Every method the gateway treats specially is decoded into a [`Call`]
//! variant up front, so routing logic never pokes at untyped positional
//! params. Anything else becomes [`Call::Generic`] and is proxied as-is.

use std::str::FromStr;

use alloy::primitives::{Address, B256};
use serde::Deserialize;
use serde_json::Value;

use super::RpcRequest;
use crate::preferences::TxPrivacyPreferences;

pub const ETH_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";
pub const ETH_SEND_PRIVATE_TRANSACTION: &str = "eth_sendPrivateTransaction";
pub const ETH_CANCEL_PRIVATE_TRANSACTION: &str = "eth_cancelPrivateTransaction";
pub const ETH_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
pub const ETH_CALL: &str = "eth_call";
pub const ETH_GET_BALANCE: &str = "eth_getBalance";
pub const ETH_CHAIN_ID: &str = "eth_chainId";
pub const NET_VERSION: &str = "net_version";

/// Body of a client-submitted `eth_sendPrivateTransaction`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateTxParams {
    pub tx: String,
    #[serde(default)]
    pub max_block_number: Option<String>,
    #[serde(default)]
    pub preferences: Option<TxPrivacyPreferences>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelParams {
    tx_hash: B256,
}

/// A JSON-RPC call decoded by method.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendRawTransaction { raw: String },
    SendPrivateTransaction(PrivateTxParams),
    CancelPrivateTransaction { tx_hash: B256 },
    GetTransactionCount { address: Address },
    GetTransactionReceipt { tx_hash: B256 },
    EthCall { to: Option<Address>, from: Option<Address> },
    GetBalance { address: Address },
    NetVersion,
    ChainId,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallDecodeError {
    #[error("missing value for required argument {index}")]
    MissingParam { index: usize },

    #[error("invalid argument {index}: {reason}")]
    InvalidParam { index: usize, reason: String },

    #[error("params must be a positional array")]
    NotPositional,
}

impl Call {
    pub fn decode(request: &RpcRequest) -> Result<Self, CallDecodeError> {
        let method = request.method.as_str();
        match method {
            NET_VERSION => return Ok(Call::NetVersion),
            ETH_CHAIN_ID => return Ok(Call::ChainId),
            ETH_SEND_RAW_TRANSACTION
            | ETH_SEND_PRIVATE_TRANSACTION
            | ETH_CANCEL_PRIVATE_TRANSACTION
            | ETH_GET_TRANSACTION_COUNT
            | ETH_GET_TRANSACTION_RECEIPT
            | ETH_CALL
            | ETH_GET_BALANCE => {}
            _ => return Ok(Call::Generic),
        }

        let params = request
            .positional_params()
            .ok_or(CallDecodeError::NotPositional)?;
        match method {
            ETH_SEND_RAW_TRANSACTION => Ok(Call::SendRawTransaction {
                raw: string_param(params, 0)?,
            }),
            ETH_SEND_PRIVATE_TRANSACTION => {
                let value = param(params, 0)?;
                let body = PrivateTxParams::deserialize(value).map_err(|e| invalid(0, e))?;
                Ok(Call::SendPrivateTransaction(body))
            }
            ETH_CANCEL_PRIVATE_TRANSACTION => {
                let value = param(params, 0)?;
                let body = CancelParams::deserialize(value).map_err(|e| invalid(0, e))?;
                Ok(Call::CancelPrivateTransaction {
                    tx_hash: body.tx_hash,
                })
            }
            ETH_GET_TRANSACTION_COUNT => Ok(Call::GetTransactionCount {
                address: address_param(params, 0)?,
            }),
            ETH_GET_TRANSACTION_RECEIPT => {
                let raw = string_param(params, 0)?;
                let tx_hash = B256::from_str(&raw).map_err(|e| invalid(0, e))?;
                Ok(Call::GetTransactionReceipt { tx_hash })
            }
            ETH_CALL => {
                let call = param(params, 0)?;
                let Some(object) = call.as_object() else {
                    return Err(invalid(0, "expected a call object"));
                };
                Ok(Call::EthCall {
                    to: optional_address(object.get("to"), 0)?,
                    from: optional_address(object.get("from"), 0)?,
                })
            }
            ETH_GET_BALANCE => Ok(Call::GetBalance {
                address: address_param(params, 0)?,
            }),
            _ => Ok(Call::Generic),
        }
    }
}

fn invalid(index: usize, reason: impl ToString) -> CallDecodeError {
    CallDecodeError::InvalidParam {
        index,
        reason: reason.to_string(),
    }
}

fn param(params: &[Value], index: usize) -> Result<&Value, CallDecodeError> {
    params
        .get(index)
        .filter(|v| !v.is_null())
        .ok_or(CallDecodeError::MissingParam { index })
}

fn string_param(params: &[Value], index: usize) -> Result<String, CallDecodeError> {
    param(params, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(index, "expected a string"))
}

fn address_param(params: &[Value], index: usize) -> Result<Address, CallDecodeError> {
    let raw = string_param(params, index)?;
    Address::from_str(&raw).map_err(|e| invalid(index, e))
}

fn optional_address(value: Option<&Value>, index: usize) -> Result<Option<Address>, CallDecodeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Address::from_str(raw)
            .map(Some)
            .map_err(|e| invalid(index, e)),
        Some(_) => Err(invalid(index, "expected an address string")),
    }
}
