// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Dispatcher
//!
//! Classifies each decoded call and either answers it locally, hands it to
//! the [`TransactionRouter`], or proxies it to the node.
//!
//! ## Special Cases
//!
//! | Method | Handling |
//! |--------|----------|
//! | `eth_sendRawTransaction` | transaction router |
//! | `eth_sendPrivateTransaction` | transaction router, always private |
//! | `eth_cancelPrivateTransaction` | relay cancellation |
//! | `eth_getTransactionCount` | nonce-fix intercept, else proxy |
//! | `eth_getTransactionReceipt` | proxy; a `null` receipt feeds the nonce fix |
//! | `eth_call` | self-test contract answered locally; whitehat balance override |
//! | `eth_getBalance` | fixed balance in whitehat mode |
//! | `net_version`, `eth_chainId` | answered from the configured chain id |
//!
//! Everything else is proxied unchanged.
//!
//! ## Batches
//!
//! Batch elements run concurrently, one task each. Results are joined per
//! slot, so the response array keeps the input order regardless of which
//! upstream call finishes first.

use std::sync::Arc;

use alloy::primitives::{address, Address};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::blockchain::NodeClient;
use crate::error::{ErrorKind, GatewayError};
use crate::nonce_fix::NonceFix;
use crate::preferences::{PreferenceParser, RequestParams};
use crate::router::{Routed, Submission, TransactionRouter};
use crate::rpc::{Call, PrivateTxParams, RpcRequest, RpcResponse, JSONRPC_VERSION};

/// Health-check contract wallets call to detect the gateway.
pub const SELF_TEST_CONTRACT: Address = address!("0xf1a54b075fb71768ac31b33fd7c61ad8f9f7dd18");

/// Balance-checker contract whose reads are rewritten in whitehat mode.
pub const BALANCE_CHECKER_CONTRACT: Address =
    address!("0xb1f8e55c7f64d203c1400b9d8555d050f94adf39");

/// 100 ETH in wei.
pub const WHITEHAT_BALANCE: &str = "0x56bc75e2d63100000";

const SELF_TEST_RESULT: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

/// Local answer or upstream response for one call.
#[derive(Debug, Clone, PartialEq)]
enum Reply {
    Result(Value),
    Upstream(RpcResponse),
}

/// One answered call and, if it failed, the failure kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub response: RpcResponse,
    pub error_kind: Option<ErrorKind>,
}

pub struct Dispatcher {
    router: Arc<TransactionRouter>,
    nonce_fix: Arc<NonceFix>,
    node: Arc<dyn NodeClient>,
    parser: Arc<PreferenceParser>,
    chain_id: u64,
}

impl Dispatcher {
    pub fn new(
        router: Arc<TransactionRouter>,
        nonce_fix: Arc<NonceFix>,
        node: Arc<dyn NodeClient>,
        parser: Arc<PreferenceParser>,
        chain_id: u64,
    ) -> Self {
        Self {
            router,
            nonce_fix,
            node,
            parser,
            chain_id,
        }
    }

    pub fn parser(&self) -> &PreferenceParser {
        &self.parser
    }

    pub async fn dispatch(&self, request: RpcRequest, params: &RequestParams) -> CallOutcome {
        let id = request.id.clone();
        match self.handle(&request, params).await {
            Ok(Reply::Result(value)) => CallOutcome {
                response: RpcResponse::result(id, value),
                error_kind: None,
            },
            Ok(Reply::Upstream(mut response)) => {
                response.id = id;
                response.jsonrpc = JSONRPC_VERSION.to_string();
                CallOutcome {
                    response,
                    error_kind: None,
                }
            }
            Err(err) => {
                debug!(method = %request.method, error = %err, "Call failed");
                CallOutcome {
                    error_kind: Some(err.kind),
                    response: err.into_rpc_response(id),
                }
            }
        }
    }

    /// Dispatch every element concurrently; responses keep input order.
    pub async fn dispatch_batch(
        self: &Arc<Self>,
        elements: Vec<Value>,
        params: Arc<RequestParams>,
    ) -> Vec<RpcResponse> {
        let mut slots = Vec::with_capacity(elements.len());
        for element in elements {
            let id = element.get("id").cloned().unwrap_or(Value::Null);
            let dispatcher = Arc::clone(self);
            let params = Arc::clone(&params);
            let task_id = id.clone();
            let handle = tokio::spawn(async move {
                match serde_json::from_value::<RpcRequest>(element) {
                    Ok(request) => dispatcher.dispatch(request, &params).await.response,
                    Err(e) => GatewayError::invalid_request(format!("invalid request: {e}"))
                        .into_rpc_response(task_id),
                }
            });
            slots.push((id, handle));
        }

        let mut responses = Vec::with_capacity(slots.len());
        for (id, handle) in slots {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Batch element task failed");
                    GatewayError::internal().into_rpc_response(id)
                }
            };
            responses.push(response);
        }
        responses
    }

    async fn handle(
        &self,
        request: &RpcRequest,
        params: &RequestParams,
    ) -> Result<Reply, GatewayError> {
        let call = Call::decode(request).map_err(|e| GatewayError::invalid_params(e.to_string()))?;
        let whitehat = params.whitehat_bundle.is_some();

        match call {
            Call::SendRawTransaction { raw } => {
                let submission = Submission {
                    id: &request.id,
                    raw: &raw,
                    preferences: &params.preferences,
                    whitehat_bundle: params.whitehat_bundle.as_deref(),
                    max_block_number: None,
                    force_private: false,
                };
                self.route(&submission).await
            }
            Call::SendPrivateTransaction(body) => self.send_private(request, body, params).await,
            Call::CancelPrivateTransaction { tx_hash } => {
                self.router.cancel_private_transaction(tx_hash).await?;
                Ok(Reply::Result(Value::Bool(true)))
            }
            Call::GetTransactionCount { address } => {
                match self.nonce_fix.intercept_transaction_count(&address).await {
                    Ok(Some(masked)) => return Ok(Reply::Result(json!(format!("{masked:#x}")))),
                    Ok(None) => {}
                    Err(e) => warn!(address = %address, error = %e, "Nonce fix lookup failed"),
                }
                self.proxy(request, params).await
            }
            Call::GetTransactionReceipt { tx_hash } => {
                let reply = self.proxy(request, params).await?;
                if let Reply::Upstream(response) = &reply {
                    if response.is_null_result() {
                        if let Err(e) = self.nonce_fix.on_null_receipt(tx_hash).await {
                            warn!(tx_hash = %tx_hash, error = %e, "Nonce fix reconciliation failed");
                        }
                    }
                }
                Ok(reply)
            }
            Call::EthCall { to: Some(to), .. } if to == SELF_TEST_CONTRACT => {
                debug!("Answering self-test call");
                Ok(Reply::Result(json!(SELF_TEST_RESULT)))
            }
            Call::EthCall {
                to: Some(to),
                from: Some(from),
            } if whitehat && to == BALANCE_CHECKER_CONTRACT => {
                let rewritten = with_balance_override(request, from);
                self.proxy(&rewritten, params).await
            }
            Call::GetBalance { address } if whitehat => {
                debug!(address = %address, "Answering whitehat balance");
                Ok(Reply::Result(json!(WHITEHAT_BALANCE)))
            }
            Call::NetVersion => Ok(Reply::Result(json!(self.chain_id.to_string()))),
            Call::ChainId => Ok(Reply::Result(json!(format!("{:#x}", self.chain_id)))),
            Call::EthCall { .. } | Call::GetBalance { .. } | Call::Generic => {
                self.proxy(request, params).await
            }
        }
    }

    async fn send_private(
        &self,
        request: &RpcRequest,
        body: PrivateTxParams,
        params: &RequestParams,
    ) -> Result<Reply, GatewayError> {
        let preferences = match &body.preferences {
            Some(overrides) => self
                .parser
                .apply_body_overrides(&params.preferences, overrides)?,
            None => params.preferences.clone(),
        };
        let max_block_number = body
            .max_block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?;

        let submission = Submission {
            id: &request.id,
            raw: &body.tx,
            preferences: &preferences,
            whitehat_bundle: params.whitehat_bundle.as_deref(),
            max_block_number,
            force_private: true,
        };
        self.route(&submission).await
    }

    async fn route(&self, submission: &Submission<'_>) -> Result<Reply, GatewayError> {
        match self.router.send_raw_transaction(submission).await? {
            Routed::Hash(hash) => Ok(Reply::Result(json!(format!("{hash:#x}")))),
            Routed::Mempool(response) => Ok(Reply::Upstream(response)),
        }
    }

    async fn proxy(
        &self,
        request: &RpcRequest,
        params: &RequestParams,
    ) -> Result<Reply, GatewayError> {
        let response = self
            .node
            .forward(request, params.proxy_url.as_ref())
            .await?;
        Ok(Reply::Upstream(response))
    }
}

/// Rewrite an `eth_call` so `from` appears funded with [`WHITEHAT_BALANCE`].
fn with_balance_override(request: &RpcRequest, from: Address) -> RpcRequest {
    let call = request.params.get(0).cloned().unwrap_or(Value::Null);
    let block = request
        .params
        .get(1)
        .cloned()
        .unwrap_or_else(|| json!("latest"));
    let overrides = json!({ format!("{from:#x}"): { "balance": WHITEHAT_BALANCE } });
    RpcRequest::new(request.id.clone(), request.method.clone(), vec![call, block, overrides])
}

/// Decimal or `0x` hex block number.
fn parse_quantity(raw: &str) -> Result<u64, GatewayError> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|_| GatewayError::invalid_params(format!("invalid maxBlockNumber `{raw}`")))
}
