// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC endpoint handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, GatewayError};
use crate::preferences::ORIGIN_HEADER;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::state::AppState;

/// Handle a single JSON-RPC call or a batch.
///
/// Single calls answer with the status of their failure kind (200 on
/// success); batches always answer 200 with per-element errors inside.
#[utoipa::path(
    post,
    path = "/",
    tag = "JSON-RPC",
    request_body = RpcRequest,
    params(
        ("hint" = Option<Vec<String>>, Query, description = "Auction hints to share"),
        ("builder" = Option<Vec<String>>, Query, description = "Target builders"),
        ("refund" = Option<Vec<String>>, Query, description = "Refund split as `address:percent`"),
        ("originId" = Option<String>, Query, description = "Origin tag"),
        ("bundle" = Option<String>, Query, description = "Collect transactions into a whitehat bundle"),
    ),
    responses(
        (status = 200, description = "JSON-RPC response (may carry a JSON-RPC error)", body = RpcResponse),
        (status = 400, description = "Unparseable body or invalid parameters", body = RpcResponse),
        (status = 401, description = "Sender blocked", body = RpcResponse),
        (status = 500, description = "Upstream failure", body = RpcResponse)
    )
)]
pub async fn handle_rpc(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return GatewayError::parse_error(format!("parse error: {e}")).into_response(),
    };

    let origin = headers.get(ORIGIN_HEADER).and_then(|v| v.to_str().ok());
    let params = state
        .dispatcher
        .parser()
        .parse(uri.path(), uri.query(), origin);

    match payload {
        Value::Array(elements) => {
            if elements.is_empty() {
                return GatewayError::invalid_request("empty batch").into_response();
            }
            let params = match params {
                Ok(params) => Arc::new(params),
                Err(e) => return GatewayError::from(e).into_response(),
            };
            debug!(size = elements.len(), "Dispatching batch");
            let responses = state.dispatcher.dispatch_batch(elements, params).await;
            (StatusCode::OK, Json(responses)).into_response()
        }
        single => {
            let id = single.get("id").cloned().unwrap_or(Value::Null);
            let request: RpcRequest = match serde_json::from_value(single) {
                Ok(request) => request,
                Err(e) => {
                    let err = GatewayError::invalid_request(format!("invalid request: {e}"));
                    return (err.status(), Json(err.into_rpc_response(id))).into_response();
                }
            };
            let params = match params {
                Ok(params) => params,
                Err(e) => {
                    let err = GatewayError::from(e);
                    return (err.status(), Json(err.into_rpc_response(id))).into_response();
                }
            };

            let outcome = state.dispatcher.dispatch(request, &params).await;
            let status = outcome
                .error_kind
                .map(ErrorKind::status)
                .unwrap_or(StatusCode::OK);
            (status, Json(outcome.response)).into_response()
        }
    }
}

/// Bare `GET` sends browsers to the documentation.
pub async fn redirect_to_docs(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.docs_url)
}

/// Plain `OPTIONS` (not a CORS preflight) still answers 200.
pub async fn options() -> StatusCode {
    StatusCode::OK
}
