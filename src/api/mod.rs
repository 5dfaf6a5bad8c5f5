// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface.
//!
//! JSON-RPC is served on `/` and on the `/fast` path family; both accept a
//! single call or a batch. Bare `GET` on those paths redirects to the docs.

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    rpc::{RpcErrorObject, RpcRequest, RpcResponse},
    state::AppState,
};

pub mod health;
pub mod rpc;

pub fn router(state: AppState) -> Router {
    let rpc_routes = get(rpc::redirect_to_docs)
        .post(rpc::handle_rpc)
        .options(rpc::options);

    let routes = Router::new()
        .route("/", rpc_routes.clone())
        .route("/fast", rpc_routes.clone())
        .route("/fast/{*rest}", rpc_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        rpc::handle_rpc,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RpcRequest,
            RpcResponse,
            RpcErrorObject,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "JSON-RPC", description = "Protected Ethereum JSON-RPC"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::signers::local::PrivateKeySigner;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::background::JobQueue;
    use crate::blockchain::NodeError;
    use crate::config::GatewayConfig;
    use crate::preferences::Presets;
    use crate::relay::StatusError;
    use crate::state::Collaborators;
    use crate::storage::{MemoryStore, StateStore, StoreError};
    use crate::testing::{signed_tx, test_signer, FakeNode, FakeRelay, FakeStatus, TxSpec};

    struct TestApp {
        app: Router,
        node: Arc<FakeNode>,
        relay: Arc<FakeRelay>,
        status: Arc<FakeStatus>,
        _rx: tokio::sync::mpsc::Receiver<crate::background::Job>,
    }

    fn app_with(env: Vec<(&'static str, String)>, store: Arc<dyn StateStore>) -> TestApp {
        let config = GatewayConfig::from_lookup(|key| {
            env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
        })
        .unwrap();
        let node = Arc::new(FakeNode::default());
        let relay = Arc::new(FakeRelay::default());
        let status = Arc::new(FakeStatus::default());
        let (jobs, rx) = JobQueue::new(64);
        let state = AppState::new(
            &config,
            Collaborators {
                node: node.clone(),
                relay: relay.clone(),
                status: status.clone(),
                store,
            },
            Presets::default(),
            jobs,
        );
        TestApp {
            app: router(state),
            node,
            relay,
            status,
            _rx: rx,
        }
    }

    fn test_app() -> TestApp {
        app_with(Vec::new(), Arc::new(MemoryStore::default()))
    }

    async fn post(app: &Router, uri: &str, body: &str) -> Response {
        app.clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn send_raw(id: u64, raw: &str) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": "eth_sendRawTransaction", "params": [raw]})
            .to_string()
    }

    fn protected_tx(signer: &PrivateKeySigner) -> (String, alloy::primitives::B256) {
        signed_tx(signer, TxSpec::default())
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let _ = test_app().app.into_make_service();
    }

    #[tokio::test]
    async fn unparseable_body_is_bad_request() {
        let t = test_app();
        let response = post(&t.app, "/", "{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn request_without_method_is_invalid() {
        let t = test_app();
        let response = post(&t.app, "/", r#"{"jsonrpc":"2.0","id":9}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["id"], 9);
    }

    #[tokio::test]
    async fn proxied_call_keeps_client_id() {
        let t = test_app();
        let response = post(
            &t.app,
            "/",
            r#"{"jsonrpc":"2.0","id":"abc","method":"eth_blockNumber","params":[]}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], "abc");
        assert_eq!(body["result"], "eth_blockNumber-result");
        assert_eq!(t.node.forwarded_methods(), vec!["eth_blockNumber"]);
    }

    #[tokio::test]
    async fn protected_transaction_goes_to_relay() {
        let t = test_app();
        let (raw, hash) = protected_tx(&test_signer(3));

        let response = post(&t.app, "/fast", &send_raw(1, &raw)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["result"], format!("{hash:#x}"));

        let sent = t.relay.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tx, raw);
        assert!(sent[0].preferences.fast);
        assert!(t.node.forwarded_methods().is_empty());
    }

    #[tokio::test]
    async fn named_and_null_params_are_proxied() {
        let t = test_app();
        let response = post(
            &t.app,
            "/",
            r#"{"jsonrpc":"2.0","id":1,"method":"custom_method","params":{"a":1}}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["result"], "custom_method-result");
        assert_eq!(t.node.forwarded()[0].0.params, json!({"a": 1}));

        let response = post(
            &t.app,
            "/",
            r#"{"jsonrpc":"2.0","id":2,"method":"eth_blockNumber","params":null}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            t.node.forwarded_methods(),
            vec!["custom_method", "eth_blockNumber"]
        );
    }

    #[tokio::test]
    async fn node_timeout_is_internal_error() {
        let t = test_app();
        t.node.fail_with(NodeError::Timeout);

        let response = post(
            &t.app,
            "/",
            r#"{"jsonrpc":"2.0","id":7,"method":"eth_blockNumber","params":[]}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["error"]["code"], -32603);
        assert_eq!(body["error"]["message"], "upstream request timed out");
    }

    #[tokio::test]
    async fn status_failure_on_resubmission_is_internal_error() {
        let t = test_app();
        let (raw, _) = protected_tx(&test_signer(6));
        let first = post(&t.app, "/", &send_raw(1, &raw)).await;
        assert_eq!(first.status(), StatusCode::OK);

        t.status.fail_with(StatusError::Timeout);
        let response = post(&t.app, "/", &send_raw(2, &raw)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["id"], 2);
        assert_eq!(body["error"]["message"], "relay status unavailable");
        assert_eq!(t.relay.sent().len(), 1);
    }

    #[tokio::test]
    async fn invalid_hint_is_rejected_with_call_id() {
        let t = test_app();
        let (raw, _) = protected_tx(&test_signer(3));

        let response = post(&t.app, "/?hint=everything", &send_raw(4, &raw)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["id"], 4);
        assert_eq!(body["error"]["code"], -32600);
        assert!(t.relay.sent().is_empty());
    }

    #[tokio::test]
    async fn sanctioned_sender_is_unauthorized() {
        let signer = test_signer(5);
        let t = app_with(
            vec![(
                crate::config::EXTRA_SANCTIONED_ADDRESSES_ENV,
                format!("{:#x}", signer.address()),
            )],
            Arc::new(MemoryStore::default()),
        );
        let (raw, _) = protected_tx(&signer);

        let response = post(&t.app, "/", &send_raw(1, &raw)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "blocked");
        assert!(t.relay.sent().is_empty());
    }

    #[tokio::test]
    async fn batch_answers_in_order_with_ok_status() {
        let t = test_app();
        t.node.set_delay("eth_blockNumber", Duration::from_millis(50));

        let body = json!([
            {"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber", "params": []},
            {"jsonrpc": "2.0", "id": 2, "method": "eth_chainId", "params": []},
            {"jsonrpc": "2.0", "id": 3},
            {"jsonrpc": "2.0", "id": 4, "method": "eth_sendRawTransaction", "params": ["0xzz"]}
        ]);
        let response = post(&t.app, "/", &body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let items = body.as_array().unwrap();
        let ids: Vec<_> = items.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(items[0]["result"], "eth_blockNumber-result");
        assert_eq!(items[1]["result"], "0x1");
        assert_eq!(items[2]["error"]["code"], -32600);
        assert_eq!(items[3]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn empty_batch_is_invalid() {
        let t = test_app();
        let response = post(&t.app, "/", "[]").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn get_redirects_to_docs() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/docs");
    }

    #[tokio::test]
    async fn plain_options_is_ok() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/fast")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    struct DownStore;

    #[async_trait]
    impl StateStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn push_front(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn list(&self, _key: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn readiness_reports_store_outage() {
        let t = app_with(Vec::new(), Arc::new(DownStore));
        let response = t
            .app
            .clone()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["state_store"], "unavailable");
    }

    #[tokio::test]
    async fn readiness_ok_with_memory_store() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
