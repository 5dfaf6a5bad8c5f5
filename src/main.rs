// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use protect_rpc::{
    api::router,
    audit::TracingAuditSink,
    background::{JobQueue, JobWorker, DEFAULT_QUEUE_CAPACITY},
    blockchain::HttpNodeClient,
    config::{GatewayConfig, LogFormat},
    preferences::Presets,
    relay::{FlashbotsRelay, HttpStatusPoller},
    state::{AppState, Collaborators},
    storage::{MemoryStore, RedisStore, RouterState, StateStore},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let store: Arc<dyn StateStore> = match &config.redis_url {
        Some(url) => match RedisStore::connect(url, config.upstream_timeout).await {
            Ok(store) => {
                info!("Using Redis state store");
                Arc::new(store)
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to Redis");
                std::process::exit(1);
            }
        },
        None => {
            warn!("REDIS_URL not set, using in-memory state; do not run more than one instance");
            Arc::new(MemoryStore::default())
        }
    };

    let presets = match &config.presets_file {
        Some(path) => Presets::load(path, &config.known_builders).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "Failed to load presets, continuing without");
            Presets::default()
        }),
        None => Presets::default(),
    };

    let signer = config
        .relay_signer()
        .expect("Failed to load relay signing key");
    info!(address = %signer.address(), "Relay signing identity");

    let node = HttpNodeClient::new(config.proxy_url.clone(), config.upstream_timeout)
        .expect("Failed to build node client");
    let relay = FlashbotsRelay::new(config.relay_url.clone(), signer, config.upstream_timeout)
        .expect("Failed to build relay client");
    let status = HttpStatusPoller::new(config.tx_status_api_url.clone(), config.upstream_timeout)
        .expect("Failed to build status client");

    let (jobs, job_rx) = JobQueue::new(DEFAULT_QUEUE_CAPACITY);
    let shutdown = CancellationToken::new();
    let worker = JobWorker::new(
        job_rx,
        RouterState::new(store.clone()),
        Arc::new(TracingAuditSink),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let state = AppState::new(
        &config,
        Collaborators {
            node: Arc::new(node),
            relay: Arc::new(relay),
            status: Arc::new(status),
            store,
        },
        presets,
        jobs,
    );
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    info!(
        %addr,
        proxy = %config.proxy_url,
        relay = %config.relay_url,
        chain_id = config.chain_id,
        "Protect RPC listening (docs at /docs)"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server failed");
    }

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "Background worker panicked");
    }
    info!("Shut down");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
