// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::background::JobQueue;
use crate::blockchain::NodeClient;
use crate::compliance::ComplianceFilter;
use crate::config::GatewayConfig;
use crate::dispatcher::Dispatcher;
use crate::nonce_fix::NonceFix;
use crate::preferences::{PreferenceParser, Presets};
use crate::relay::{RelayClient, StatusPoller};
use crate::router::TransactionRouter;
use crate::storage::{RouterState, StateStore};

/// External services the gateway talks to.
pub struct Collaborators {
    pub node: Arc<dyn NodeClient>,
    pub relay: Arc<dyn RelayClient>,
    pub status: Arc<dyn StatusPoller>,
    pub store: Arc<dyn StateStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn StateStore>,
    pub docs_url: Arc<str>,
}

impl AppState {
    pub fn new(
        config: &GatewayConfig,
        collaborators: Collaborators,
        presets: Presets,
        jobs: JobQueue,
    ) -> Self {
        let Collaborators {
            node,
            relay,
            status,
            store,
        } = collaborators;
        let router_state = RouterState::new(store.clone());

        let nonce_fix = Arc::new(NonceFix::new(
            router_state.clone(),
            node.clone(),
            status.clone(),
            jobs.clone(),
        ));
        let router = Arc::new(TransactionRouter::new(
            router_state,
            node.clone(),
            relay,
            status,
            Arc::new(ComplianceFilter::new(config.extra_sanctioned.iter().copied())),
            nonce_fix.clone(),
            jobs,
        ));
        let parser = Arc::new(PreferenceParser::new(config.known_builders.clone(), presets));

        Self {
            dispatcher: Arc::new(Dispatcher::new(
                router,
                nonce_fix,
                node,
                parser,
                config.chain_id,
            )),
            store,
            docs_url: Arc::from(config.docs_url.as_str()),
        }
    }
}
