// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PROXY_URL` | Public node JSON-RPC endpoint | `http://127.0.0.1:8545` |
//! | `RELAY_URL` | Private relay JSON-RPC endpoint | `https://relay.flashbots.net` |
//! | `RELAY_SIGNING_KEY` | Hex secp256k1 key signing relay requests | Random per process |
//! | `TX_STATUS_API_URL` | Relay status API base URL | `https://protect.flashbots.net/tx` |
//! | `REDIS_URL` | Shared state store | In-memory store |
//! | `PRESETS_FILE` | JSON object `origin -> "/path?query"` | None |
//! | `KNOWN_BUILDERS` | Comma-separated builder names | Built-in list |
//! | `UPSTREAM_TIMEOUT_MS` | Timeout for every node, relay and store call | `10000` |
//! | `CHAIN_ID` | Chain id answered for `net_version` / `eth_chainId` | `1` |
//! | `DOCS_URL` | Redirect target for bare `GET` | `/docs` |
//! | `EXTRA_SANCTIONED_ADDRESSES` | Comma-separated jurisdictional additions | None |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use tracing::warn;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PROXY_URL_ENV: &str = "PROXY_URL";
pub const RELAY_URL_ENV: &str = "RELAY_URL";
/// Never logged.
pub const RELAY_SIGNING_KEY_ENV: &str = "RELAY_SIGNING_KEY";
pub const TX_STATUS_API_URL_ENV: &str = "TX_STATUS_API_URL";
pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const PRESETS_FILE_ENV: &str = "PRESETS_FILE";
pub const KNOWN_BUILDERS_ENV: &str = "KNOWN_BUILDERS";
pub const UPSTREAM_TIMEOUT_MS_ENV: &str = "UPSTREAM_TIMEOUT_MS";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const DOCS_URL_ENV: &str = "DOCS_URL";
pub const EXTRA_SANCTIONED_ADDRESSES_ENV: &str = "EXTRA_SANCTIONED_ADDRESSES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_RELAY_URL: &str = "https://relay.flashbots.net";
const DEFAULT_TX_STATUS_API_URL: &str = "https://protect.flashbots.net/tx";
const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;

/// Builders targeted by the fast path and accepted in `builder` params.
pub const DEFAULT_BUILDERS: &[&str] = &[
    "flashbots",
    "f1b.io",
    "rsync",
    "beaverbuild.org",
    "builder0x69",
    "Titan",
    "EigenPhi",
    "boba-builder",
    "Gambit Labs",
    "payload",
    "Loki",
    "BuildAI",
    "JetBuilder",
    "tbuilder",
    "penguinbuild",
    "bobthebuilder",
    "BTCS",
    "bloXroute",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} is not a valid number: `{value}`")]
    InvalidNumber { var: &'static str, value: String },

    #[error("RELAY_SIGNING_KEY is not a valid secp256k1 key")]
    InvalidSigningKey,

    #[error("EXTRA_SANCTIONED_ADDRESSES contains an invalid address: `{0}`")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// No `Debug`: it would print the signing key.
#[derive(Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub proxy_url: Url,
    pub relay_url: Url,
    relay_signing_key: Option<String>,
    pub tx_status_api_url: Url,
    pub redis_url: Option<String>,
    pub presets_file: Option<PathBuf>,
    pub known_builders: Vec<String>,
    pub upstream_timeout: Duration,
    pub chain_id: u64,
    pub docs_url: String,
    pub extra_sanctioned: Vec<Address>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let known_builders = match get(KNOWN_BUILDERS_ENV) {
            Some(raw) => split_list(&raw),
            None => DEFAULT_BUILDERS.iter().map(|b| b.to_string()).collect(),
        };

        let extra_sanctioned = get(EXTRA_SANCTIONED_ADDRESSES_ENV)
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(|a| Address::from_str(&a).map_err(|_| ConfigError::InvalidAddress(a)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: number(PORT_ENV, get(PORT_ENV), 8080)?,
            proxy_url: url(PROXY_URL_ENV, get(PROXY_URL_ENV), DEFAULT_PROXY_URL)?,
            relay_url: url(RELAY_URL_ENV, get(RELAY_URL_ENV), DEFAULT_RELAY_URL)?,
            relay_signing_key: get(RELAY_SIGNING_KEY_ENV),
            tx_status_api_url: url(
                TX_STATUS_API_URL_ENV,
                get(TX_STATUS_API_URL_ENV),
                DEFAULT_TX_STATUS_API_URL,
            )?,
            redis_url: get(REDIS_URL_ENV),
            presets_file: get(PRESETS_FILE_ENV).map(PathBuf::from),
            known_builders,
            upstream_timeout: Duration::from_millis(number(
                UPSTREAM_TIMEOUT_MS_ENV,
                get(UPSTREAM_TIMEOUT_MS_ENV),
                DEFAULT_UPSTREAM_TIMEOUT_MS,
            )?),
            chain_id: number(CHAIN_ID_ENV, get(CHAIN_ID_ENV), 1)?,
            docs_url: get(DOCS_URL_ENV).unwrap_or_else(|| "/docs".to_string()),
            extra_sanctioned,
            log_format,
        })
    }

    /// Signer for relay requests; a random key is used when none is configured.
    pub fn relay_signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        match &self.relay_signing_key {
            Some(key) => PrivateKeySigner::from_str(key.trim_start_matches("0x"))
                .map_err(|_| ConfigError::InvalidSigningKey),
            None => {
                warn!(
                    "{RELAY_SIGNING_KEY_ENV} not set, using an ephemeral relay signing key; \
                     relay reputation will not carry over restarts"
                );
                Ok(PrivateKeySigner::random())
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn url(var: &'static str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.as_deref().unwrap_or(default);
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })
}

fn number<T: FromStr>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}
