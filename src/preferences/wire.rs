// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON shape of privacy preferences as exchanged with the relay.
//!
//! The same shape is accepted inside a client's `eth_sendPrivateTransaction`
//! body.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::RoutingPreferences;

/// One refund recipient and the share of the refund it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundConfig {
    pub address: Address,
    pub percent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builders: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_mempool: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mempool_rpc: Option<String>,
    #[serde(default, rename = "allowBOB", skip_serializing_if = "std::ops::Not::not")]
    pub allow_bob: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refund: Vec<RefundConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPrivacyPreferences {
    #[serde(default)]
    pub fast: bool,
    #[serde(default)]
    pub privacy: PrivacyWire,
    #[serde(default)]
    pub validity: ValidityWire,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub can_revert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_timeout: Option<u64>,
}

impl From<&RoutingPreferences> for TxPrivacyPreferences {
    fn from(prefs: &RoutingPreferences) -> Self {
        Self {
            fast: prefs.fast,
            privacy: PrivacyWire {
                hints: prefs.privacy_hints.clone(),
                builders: prefs.target_builders.clone(),
                use_mempool: prefs.use_mempool,
                mempool_rpc: prefs.mempool_rpc.as_ref().map(|u| u.to_string()),
                allow_bob: prefs.allow_bob,
            },
            validity: ValidityWire {
                refund: prefs.refund.clone(),
            },
            can_revert: prefs.can_revert,
            auction_timeout: prefs.auction_timeout,
        }
    }
}
