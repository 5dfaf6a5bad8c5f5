// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Routing Preferences
//!
//! Turns the request URL (path + query), an optional trusted origin header
//! and an optional body-embedded preference object into one immutable
//! [`RoutingPreferences`] value per call.
//!
//! ## Query Parameters
//!
//! | Key | Repeats | Meaning |
//! |-----|---------|---------|
//! | `hint` | yes | auction hint, must be in [`ALLOWED_HINTS`] |
//! | `builder` | yes | target builder, unknown names are dropped |
//! | `refund` | yes | `address:percent`, total at most 100 |
//! | `originid` | no | free-form origin tag |
//! | `usemempool`, `canrevert`, `allowbob` | no | booleans |
//! | `mempoolrpc` | no | URL, scheme forced to https |
//! | `blockrange`, `auctiontimeout` | no | unsigned integers |
//! | `bundle` | no | whitehat bundle collection id |
//! | `url` | no | per-call proxy override |
//!
//! Keys are matched case-insensitively. A leading `/fast` path segment sets
//! `fast` and targets every known builder.

use std::str::FromStr;

use alloy::primitives::Address;
use url::Url;

use crate::error::GatewayError;

pub mod presets;
pub mod wire;

pub use presets::Presets;
pub use wire::{RefundConfig, TxPrivacyPreferences};

/// Hints applied when the client does not pick any.
pub const DEFAULT_HINTS: [&str; 2] = ["hash", "special_logs"];

/// Auction hint kinds a client may request.
pub const ALLOWED_HINTS: &[&str] = &[
    "hash",
    "contract_address",
    "function_selector",
    "logs",
    "calldata",
    "default_logs",
    "special_logs",
    "tx_hash",
    "full",
];

/// Header used to select a server-side preset. Never trusted for anything else.
pub const ORIGIN_HEADER: &str = "x-rpc-origin";

const FAST_SEGMENT: &str = "fast";
const MAX_ORIGIN_ID_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    #[error("incorrect hint query: empty")]
    EmptyHint,

    #[error("incorrect hint query: unknown hint `{0}`")]
    IncorrectHint(String),

    #[error("incorrect refund query: expected `address:percent`, got `{0}`")]
    IncorrectRefund(String),

    #[error("incorrect refund address: `{0}`")]
    IncorrectRefundAddress(String),

    #[error("incorrect refund percentage: `{0}` must be between 0 and 100 exclusive")]
    IncorrectRefundPercentage(String),

    #[error("incorrect refund total percentage: {0} exceeds 100")]
    IncorrectRefundTotalPercentage(u64),

    #[error("incorrect mempoolrpc url: {0}")]
    IncorrectMempoolUrl(String),

    #[error("incorrect url override: {0}")]
    IncorrectProxyUrl(String),

    #[error("incorrect originId: longer than 255 characters")]
    IncorrectOriginId,

    #[error("incorrect {param} query: `{value}` is not a boolean")]
    IncorrectBool { param: &'static str, value: String },

    #[error("incorrect blockrange query: `{0}`")]
    IncorrectBlockRange(String),

    #[error("incorrect auctiontimeout query: `{0}`")]
    IncorrectAuctionTimeout(String),
}

impl From<PreferenceError> for GatewayError {
    fn from(err: PreferenceError) -> Self {
        GatewayError::invalid_request(err.to_string())
    }
}

/// Normalized routing policy for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPreferences {
    pub origin_id: String,
    pub fast: bool,
    pub privacy_hints: Vec<String>,
    /// True when hints came from the client rather than [`DEFAULT_HINTS`].
    pub pref_was_set: bool,
    /// Empty means the relay's default builder set.
    pub target_builders: Vec<String>,
    pub refund: Vec<RefundConfig>,
    pub use_mempool: bool,
    pub can_revert: bool,
    pub mempool_rpc: Option<Url>,
    pub allow_bob: bool,
    pub block_range: Option<u64>,
    pub auction_timeout: Option<u64>,
}

impl Default for RoutingPreferences {
    fn default() -> Self {
        Self {
            origin_id: String::new(),
            fast: false,
            privacy_hints: DEFAULT_HINTS.iter().map(|h| h.to_string()).collect(),
            pref_was_set: false,
            target_builders: Vec::new(),
            refund: Vec::new(),
            use_mempool: false,
            can_revert: false,
            mempool_rpc: None,
            allow_bob: false,
            block_range: None,
            auction_timeout: None,
        }
    }
}

/// Everything derived from the request URL and headers for one HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestParams {
    pub preferences: RoutingPreferences,
    /// Set when the `bundle` query parameter enables whitehat mode.
    pub whitehat_bundle: Option<String>,
    /// Per-call override of the node proxy endpoint.
    pub proxy_url: Option<Url>,
}

#[derive(Debug, Clone, Default)]
pub struct PreferenceParser {
    known_builders: Vec<String>,
    presets: Presets,
}

impl PreferenceParser {
    pub fn new(known_builders: Vec<String>, presets: Presets) -> Self {
        Self {
            known_builders,
            presets,
        }
    }

    /// Parse the per-call parameters.
    ///
    /// A matching preset replaces the whole preference set; URL preference
    /// values are not even looked at in that case.
    pub fn parse(
        &self,
        path: &str,
        query: Option<&str>,
        origin_header: Option<&str>,
    ) -> Result<RequestParams, PreferenceError> {
        let pairs = query_pairs(query.unwrap_or_default());

        let whitehat_bundle = last_value(&pairs, "bundle")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let proxy_url = last_value(&pairs, "url")
            .map(|raw| secure_url(raw).map_err(PreferenceError::IncorrectProxyUrl))
            .transpose()?;

        let preset = origin_header.and_then(|origin| self.presets.get(origin));
        let preferences = match preset {
            Some(preset) => preset.clone(),
            None => parse_preferences(path, &pairs, &self.known_builders)?,
        };

        Ok(RequestParams {
            preferences,
            whitehat_bundle,
            proxy_url,
        })
    }

    /// Replace URL-derived values with a body-embedded preference object.
    ///
    /// Flags, `mempoolRpc` and `auctionTimeout` are taken from the body as
    /// given. Lists keep the URL value when the body leaves them empty. The
    /// same validation rules as for query values apply.
    pub fn apply_body_overrides(
        &self,
        base: &RoutingPreferences,
        body: &TxPrivacyPreferences,
    ) -> Result<RoutingPreferences, PreferenceError> {
        let mut prefs = base.clone();

        if !body.privacy.hints.is_empty() {
            let hints = body
                .privacy
                .hints
                .iter()
                .map(|h| validate_hint(h))
                .collect::<Result<Vec<_>, _>>()?;
            prefs.privacy_hints = hints;
            prefs.pref_was_set = true;
        }

        if !body.validity.refund.is_empty() {
            for refund in &body.validity.refund {
                if !valid_percent(refund.percent) {
                    return Err(PreferenceError::IncorrectRefundPercentage(
                        refund.percent.to_string(),
                    ));
                }
            }
            check_refund_total(&body.validity.refund)?;
            prefs.refund = body.validity.refund.clone();
        }

        prefs.mempool_rpc = body
            .privacy
            .mempool_rpc
            .as_deref()
            .map(|raw| secure_url(raw).map_err(PreferenceError::IncorrectMempoolUrl))
            .transpose()?;
        prefs.fast = body.fast;
        prefs.can_revert = body.can_revert;
        prefs.use_mempool = body.privacy.use_mempool;
        prefs.allow_bob = body.privacy.allow_bob;
        prefs.auction_timeout = body.auction_timeout;

        if prefs.fast {
            prefs.target_builders = self.known_builders.clone();
        } else if !body.privacy.builders.is_empty() {
            let requested = body.privacy.builders.iter().map(String::as_str);
            prefs.target_builders = select_builders(requested, &self.known_builders);
        } else if base.fast {
            // The fast path's builder list does not outlive the fast flag.
            prefs.target_builders = Vec::new();
        }

        Ok(prefs)
    }
}

/// Parse preferences from a path and decoded query pairs.
pub fn parse_preferences(
    path: &str,
    pairs: &[(String, String)],
    known_builders: &[String],
) -> Result<RoutingPreferences, PreferenceError> {
    let mut prefs = RoutingPreferences {
        fast: is_fast_path(path),
        ..RoutingPreferences::default()
    };

    let hints: Vec<&str> = values(pairs, "hint").collect();
    if !hints.is_empty() {
        prefs.privacy_hints = hints
            .into_iter()
            .map(validate_hint)
            .collect::<Result<Vec<_>, _>>()?;
        prefs.pref_was_set = true;
    }

    prefs.target_builders = if prefs.fast {
        known_builders.to_vec()
    } else {
        select_builders(values(pairs, "builder"), known_builders)
    };

    let refunds = values(pairs, "refund")
        .map(parse_refund)
        .collect::<Result<Vec<_>, _>>()?;
    check_refund_total(&refunds)?;
    prefs.refund = refunds;

    if let Some(origin) = last_value(pairs, "originid") {
        if origin.len() > MAX_ORIGIN_ID_LEN {
            return Err(PreferenceError::IncorrectOriginId);
        }
        prefs.origin_id = origin.to_string();
    }

    prefs.use_mempool = bool_param(pairs, "usemempool")?;
    prefs.can_revert = bool_param(pairs, "canrevert")?;
    prefs.allow_bob = bool_param(pairs, "allowbob")?;

    if let Some(raw) = last_value(pairs, "mempoolrpc") {
        prefs.mempool_rpc = Some(secure_url(raw).map_err(PreferenceError::IncorrectMempoolUrl)?);
    }

    if let Some(raw) = last_value(pairs, "blockrange") {
        let range = raw
            .parse::<u64>()
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| PreferenceError::IncorrectBlockRange(raw.to_string()))?;
        prefs.block_range = Some(range);
    }

    if let Some(raw) = last_value(pairs, "auctiontimeout") {
        let timeout = raw
            .parse::<u64>()
            .map_err(|_| PreferenceError::IncorrectAuctionTimeout(raw.to_string()))?;
        prefs.auction_timeout = Some(timeout);
    }

    Ok(prefs)
}

/// Percent-decode a query string into pairs with lowercased keys.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_ascii_lowercase(), v.into_owned()))
        .collect()
}

fn values<'a>(pairs: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn is_fast_path(path: &str) -> bool {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .is_some_and(|segment| segment.eq_ignore_ascii_case(FAST_SEGMENT))
}

fn validate_hint(raw: &str) -> Result<String, PreferenceError> {
    let hint = raw.trim().to_ascii_lowercase();
    if hint.is_empty() {
        return Err(PreferenceError::EmptyHint);
    }
    if ALLOWED_HINTS.contains(&hint.as_str()) {
        Ok(hint)
    } else {
        Err(PreferenceError::IncorrectHint(raw.to_string()))
    }
}

fn select_builders<'a>(
    requested: impl Iterator<Item = &'a str>,
    known_builders: &[String],
) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for name in requested {
        let Some(known) = known_builders
            .iter()
            .find(|b| b.eq_ignore_ascii_case(name.trim()))
        else {
            continue;
        };
        if !selected.contains(known) {
            selected.push(known.clone());
        }
    }
    selected
}

fn parse_refund(raw: &str) -> Result<RefundConfig, PreferenceError> {
    let mut parts = raw.split(':');
    let (Some(address), Some(percent), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PreferenceError::IncorrectRefund(raw.to_string()));
    };

    if !is_hex_address(address) {
        return Err(PreferenceError::IncorrectRefundAddress(address.to_string()));
    }
    let address = Address::from_str(address)
        .map_err(|_| PreferenceError::IncorrectRefundAddress(address.to_string()))?;

    let percent_value = percent
        .parse::<u64>()
        .ok()
        .filter(|p| valid_percent(*p))
        .ok_or_else(|| PreferenceError::IncorrectRefundPercentage(percent.to_string()))?;

    Ok(RefundConfig {
        address,
        percent: percent_value,
    })
}

fn valid_percent(percent: u64) -> bool {
    percent > 0 && percent < 100
}

fn check_refund_total(refunds: &[RefundConfig]) -> Result<(), PreferenceError> {
    let total: u64 = refunds.iter().map(|r| r.percent).sum();
    if total > 100 {
        Err(PreferenceError::IncorrectRefundTotalPercentage(total))
    } else {
        Ok(())
    }
}

/// `0x` followed by exactly 40 hex characters.
pub fn is_hex_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn bool_param(pairs: &[(String, String)], key: &'static str) -> Result<bool, PreferenceError> {
    let Some(raw) = last_value(pairs, key) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        // A bare `?usemempool` reads as a flag.
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(PreferenceError::IncorrectBool {
            param: key,
            value: raw.to_string(),
        }),
    }
}

/// Parse a URL and force it onto https.
fn secure_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.host_str().is_none() {
        return Err(format!("`{raw}` has no host"));
    }
    if url.scheme() != "https" {
        url.set_scheme("https")
            .map_err(|_| format!("`{raw}` cannot be served over https"))?;
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn builders() -> Vec<String> {
        vec!["flashbots".into(), "beaverbuild.org".into(), "Titan".into()]
    }

    fn parse(path: &str, query: &str) -> Result<RoutingPreferences, PreferenceError> {
        parse_preferences(path, &query_pairs(query), &builders())
    }

    #[test]
    fn defaults_when_no_query() {
        let prefs = parse("/", "").unwrap();
        assert_eq!(prefs.privacy_hints, vec!["hash", "special_logs"]);
        assert!(!prefs.pref_was_set);
        assert!(!prefs.fast);
        assert!(prefs.target_builders.is_empty());
        assert!(prefs.refund.is_empty());
    }

    #[test]
    fn fast_path_targets_all_builders() {
        let prefs = parse("/fast", "builder=flashbots").unwrap();
        assert!(prefs.fast);
        assert_eq!(prefs.target_builders, builders());

        let prefs = parse("/fast/", "").unwrap();
        assert!(prefs.fast);

        assert!(!parse("/faster", "").unwrap().fast);
    }

    #[test]
    fn hints_repeat_and_mark_pref_set() {
        let prefs = parse("/", "hint=calldata&HINT=logs").unwrap();
        assert_eq!(prefs.privacy_hints, vec!["calldata", "logs"]);
        assert!(prefs.pref_was_set);
    }

    #[test]
    fn empty_hint_is_rejected() {
        assert_eq!(parse("/", "hint=").unwrap_err(), PreferenceError::EmptyHint);
        assert_eq!(parse("/", "hint").unwrap_err(), PreferenceError::EmptyHint);
    }

    #[test]
    fn unknown_hint_is_rejected() {
        assert_eq!(
            parse("/", "hint=everything").unwrap_err(),
            PreferenceError::IncorrectHint("everything".into())
        );
    }

    #[test]
    fn builders_are_filtered_to_known() {
        let prefs = parse("/", "builder=titan&builder=unknown&builder=flashbots&builder=Titan")
            .unwrap();
        assert_eq!(prefs.target_builders, vec!["Titan", "flashbots"]);
    }

    #[test]
    fn single_refund_is_accepted() {
        let prefs = parse("/", &format!("refund={ADDR_A}:17")).unwrap();
        assert_eq!(prefs.refund.len(), 1);
        assert_eq!(prefs.refund[0].percent, 17);
        assert_eq!(prefs.refund[0].address, Address::from_str(ADDR_A).unwrap());
    }

    #[test]
    fn refund_total_over_hundred_is_rejected() {
        let err = parse("/", &format!("refund={ADDR_A}:70&refund={ADDR_B}:60")).unwrap_err();
        assert_eq!(err, PreferenceError::IncorrectRefundTotalPercentage(130));
    }

    #[test]
    fn refund_percent_out_of_range_is_rejected() {
        let err = parse("/", &format!("refund={ADDR_A}:110")).unwrap_err();
        assert_eq!(err, PreferenceError::IncorrectRefundPercentage("110".into()));

        let err = parse("/", &format!("refund={ADDR_A}:0")).unwrap_err();
        assert!(matches!(err, PreferenceError::IncorrectRefundPercentage(_)));

        let err = parse("/", &format!("refund={ADDR_A}:abc")).unwrap_err();
        assert!(matches!(err, PreferenceError::IncorrectRefundPercentage(_)));
    }

    #[test]
    fn refund_shape_and_address_errors_are_distinct() {
        assert!(matches!(
            parse("/", "refund=nocolon").unwrap_err(),
            PreferenceError::IncorrectRefund(_)
        ));
        assert!(matches!(
            parse("/", &format!("refund={ADDR_A}:10:20")).unwrap_err(),
            PreferenceError::IncorrectRefund(_)
        ));
        assert!(matches!(
            parse("/", "refund=0x1234:10").unwrap_err(),
            PreferenceError::IncorrectRefundAddress(_)
        ));
    }

    #[test]
    fn mempool_rpc_is_forced_to_https() {
        let prefs = parse("/", "mempoolrpc=http%3A%2F%2Fnode.example.org%2Frpc").unwrap();
        assert_eq!(
            prefs.mempool_rpc.unwrap().as_str(),
            "https://node.example.org/rpc"
        );
    }

    #[test]
    fn malformed_mempool_rpc_is_rejected() {
        assert!(matches!(
            parse("/", "mempoolrpc=not%20a%20url").unwrap_err(),
            PreferenceError::IncorrectMempoolUrl(_)
        ));
    }

    #[test]
    fn booleans_and_numbers() {
        let prefs =
            parse("/", "usemempool=true&CanRevert=1&allowbob&blockrange=25&auctiontimeout=500")
                .unwrap();
        assert!(prefs.use_mempool);
        assert!(prefs.can_revert);
        assert!(prefs.allow_bob);
        assert_eq!(prefs.block_range, Some(25));
        assert_eq!(prefs.auction_timeout, Some(500));

        assert!(matches!(
            parse("/", "canrevert=maybe").unwrap_err(),
            PreferenceError::IncorrectBool { param: "canrevert", .. }
        ));
        assert!(matches!(
            parse("/", "blockrange=0").unwrap_err(),
            PreferenceError::IncorrectBlockRange(_)
        ));
    }

    #[test]
    fn origin_id_is_length_checked() {
        assert_eq!(parse("/", "originId=wallet-x").unwrap().origin_id, "wallet-x");
        let long = "x".repeat(300);
        assert_eq!(
            parse("/", &format!("originid={long}")).unwrap_err(),
            PreferenceError::IncorrectOriginId
        );
    }

    #[test]
    fn request_params_pick_up_bundle_and_proxy_override() {
        let parser = PreferenceParser::new(builders(), Presets::default());
        let params = parser
            .parse("/", Some("bundle=rescue-1&url=http%3A%2F%2Fnode.internal"), None)
            .unwrap();
        assert_eq!(params.whitehat_bundle.as_deref(), Some("rescue-1"));
        assert_eq!(params.proxy_url.unwrap().scheme(), "https");
    }

    #[test]
    fn preset_replaces_url_preferences() {
        let presets = Presets::from_raw(
            [("wallet-x".to_string(), "/fast?hint=calldata".to_string())],
            &builders(),
        );
        let parser = PreferenceParser::new(builders(), presets);

        // The URL would fail to parse on its own; the preset wins entirely.
        let params = parser.parse("/", Some("hint=bogus"), Some("wallet-x")).unwrap();
        assert!(params.preferences.fast);
        assert_eq!(params.preferences.privacy_hints, vec!["calldata"]);

        // No matching preset: URL applies unchanged.
        let err = parser.parse("/", Some("hint=bogus"), Some("other")).unwrap_err();
        assert!(matches!(err, PreferenceError::IncorrectHint(_)));
    }

    #[test]
    fn body_overrides_replace_lists() {
        let parser = PreferenceParser::new(builders(), Presets::default());
        let base = parse("/", "hint=logs&canrevert=true").unwrap();
        let body: TxPrivacyPreferences = serde_json::from_value(serde_json::json!({
            "privacy": {"hints": ["calldata"], "builders": ["titan"]},
            "validity": {"refund": [{"address": ADDR_A, "percent": 50}]},
            "canRevert": true
        }))
        .unwrap();

        let merged = parser.apply_body_overrides(&base, &body).unwrap();
        assert_eq!(merged.privacy_hints, vec!["calldata"]);
        assert_eq!(merged.target_builders, vec!["Titan"]);
        assert_eq!(merged.refund[0].percent, 50);
        assert!(merged.can_revert);
    }

    #[test]
    fn body_flags_replace_url_flags() {
        let parser = PreferenceParser::new(builders(), Presets::default());
        let base = parse("/fast", "usemempool=true&allowbob=true&canrevert=true").unwrap();
        assert!(base.fast && base.use_mempool && base.allow_bob && base.can_revert);

        let body: TxPrivacyPreferences = serde_json::from_value(serde_json::json!({
            "fast": false,
            "privacy": {"useMempool": false}
        }))
        .unwrap();
        let merged = parser.apply_body_overrides(&base, &body).unwrap();
        assert!(!merged.fast);
        assert!(!merged.use_mempool);
        assert!(!merged.allow_bob);
        assert!(!merged.can_revert);
        assert!(merged.target_builders.is_empty());
    }

    #[test]
    fn body_mempool_rpc_is_validated_and_applied() {
        let parser = PreferenceParser::new(builders(), Presets::default());
        let body: TxPrivacyPreferences = serde_json::from_value(serde_json::json!({
            "privacy": {"useMempool": true, "mempoolRpc": "http://node.example.org/rpc"}
        }))
        .unwrap();
        let merged = parser
            .apply_body_overrides(&RoutingPreferences::default(), &body)
            .unwrap();
        assert!(merged.use_mempool);
        assert_eq!(
            merged.mempool_rpc.unwrap().as_str(),
            "https://node.example.org/rpc"
        );

        let bad: TxPrivacyPreferences = serde_json::from_value(serde_json::json!({
            "privacy": {"mempoolRpc": "not a url"}
        }))
        .unwrap();
        assert!(matches!(
            parser.apply_body_overrides(&RoutingPreferences::default(), &bad),
            Err(PreferenceError::IncorrectMempoolUrl(_))
        ));
    }

    #[test]
    fn body_overrides_are_validated() {
        let parser = PreferenceParser::new(builders(), Presets::default());
        let body: TxPrivacyPreferences = serde_json::from_value(serde_json::json!({
            "validity": {"refund": [
                {"address": ADDR_A, "percent": 60},
                {"address": ADDR_B, "percent": 60}
            ]}
        }))
        .unwrap();
        assert_eq!(
            parser
                .apply_body_overrides(&RoutingPreferences::default(), &body)
                .unwrap_err(),
            PreferenceError::IncorrectRefundTotalPercentage(120)
        );
    }
}
