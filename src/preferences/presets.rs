// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-origin preference presets.
//!
//! A preset is written exactly like a client URL (`/fast?hint=calldata&...`)
//! and parsed once at startup. Presets that fail to parse are dropped with a
//! warning.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::{parse_preferences, query_pairs, RoutingPreferences};

#[derive(Debug, thiserror::Error)]
pub enum PresetFileError {
    #[error("failed to read presets file: {0}")]
    Io(#[from] std::io::Error),

    #[error("presets file must be a JSON object of origin -> url: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presets {
    by_origin: HashMap<String, RoutingPreferences>,
}

impl Presets {
    /// Parse `(origin, url)` pairs, dropping any that do not parse.
    pub fn from_raw(
        raw: impl IntoIterator<Item = (String, String)>,
        known_builders: &[String],
    ) -> Self {
        let mut by_origin = HashMap::new();
        for (origin, url) in raw {
            let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
            match parse_preferences(path, &query_pairs(query), known_builders) {
                Ok(mut prefs) => {
                    if prefs.origin_id.is_empty() {
                        prefs.origin_id = origin.clone();
                    }
                    by_origin.insert(origin, prefs);
                }
                Err(e) => warn!(origin = %origin, error = %e, "Dropping invalid preset"),
            }
        }
        Self { by_origin }
    }

    /// Load presets from a JSON file shaped `{ "origin": "/path?query" }`.
    pub fn load(path: &Path, known_builders: &[String]) -> Result<Self, PresetFileError> {
        let content = std::fs::read_to_string(path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&content)?;
        let presets = Self::from_raw(raw, known_builders);
        info!(count = presets.len(), path = %path.display(), "Loaded preference presets");
        Ok(presets)
    }

    pub fn get(&self, origin: &str) -> Option<&RoutingPreferences> {
        self.by_origin.get(origin)
    }

    pub fn len(&self) -> usize {
        self.by_origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_origin.is_empty()
    }
}
