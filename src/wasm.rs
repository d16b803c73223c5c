//! WASM bindings
//!
//! Exposes the pure matching half of the engine (matcher + overlap
//! resolution) to JavaScript. The DOM half stays on the host side: the host
//! asks for matches per text node and applies them itself.
//!
//! Offsets cross the boundary as UTF-16 code units, which is what JS string
//! indices and DOM `Range` offsets use. Inside the crate they are UTF-8 bytes.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::highlight::{
    find_matches, resolve_overlaps, CompiledGroup, ConfigError, Configuration, MatchResult, PatternKind, StyledMatch,
};

// =============================================================================
// Offset conversion
// =============================================================================

/// UTF-16 length of `text[..byte]`
pub fn utf16_offset(text: &str, byte: usize) -> usize {
    text.get(..byte)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or_else(|| text.encode_utf16().count())
}

/// A match with JS string offsets
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsMatch {
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl JsMatch {
    fn from_styled(text: &str, m: StyledMatch) -> Self {
        Self {
            start: utf16_offset(text, m.start),
            end: utf16_offset(text, m.end),
            matched_text: m.matched_text,
            group_id: Some(m.group_id),
            group_name: Some(m.group_name),
            color: Some(m.color),
        }
    }

    fn from_plain(text: &str, m: MatchResult) -> Self {
        Self {
            start: utf16_offset(text, m.start),
            end: utf16_offset(text, m.end),
            matched_text: m.matched_text,
            group_id: None,
            group_name: None,
            color: None,
        }
    }
}

/// Matches from every compiled group, overlap-resolved, in JS offsets
pub fn scan_text(groups: &[CompiledGroup], text: &str) -> Vec<JsMatch> {
    let candidates: Vec<StyledMatch> = groups.iter().flat_map(|g| g.find(text)).collect();
    resolve_overlaps(candidates)
        .into_iter()
        .map(|m| JsMatch::from_styled(text, m))
        .collect()
}

// =============================================================================
// InkMatcher
// =============================================================================

/// Compiled configuration, reusable across text nodes
#[wasm_bindgen]
pub struct InkMatcher {
    config: Configuration,
    groups: Vec<CompiledGroup>,
}

impl InkMatcher {
    fn from_config(config: Configuration) -> Self {
        let groups = CompiledGroup::compile_all(&config.groups, config.case_sensitive);
        Self { config, groups }
    }
}

#[wasm_bindgen]
impl InkMatcher {
    /// `config` is a configuration object; `null`/`undefined` uses defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<InkMatcher, JsValue> {
        let config = if config.is_null() || config.is_undefined() {
            Configuration::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self::from_config(config))
    }

    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<InkMatcher, JsValue> {
        let config = Configuration::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::from_config(config))
    }

    /// Number of enabled, compiled groups
    #[wasm_bindgen(js_name = groupCount)]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[wasm_bindgen(js_name = processDynamicContent)]
    pub fn process_dynamic_content(&self) -> bool {
        self.config.process_dynamic_content
    }

    /// Non-overlapping styled matches for one text node
    #[wasm_bindgen(js_name = scanText)]
    pub fn scan_text(&self, text: &str) -> Result<JsValue, JsValue> {
        let matches = scan_text(&self.groups, text);
        serde_wasm_bindgen::to_value(&matches).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = configuration)]
    pub fn configuration(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.config).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// One-shot matching of `terms` against `text`
#[wasm_bindgen(js_name = findMatches)]
pub fn find_matches_js(text: &str, terms: Vec<String>, kind: &str, case_sensitive: bool) -> Result<JsValue, JsValue> {
    let kind: PatternKind = kind.parse().map_err(|e: ConfigError| JsValue::from_str(&e.to_string()))?;
    let matches: Vec<JsMatch> = find_matches(text, &terms, kind, case_sensitive)
        .into_iter()
        .map(|m| JsMatch::from_plain(text, m))
        .collect();
    serde_wasm_bindgen::to_value(&matches).map_err(|e| JsValue::from_str(&e.to_string()))
}

// ==================== TESTS ====================
