//! Core value types shared by the matcher, resolver and annotator

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::ConfigError;

/// Fallback marker color for groups stored without one
pub const DEFAULT_COLOR: &str = "#cbd5e1";

// =============================================================================
// Pattern Kind
// =============================================================================

/// How a group's terms are compiled into searchable patterns
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Every character of the term is matched literally
    #[default]
    #[serde(alias = "text")]
    Literal,
    /// `*` matches one or more word characters, `?` exactly one character
    Wildcard,
    /// The term is a raw regular expression
    Regex,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Literal => "literal",
            PatternKind::Wildcard => "wildcard",
            PatternKind::Regex => "regex",
        }
    }
}

impl FromStr for PatternKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal" | "text" => Ok(PatternKind::Literal),
            "wildcard" => Ok(PatternKind::Wildcard),
            "regex" => Ok(PatternKind::Regex),
            other => Err(ConfigError::UnknownKind(other.to_string())),
        }
    }
}

// =============================================================================
// Group
// =============================================================================

/// A named, colored set of terms sharing one pattern kind
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, alias = "type")]
    pub kind: PatternKind,
    #[serde(default)]
    pub terms: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Group {
    pub fn new(id: &str, name: &str, color: &str, kind: PatternKind, terms: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            enabled: true,
            kind,
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Color used for this group's markers
    pub fn effective_color(&self) -> &str {
        if self.color.trim().is_empty() {
            DEFAULT_COLOR
        } else {
            &self.color
        }
    }
}

// =============================================================================
// Matches
// =============================================================================

/// Anything occupying a half-open `[start, end)` span of a text unit
pub trait Span {
    fn start(&self) -> usize;
    fn end(&self) -> usize;

    fn span_len(&self) -> usize {
        self.end() - self.start()
    }
}

/// One match inside a text unit. Offsets are UTF-8 byte offsets, half-open.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
}

impl MatchResult {
    pub fn new(start: usize, end: usize, matched_text: &str) -> Self {
        Self {
            start,
            end,
            matched_text: matched_text.to_string(),
        }
    }
}

impl Span for MatchResult {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

/// A match attributed to the group that produced it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyledMatch {
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    pub group_id: String,
    pub group_name: String,
    pub color: String,
}

impl StyledMatch {
    pub fn from_match(m: MatchResult, group: &Group) -> Self {
        Self {
            start: m.start,
            end: m.end,
            matched_text: m.matched_text,
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            color: group.effective_color().to_string(),
        }
    }
}

impl Span for StyledMatch {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

/// Payload of one materialized annotation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub group_id: String,
    pub group_name: String,
    pub matched_text: String,
    pub color: String,
}

impl From<&StyledMatch> for Marker {
    fn from(m: &StyledMatch) -> Self {
        Self {
            group_id: m.group_id.clone(),
            group_name: m.group_name.clone(),
            matched_text: m.matched_text.clone(),
            color: m.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_parsing_accepts_store_shape() {
        let json = r##"{"id": "g1", "name": "Tech", "color": "#A7F3D0", "enabled": true, "type": "text", "terms": ["Java"]}"##;
        let group: Group = serde_json::from_str(json).unwrap();

        assert_eq!(group.kind, PatternKind::Literal);
        assert_eq!(group.terms, vec!["Java".to_string()]);
    }

    #[test]
    fn test_group_defaults() {
        let json = r#"{"id": "g1", "name": "Bare", "kind": "wildcard"}"#;
        let group: Group = serde_json::from_str(json).unwrap();

        assert!(group.enabled);
        assert_eq!(group.kind, PatternKind::Wildcard);
        assert_eq!(group.effective_color(), DEFAULT_COLOR);
        assert!(group.terms.is_empty());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("REGEX".parse::<PatternKind>().unwrap(), PatternKind::Regex);
        assert_eq!("text".parse::<PatternKind>().unwrap(), PatternKind::Literal);
        assert!("glob".parse::<PatternKind>().is_err());
    }

    #[test]
    fn test_styled_match_uses_fallback_color() {
        let group = Group::new("g", "G", "  ", PatternKind::Literal, &["x"]);
        let styled = StyledMatch::from_match(MatchResult::new(0, 1, "x"), &group);
        assert_eq!(styled.color, DEFAULT_COLOR);
        assert_eq!(styled.span_len(), 1);
    }
}
