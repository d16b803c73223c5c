//! PatternMatcher - term compilation and match search
//!
//! Turns literal keywords, wildcard globs and raw regular expressions into
//! compiled `Regex` values and reports every non-empty match span.
//!
//! # Wildcards
//! - `*` becomes `\w+` so a glob never runs across whitespace
//! - `?` becomes `.` (exactly one character)
//!
//! # Failure containment
//! A term that does not compile contributes zero matches. It is logged and
//! the remaining terms are still searched.

use regex::{Regex, RegexBuilder};

use super::error::PatternError;
use super::types::{Group, MatchResult, PatternKind, StyledMatch};

/// Upper bound on compiled program size for a single term
const PATTERN_SIZE_LIMIT: usize = 1 << 21;

// ==================== COMPILATION ====================

/// Rewrite an escaped glob into a regex pattern string
pub fn wildcard_to_pattern(glob: &str) -> String {
    regex::escape(glob)
        .replace(r"\*", r"\w+")
        .replace(r"\?", ".")
}

/// Compile a single term of the given kind
pub fn compile_term(term: &str, kind: PatternKind, case_sensitive: bool) -> Result<Regex, PatternError> {
    if term.is_empty() {
        return Err(PatternError::EmptyTerm);
    }

    let pattern = match kind {
        PatternKind::Literal => regex::escape(term),
        PatternKind::Wildcard => wildcard_to_pattern(term),
        PatternKind::Regex => term.to_string(),
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|source| PatternError::InvalidPattern {
            term: term.to_string(),
            source,
        })
}

// ==================== MATCHER ====================

/// A set of compiled terms sharing one kind and case mode
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<Regex>,
}

impl PatternMatcher {
    /// Compile every term. Terms that fail are dropped with a warning.
    pub fn compile<S: AsRef<str>>(terms: &[S], kind: PatternKind, case_sensitive: bool) -> Self {
        let mut patterns = Vec::with_capacity(terms.len());

        for term in terms {
            let term = term.as_ref();
            match compile_term(term, kind, case_sensitive) {
                Ok(re) => patterns.push(re),
                Err(PatternError::EmptyTerm) => {}
                Err(e) => {
                    tracing::warn!(kind = kind.as_str(), error = %e, "skipping term");
                }
            }
        }

        Self { patterns }
    }

    /// Number of terms that compiled
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Every match of every term, stably sorted by start offset
    pub fn find(&self, text: &str) -> Vec<MatchResult> {
        let mut results = Vec::new();
        if text.is_empty() {
            return results;
        }

        for re in &self.patterns {
            collect_matches(re, text, &mut results);
        }

        results.sort_by_key(|m| m.start);
        results
    }
}

/// Walk `text` with `re`, stepping over zero-width hits one character at a time
fn collect_matches(re: &Regex, text: &str, out: &mut Vec<MatchResult>) {
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = re.find_at(text, pos) else {
            break;
        };

        if m.start() == m.end() {
            pos = next_char_boundary(text, m.end());
            continue;
        }

        out.push(MatchResult::new(m.start(), m.end(), m.as_str()));
        pos = m.end();
    }
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    at + text[at..].chars().next().map_or(1, char::len_utf8)
}

/// One-shot search: compile `terms` and search `text` once
pub fn find_matches<S: AsRef<str>>(
    text: &str,
    terms: &[S],
    kind: PatternKind,
    case_sensitive: bool,
) -> Vec<MatchResult> {
    if text.is_empty() || terms.is_empty() {
        return Vec::new();
    }
    PatternMatcher::compile(terms, kind, case_sensitive).find(text)
}

// ==================== COMPILED GROUP ====================

/// An enabled group with its terms compiled once per configuration
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    group: Group,
    matcher: PatternMatcher,
}

impl CompiledGroup {
    pub fn new(group: &Group, case_sensitive: bool) -> Self {
        Self {
            matcher: PatternMatcher::compile(&group.terms, group.kind, case_sensitive),
            group: group.clone(),
        }
    }

    /// Compile every enabled group of a configuration, in order
    pub fn compile_all<'a>(groups: impl IntoIterator<Item = &'a Group>, case_sensitive: bool) -> Vec<Self> {
        groups
            .into_iter()
            .filter(|g| g.enabled)
            .map(|g| Self::new(g, case_sensitive))
            .collect()
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn pattern_count(&self) -> usize {
        self.matcher.pattern_count()
    }

    /// Matches in `text`, tagged with this group's identity and color
    pub fn find(&self, text: &str) -> Vec<StyledMatch> {
        self.matcher
            .find(text)
            .into_iter()
            .map(|m| StyledMatch::from_match(m, &self.group))
            .collect()
    }
}

// ==================== TESTS ====================
