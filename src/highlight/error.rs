//! Error types for the highlight engine
//!
//! None of these escape the public scan/reset entry points. Each one is
//! contained at the smallest unit that produced it (one term, one match,
//! one node, one marker) and logged there.

use thiserror::Error;

/// Failure to turn a term into a searchable pattern
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty term")]
    EmptyTerm,

    #[error("invalid pattern `{term}`: {source}")]
    InvalidPattern {
        term: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure of a structural operation against a host tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} is detached from its parent")]
    Detached(String),

    #[error("node {0} is not a text node")]
    NotText(String),

    #[error("node {0} cannot hold children")]
    NotContainer(String),

    #[error("node {0} is not a marker")]
    NotMarker(String),

    #[error("range {start}..{end} is out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("range {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },

    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: String, child: String },
}

/// Failure to read a configuration snapshot
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown pattern kind `{0}`")]
    UnknownKind(String),
}

/// Failure reported by an external configuration store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
