//! Annotator - wraps accepted spans in markers and strips them again
//!
//! Wrapping one span splits the text node it lives in. The node keeps the
//! text *before* the span, so spans that start earlier keep valid offsets.
//! Matches are therefore applied back to front (highest start first).
//! Applying them front to back would shift every later offset.

use serde::{Deserialize, Serialize};

use super::types::{Marker, StyledMatch};
use crate::tree::MarkerTree;

/// Counts from one `apply_matches` call
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub skipped: usize,
}

/// Counts from one `remove_markers` call
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub removed: usize,
    pub failed: usize,
}

/// Wrap each of a set of non-overlapping matches on `unit` in a marker.
///
/// Stale or out-of-range offsets skip that match only.
pub fn apply_matches<T: MarkerTree>(tree: &mut T, unit: T::Node, matches: &[StyledMatch]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    let mut ordered: Vec<&StyledMatch> = matches.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    for m in ordered {
        let marker = Marker::from(m);
        match tree.wrap_range(unit, m.start..m.end, &marker) {
            Ok(_) => outcome.applied += 1,
            Err(e) => {
                tracing::warn!(
                    node = ?unit,
                    start = m.start,
                    end = m.end,
                    group = %m.group_id,
                    error = %e,
                    "skipping match"
                );
                outcome.skipped += 1;
            }
        }
    }

    outcome
}

/// Strip every marker under `root` (inclusive) and merge the text runs back.
///
/// A marker that fails to unwrap (already detached, say) is logged and the
/// rest are still processed.
pub fn remove_markers<T: MarkerTree>(tree: &mut T, root: T::Node) -> RemovalOutcome {
    let mut outcome = RemovalOutcome::default();

    let markers: Vec<T::Node> = tree
        .descendants(root)
        .into_iter()
        .filter(|&n| tree.is_marker(n))
        .collect();

    for marker in markers {
        match tree.unwrap_marker(marker) {
            Ok(parent) => {
                tree.normalize(parent);
                outcome.removed += 1;
            }
            Err(e) => {
                tracing::debug!(node = ?marker, error = %e, "failed to remove marker");
                outcome.failed += 1;
            }
        }
    }

    outcome
}

// ==================== TESTS ====================
