//! OverlapResolver - picks a non-overlapping subset of candidate matches
//!
//! # Policy
//! 1. Sort by start ascending, ties broken by span length descending
//!    (the longer match wins when two start together)
//! 2. Walk left to right keeping the end of the last accepted span
//! 3. Accept a candidate only if it starts at or after that end
//!
//! This is greedy leftmost-first, longest-on-tie. It does not maximize total
//! coverage or match count: a long early match can shadow two later ones that
//! together would cover more text. The sort is stable, so between identical
//! spans the candidate that came first (the earlier group) is kept.

use super::types::Span;

/// Resolve candidates from every group on one text unit
pub fn resolve_overlaps<T: Span>(mut candidates: Vec<T>) -> Vec<T> {
    candidates.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then_with(|| b.span_len().cmp(&a.span_len()))
    });

    let mut accepted = Vec::with_capacity(candidates.len());
    let mut last_end = 0;

    for candidate in candidates {
        if candidate.start() >= last_end {
            last_end = candidate.end();
            accepted.push(candidate);
        }
    }

    accepted
}
