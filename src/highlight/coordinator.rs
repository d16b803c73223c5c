//! ScanCoordinator - wires selector, matcher, resolver and annotator
//!
//! # State machine
//! 1. `Idle` - nothing scanned yet, or stopped
//! 2. `Observing` - document scanned under the current configuration
//! 3. `Resetting` - a configuration change is being applied
//!
//! A configuration change always goes `Observing -> Resetting -> Observing`
//! (or `Idle` when dynamic content is off) in a fixed order: stop the
//! watcher, strip every marker, restart the watcher, rescan the document.
//! Incremental scans can add markers but never retract stale ones, so any
//! change (colors, kinds, enabled flags, terms) takes the full path.
//!
//! Mutation records produced by the coordinator's own annotation are drained
//! after every pass so they never reach the watcher.

use instant::Instant;
use serde::{Deserialize, Serialize};

use super::annotator::{apply_matches, remove_markers};
use super::config::{Configuration, ConfigurationStore, EngineOptions};
use super::matcher::CompiledGroup;
use super::overlap::resolve_overlaps;
use super::selector::NodeSelector;
use super::watcher::ChangeWatcher;
use crate::tree::{HostTree, MarkerTree, MutationSource};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Observing,
    Resetting,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::Observing => "observing",
            CoordinatorState::Resetting => "resetting",
        }
    }
}

/// Statistics for one or more scan passes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct ScanStats {
    /// Eligible text leaves visited
    pub leaves: usize,
    /// Matches found across all enabled groups, before overlap resolution
    pub candidates: usize,
    /// Matches kept by overlap resolution
    pub accepted: usize,
    /// Markers inserted
    pub applied: usize,
    /// Accepted matches rejected at apply time
    pub skipped: usize,
    pub elapsed_ms: f64,
}

impl ScanStats {
    fn absorb(&mut self, other: ScanStats) {
        self.leaves += other.leaves;
        self.candidates += other.candidates;
        self.accepted += other.accepted;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.elapsed_ms += other.elapsed_ms;
    }
}

// =============================================================================
// ScanCoordinator
// =============================================================================

pub struct ScanCoordinator<N> {
    config: Configuration,
    groups: Vec<CompiledGroup>,
    selector: NodeSelector,
    watcher: ChangeWatcher<N>,
    state: CoordinatorState,
}

impl<N> ScanCoordinator<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    pub fn new(options: EngineOptions) -> Self {
        Self {
            config: Configuration {
                groups: Vec::new(),
                ..Configuration::default()
            },
            groups: Vec::new(),
            selector: NodeSelector::new(&options),
            watcher: ChangeWatcher::new(&options),
            state: CoordinatorState::Idle,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn watcher(&self) -> &ChangeWatcher<N> {
        &self.watcher
    }

    /// When the host should next call `poll`
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.next_deadline()
    }

    fn install(&mut self, config: Configuration) {
        self.groups = CompiledGroup::compile_all(&config.groups, config.case_sensitive);
        self.config = config;
    }

    fn settle(&mut self) {
        self.state = if self.watcher.is_active() {
            CoordinatorState::Observing
        } else {
            CoordinatorState::Idle
        };
    }

    /// Initial pass: scan the whole document, then start watching it
    pub fn start<T>(&mut self, tree: &mut T, config: Configuration) -> ScanStats
    where
        T: HostTree<Node = N>,
    {
        self.install(config);
        let root = tree.root();
        let stats = self.pass(tree, root);

        self.watcher.start(tree, &self.config);
        self.settle();

        tracing::info!(
            groups = self.groups.len(),
            markers = stats.applied,
            state = self.state.as_str(),
            "initial scan complete"
        );
        stats
    }

    /// Stop watching. Markers stay in place.
    pub fn stop<T>(&mut self, tree: &mut T)
    where
        T: MutationSource<Node = N>,
    {
        self.watcher.stop(tree);
        self.state = CoordinatorState::Idle;
    }

    /// Scan `root` on demand. Changes queued before the call go to the
    /// watcher first; pending rescans inside `root` are satisfied by this
    /// pass, and the pass's own mutation records are discarded.
    pub fn scan<T>(&mut self, tree: &mut T, root: N) -> ScanStats
    where
        T: HostTree<Node = N>,
    {
        self.on_mutations(tree, Instant::now());
        let stats = self.pass(tree, root);
        self.watcher.forget(&*tree, root);
        tree.take_records();
        stats
    }

    /// One scan pass over `root` under the current configuration
    fn pass<T>(&self, tree: &mut T, root: N) -> ScanStats
    where
        T: MarkerTree<Node = N>,
    {
        let started = Instant::now();
        let mut stats = ScanStats::default();
        if self.groups.is_empty() {
            return stats;
        }

        for leaf in self.selector.select(&*tree, root) {
            let Some(text) = tree.text(leaf).map(str::to_string) else {
                continue;
            };
            stats.leaves += 1;

            let mut candidates = Vec::new();
            for group in &self.groups {
                candidates.extend(group.find(&text));
            }
            if candidates.is_empty() {
                continue;
            }
            stats.candidates += candidates.len();

            let accepted = resolve_overlaps(candidates);
            stats.accepted += accepted.len();

            let outcome = apply_matches(tree, leaf, &accepted);
            stats.applied += outcome.applied;
            stats.skipped += outcome.skipped;
        }

        stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            leaves = stats.leaves,
            candidates = stats.candidates,
            applied = stats.applied,
            skipped = stats.skipped,
            elapsed_ms = stats.elapsed_ms,
            "scan pass"
        );
        stats
    }

    /// Hand queued mutation records to the watcher
    pub fn on_mutations<T>(&mut self, tree: &mut T, now: Instant) -> usize
    where
        T: MutationSource<Node = N>,
    {
        let records = tree.take_records();
        if records.is_empty() {
            return 0;
        }
        self.watcher.record(&*tree, records, now)
    }

    /// Timer callback: rescan the due batch, if any
    pub fn poll<T>(&mut self, tree: &mut T, now: Instant) -> Option<ScanStats>
    where
        T: HostTree<Node = N>,
    {
        self.on_mutations(tree, now);

        let roots = self.watcher.poll(&*tree, now);
        if roots.is_empty() {
            return None;
        }

        let mut stats = ScanStats::default();
        for root in roots {
            // dropped if a previous root's pass detached it
            if tree.is_attached(root) {
                stats.absorb(self.pass(tree, root));
            }
        }
        tree.take_records();

        Some(stats)
    }

    /// Apply a new configuration: stop, strip all markers, restart, rescan
    pub fn reset<T>(&mut self, tree: &mut T, config: Configuration) -> ScanStats
    where
        T: HostTree<Node = N>,
    {
        self.state = CoordinatorState::Resetting;

        self.watcher.stop(tree);
        let root = tree.root();
        let removal = remove_markers(tree, root);
        tree.take_records();

        self.install(config);
        self.watcher.start(tree, &self.config);
        let stats = self.pass(tree, root);
        tree.take_records();

        self.settle();
        tracing::info!(
            removed = removal.removed,
            failed = removal.failed,
            applied = stats.applied,
            state = self.state.as_str(),
            "configuration reset"
        );
        stats
    }

    /// Change notification from the store: reload the whole snapshot and
    /// reset. A failed load keeps the current configuration.
    pub fn reload<T, S>(&mut self, tree: &mut T, store: &S) -> Option<ScanStats>
    where
        T: HostTree<Node = N>,
        S: ConfigurationStore + ?Sized,
    {
        match store.load() {
            Ok(config) => Some(self.reset(tree, config)),
            Err(e) => {
                tracing::warn!(error = %e, "configuration reload failed, keeping current snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::types::{Group, PatternKind};
    use crate::tree::{Document, NodeId, NodeTree};

    fn config(groups: Vec<Group>) -> Configuration {
        Configuration {
            groups,
            case_sensitive: false,
            process_dynamic_content: true,
        }
    }

    #[test]
    fn test_starts_idle() {
        let coordinator: ScanCoordinator<NodeId> = ScanCoordinator::new(EngineOptions::default());
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(coordinator.configuration().groups.is_empty());
        assert!(coordinator.next_deadline().is_none());
    }

    #[test]
    fn test_scan_without_groups_is_noop() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_text(root, "Java").unwrap();

        let mut coordinator = ScanCoordinator::new(EngineOptions::default());
        let stats = coordinator.scan(&mut doc, root);
        assert_eq!(stats, ScanStats::default());
        assert!(doc.markers(root).is_empty());
    }

    #[test]
    fn test_start_without_dynamic_content_stays_idle() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_text(root, "Java").unwrap();

        let mut coordinator = ScanCoordinator::new(EngineOptions::default());
        let mut cfg = config(vec![Group::new("g", "G", "#fff", PatternKind::Literal, &["java"])]);
        cfg.process_dynamic_content = false;

        let stats = coordinator.start(&mut doc, cfg);
        assert_eq!(stats.applied, 1);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(!doc.is_observing());
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = ScanStats::default();
        total.absorb(ScanStats { leaves: 2, applied: 1, ..ScanStats::default() });
        total.absorb(ScanStats { leaves: 3, skipped: 1, ..ScanStats::default() });
        assert_eq!(total.leaves, 5);
        assert_eq!(total.applied, 1);
        assert_eq!(total.skipped, 1);
    }
}
