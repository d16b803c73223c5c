//! ChangeWatcher - debounced tracking of structurally changed subtrees
//!
//! # State machine
//! ```text
//! Idle --start--> Observing --change--> Scheduled --quiet window--> Observing
//!                     ^                    |  ^                         |
//!                     |                    +--+ change (re-arm)         |
//!                     +--------------------- stop (any state) ----------+--> Idle
//! ```
//!
//! The timer is a deadline rather than a callback: the host arms its own
//! timer from `next_deadline()` and calls `poll(now)` when it fires. Each
//! firing drains the pending set exactly once.

use instant::Instant;
use std::time::Duration;
use std::collections::HashSet;
use std::hash::Hash;

use super::config::{Configuration, EngineOptions};
use crate::tree::{MutationRecord, MutationSource, NodeTree};

// =============================================================================
// Pending Root Set
// =============================================================================

/// Insertion-ordered set of nodes awaiting rescan, outermost members only
#[derive(Debug, Clone)]
pub struct PendingRootSet<N> {
    order: Vec<N>,
    members: HashSet<N>,
}

impl<N: Copy + Eq + Hash> Default for PendingRootSet<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> PendingRootSet<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` unless it is already covered by a member. Members that
    /// `node` covers are dropped. Returns whether the set changed.
    pub fn insert<T: NodeTree<Node = N>>(&mut self, tree: &T, node: N) -> bool {
        if self.covers(tree, node) {
            return false;
        }

        let before = self.order.len();
        self.order.retain(|&member| !tree.contains(node, member));
        if self.order.len() != before {
            self.members = self.order.iter().copied().collect();
        }

        self.order.push(node);
        self.members.insert(node);
        true
    }

    /// Whether `node` or one of its ancestors is already a member
    pub fn covers<T: NodeTree<Node = N>>(&self, tree: &T, node: N) -> bool {
        tree.closest(node, |n| self.members.contains(&n)).is_some()
    }

    /// Drop every member inside `root` (inclusive). Returns how many went.
    pub fn remove_within<T: NodeTree<Node = N>>(&mut self, tree: &T, root: N) -> usize {
        let before = self.order.len();
        self.order.retain(|&member| !tree.contains(root, member));
        let removed = before - self.order.len();
        if removed > 0 {
            self.members = self.order.iter().copied().collect();
        }
        removed
    }

    pub fn contains(&self, node: &N) -> bool {
        self.members.contains(node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Take every member, leaving the set empty
    pub fn drain(&mut self) -> Vec<N> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }
}

/// Keep only nodes with no ancestor among `nodes`, preserving order
pub fn outermost<T: NodeTree>(tree: &T, nodes: &[T::Node]) -> Vec<T::Node> {
    let set: HashSet<T::Node> = nodes.iter().copied().collect();
    nodes
        .iter()
        .copied()
        .filter(|&node| {
            let mut current = tree.parent(node);
            while let Some(n) = current {
                if set.contains(&n) {
                    return false;
                }
                current = tree.parent(n);
            }
            true
        })
        .collect()
}

// =============================================================================
// Watcher
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not observing anything
    Idle,
    /// Observing, nothing pending
    Observing,
    /// Changes pending; the batch fires at `deadline`
    Scheduled { deadline: Instant },
}

/// Debounced change tracker. Each instance owns its own pending set.
#[derive(Debug, Clone)]
pub struct ChangeWatcher<N> {
    state: WatcherState,
    pending: PendingRootSet<N>,
    quiet_window: Duration,
    host_id: String,
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> ChangeWatcher<N> {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            state: WatcherState::Idle,
            pending: PendingRootSet::new(),
            quiet_window: Duration::from_millis(options.quiet_window_ms),
            host_id: options.host_id.clone(),
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != WatcherState::Idle
    }

    pub fn pending(&self) -> &PendingRootSet<N> {
        &self.pending
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// When the host should call `poll`, if a batch is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            WatcherState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Begin observing. Does nothing (and stays Idle) when dynamic content
    /// processing is off.
    pub fn start<T>(&mut self, tree: &mut T, config: &Configuration) -> bool
    where
        T: MutationSource<Node = N>,
    {
        self.stop(tree);
        if !config.process_dynamic_content {
            tracing::debug!("dynamic content disabled, watcher stays idle");
            return false;
        }
        tree.observe();
        self.state = WatcherState::Observing;
        true
    }

    /// Stop observing, cancel any scheduled batch and forget pending nodes
    pub fn stop<T>(&mut self, tree: &mut T)
    where
        T: MutationSource<Node = N>,
    {
        if self.state != WatcherState::Idle {
            tree.disconnect();
        }
        self.pending.clear();
        self.state = WatcherState::Idle;
    }

    /// Accept a batch of mutation records. Added nodes that belong to the
    /// engine (markers, marker content, the UI host) are discarded; anything
    /// else arms or re-arms the quiet-window timer.
    pub fn record<T>(&mut self, tree: &T, records: Vec<MutationRecord<N>>, now: Instant) -> usize
    where
        T: NodeTree<Node = N>,
    {
        if self.state == WatcherState::Idle {
            return 0;
        }

        let mut accepted = 0;
        for node in records.into_iter().flat_map(|r| r.added) {
            if self.is_own(tree, node) {
                continue;
            }
            self.pending.insert(tree, node);
            accepted += 1;
        }

        if accepted > 0 {
            self.state = WatcherState::Scheduled {
                deadline: now + self.quiet_window,
            };
        }
        accepted
    }

    /// Fire the batch if its quiet window has elapsed. Returns the surviving
    /// outermost, still-attached roots; empty when nothing is due.
    pub fn poll<T>(&mut self, tree: &T, now: Instant) -> Vec<N>
    where
        T: NodeTree<Node = N>,
    {
        let WatcherState::Scheduled { deadline } = self.state else {
            return Vec::new();
        };
        if now < deadline {
            return Vec::new();
        }

        self.state = WatcherState::Observing;
        let drained = self.pending.drain();
        let attached: Vec<N> = drained.into_iter().filter(|&n| tree.is_attached(n)).collect();
        let roots = outermost(tree, &attached);

        tracing::debug!(roots = roots.len(), "processing mutation roots");
        roots
    }

    /// Forget pending nodes inside `root`, which was just scanned directly.
    /// A batch left with nothing to do is cancelled.
    pub fn forget<T>(&mut self, tree: &T, root: N) -> usize
    where
        T: NodeTree<Node = N>,
    {
        let removed = self.pending.remove_within(tree, root);
        if self.pending.is_empty() && matches!(self.state, WatcherState::Scheduled { .. }) {
            self.state = WatcherState::Observing;
        }
        removed
    }

    fn is_own<T: NodeTree<Node = N>>(&self, tree: &T, node: N) -> bool {
        tree.closest(node, |n| {
            tree.is_marker(n) || tree.attribute(n, "id") == Some(self.host_id.as_str())
        })
        .is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
