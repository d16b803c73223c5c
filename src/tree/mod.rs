//! Host tree capabilities
//!
//! The engine never talks to a concrete document API. It runs against three
//! small capability traits:
//! - `NodeTree` - read access: structure, text, attributes, visibility
//! - `MarkerTree` - split a text node and wrap a range, unwrap, normalize
//! - `MutationSource` - observe the tree and hand over batches of added nodes
//!
//! `Document` is an in-memory arena implementing all three.

pub mod document;

pub use document::*;

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

use crate::highlight::error::TreeError;
use crate::highlight::types::Marker;

/// Tag name used for marker elements
pub const MARKER_TAG: &str = "mark";

/// Class token identifying marker elements
pub const MARKER_CLASS: &str = "ink-highlight";

// =============================================================================
// Read capability
// =============================================================================

pub trait NodeTree {
    type Node: Copy + Eq + Hash + Debug;

    /// Root of the observed document (the body)
    fn root(&self) -> Self::Node;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Character data of a text node, `None` for elements
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Lowercase tag name of an element, `None` for text
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Computed hidden: no display, hidden visibility, zero opacity or a
    /// degenerate rendered box
    fn is_hidden(&self, element: Self::Node) -> bool;

    /// Inside editable content
    fn is_editable(&self, element: Self::Node) -> bool;

    /// Element created by the annotator
    fn is_marker(&self, node: Self::Node) -> bool;

    fn is_text(&self, node: Self::Node) -> bool {
        self.text(node).is_some()
    }

    /// Inclusive: a node contains itself
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn is_attached(&self, node: Self::Node) -> bool {
        self.contains(self.root(), node)
    }

    /// Nearest inclusive ancestor satisfying `pred`
    fn closest<F>(&self, node: Self::Node, mut pred: F) -> Option<Self::Node>
    where
        F: FnMut(Self::Node) -> bool,
    {
        let mut current = Some(node);
        while let Some(n) = current {
            if pred(n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Inclusive preorder walk in document order
    fn descendants(&self, root: Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// Concatenated text of every text node under `node`
    fn text_content(&self, node: Self::Node) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }
}

// =============================================================================
// Annotate capability
// =============================================================================

pub trait MarkerTree: NodeTree {
    /// Split `text_node` around `range` and wrap the middle in a marker.
    ///
    /// The original node keeps the text before `range`, so offsets before
    /// `range.start` stay valid for later calls on the same node.
    fn wrap_range(
        &mut self,
        text_node: Self::Node,
        range: Range<usize>,
        marker: &Marker,
    ) -> Result<Self::Node, TreeError>;

    /// Splice a marker's children into its parent at its position and
    /// detach the marker. Returns the former parent.
    fn unwrap_marker(&mut self, marker: Self::Node) -> Result<Self::Node, TreeError>;

    /// Merge adjacent text runs and drop empty text nodes under `node`
    fn normalize(&mut self, node: Self::Node);
}

// =============================================================================
// Observe capability
// =============================================================================

/// Nodes added under one parent by one structural change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub target: N,
    pub added: Vec<N>,
}

pub trait MutationSource: NodeTree {
    /// Begin recording child-list changes under the root
    fn observe(&mut self);

    /// Stop recording and drop anything not yet taken
    fn disconnect(&mut self);

    fn is_observing(&self) -> bool;

    /// Hand over every record queued since the last call
    fn take_records(&mut self) -> Vec<MutationRecord<Self::Node>>;
}

/// Everything the scan coordinator needs from a host
pub trait HostTree: MarkerTree + MutationSource {}

impl<T: MarkerTree + MutationSource> HostTree for T {}
