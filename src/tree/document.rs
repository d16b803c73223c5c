//! Document - in-memory arena tree
//!
//! A small element/text tree with just enough of a browser document's
//! behavior for the engine: attributes, a computed-style subset,
//! `contenteditable` inheritance, child-list mutation records and an HTML-ish
//! serializer for assertions.
//!
//! Nodes are never freed. A removed node is simply detached (no parent) and
//! can be re-inserted.

use std::fmt;
use std::ops::Range;

use super::{MarkerTree, MutationRecord, MutationSource, NodeTree, MARKER_CLASS, MARKER_TAG};
use crate::highlight::error::TreeError;
use crate::highlight::types::Marker;

// =============================================================================
// Types
// =============================================================================

/// Index of a node in the `Document` that created it.
///
/// Ids are only meaningful in their own document. Handed to another one,
/// read accessors see an absent node and mutators return
/// `TreeError::Detached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Subset of computed style the visibility filter looks at
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// `display: none` (hides the whole subtree)
    pub display_none: bool,
    /// `visibility`: `Some(true)` hidden, `Some(false)` visible, `None` inherit
    pub visibility_hidden: Option<bool>,
    /// Opacity of this element; zero hides the subtree
    pub opacity: f32,
    /// Rendered box `(width, height)`; `None` when never laid out
    pub size: Option<(f32, f32)>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: None,
            opacity: 1.0,
            size: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    style: Style,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    root: NodeId,
    observing: bool,
    records: Vec<MutationRecord<NodeId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document whose root is a `body` element
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            root: NodeId(0),
            observing: false,
            records: Vec::new(),
        };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `node` was created by this document
    pub fn owns(&self, node: NodeId) -> bool {
        (node.0 as usize) < self.slots.len()
    }

    fn check_owned(&self, nodes: &[NodeId]) -> Result<(), TreeError> {
        match nodes.iter().find(|&&n| !self.owns(n)) {
            Some(n) => Err(TreeError::Detached(n.to_string())),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Style::default(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, TreeError> {
        let node = self.create_element(tag);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, TreeError> {
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Structure mutation
    // -------------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`).
    /// A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.check_owned(&[parent, child])?;
        if let Some(r) = reference {
            self.check_owned(&[r])?;
        }
        if !matches!(self.slot(parent).data, NodeData::Element(_)) {
            return Err(TreeError::NotContainer(parent.to_string()));
        }
        if self.contains(child, parent) {
            return Err(TreeError::Cycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        if let Some(r) = reference {
            if r == child || self.slot(r).parent != Some(parent) {
                return Err(TreeError::Detached(r.to_string()));
            }
        }

        self.detach(child);

        let index = match reference {
            Some(r) => self
                .slot(parent)
                .children
                .iter()
                .position(|&c| c == r)
                .ok_or_else(|| TreeError::Detached(r.to_string()))?,
            None => self.slot(parent).children.len(),
        };
        self.slot_mut(parent).children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);

        self.record(parent, vec![child]);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_owned(&[parent, child])?;
        if self.slot(child).parent != Some(parent) {
            return Err(TreeError::Detached(child.to_string()));
        }
        self.detach(child);
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.slot_mut(node).parent.take() {
            self.slot_mut(parent).children.retain(|&c| c != node);
        }
    }

    /// Replace the character data of a text node (no child-list record)
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.check_owned(&[node])?;
        match &mut self.slot_mut(node).data {
            NodeData::Text(t) => {
                *t = text.to_string();
                Ok(())
            }
            NodeData::Element(_) => Err(TreeError::NotText(node.to_string())),
        }
    }

    // -------------------------------------------------------------------------
    // Attributes and style
    // -------------------------------------------------------------------------

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(Slot { data: NodeData::Element(el), .. }) = self.slots.get_mut(node.0 as usize) {
            match el.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn set_style(&mut self, node: NodeId, style: Style) {
        if let Some(Slot { data: NodeData::Element(el), .. }) = self.slots.get_mut(node.0 as usize) {
            el.style = style;
        }
    }

    pub fn style(&self, node: NodeId) -> Option<&Style> {
        self.element(node).map(|el| &el.style)
    }

    /// Marker elements under `root`, in document order
    pub fn markers(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.is_marker(n))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Serialize the children of `node` as HTML-like markup
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in &self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.slot(node).data {
            NodeData::Text(text) => out.push_str(&escape(text, false)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
                }
                out.push('>');
                for child in &self.slot(node).children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", el.tag));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn get(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.0 as usize)
    }

    // callers check ownership first
    fn slot(&self, node: NodeId) -> &Slot {
        &self.slots[node.0 as usize]
    }

    fn slot_mut(&mut self, node: NodeId) -> &mut Slot {
        &mut self.slots[node.0 as usize]
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.get(node)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>) {
        if self.observing && !added.is_empty() && self.is_attached(target) {
            self.records.push(MutationRecord { target, added });
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().any(|t| t == class))
            .unwrap_or(false)
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Capability impls
// =============================================================================

impl NodeTree for Document {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|slot| slot.children.clone()).unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_hidden(&self, element: NodeId) -> bool {
        if let Some((w, h)) = self.element(element).and_then(|el| el.style.size) {
            if w <= 1.0 || h <= 1.0 {
                return true;
            }
        }

        // display and opacity hide the whole subtree; visibility inherits
        // from the nearest ancestor that sets it
        let mut visibility = None;
        let mut current = Some(element);
        while let Some(n) = current {
            if let Some(el) = self.element(n) {
                if el.style.display_none || el.style.opacity <= 0.0 {
                    return true;
                }
                if visibility.is_none() {
                    visibility = el.style.visibility_hidden;
                }
            }
            current = self.parent(n);
        }
        visibility.unwrap_or(false)
    }

    fn is_editable(&self, element: NodeId) -> bool {
        let owner = self.closest(element, |n| self.attribute(n, "contenteditable").is_some());
        match owner.and_then(|n| self.attribute(n, "contenteditable")) {
            Some(value) => value.is_empty() || value.eq_ignore_ascii_case("true"),
            None => false,
        }
    }

    fn is_marker(&self, node: NodeId) -> bool {
        self.tag_name(node) == Some(MARKER_TAG) && self.has_class(node, MARKER_CLASS)
    }
}

impl MarkerTree for Document {
    fn wrap_range(
        &mut self,
        text_node: NodeId,
        range: Range<usize>,
        marker: &Marker,
    ) -> Result<NodeId, TreeError> {
        self.check_owned(&[text_node])?;
        let text = self
            .text(text_node)
            .ok_or_else(|| TreeError::NotText(text_node.to_string()))?;
        let parent = self
            .parent(text_node)
            .ok_or_else(|| TreeError::Detached(text_node.to_string()))?;

        if range.start >= range.end || range.end > text.len() {
            return Err(TreeError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(range.start) || !text.is_char_boundary(range.end) {
            return Err(TreeError::NotCharBoundary {
                start: range.start,
                end: range.end,
            });
        }

        let head = text[..range.start].to_string();
        let middle = text[range.clone()].to_string();
        let tail = text[range.end..].to_string();

        let mark = self.create_element(MARKER_TAG);
        self.set_attribute(mark, "class", MARKER_CLASS);
        self.set_attribute(mark, "style", &format!("background-color: {};", marker.color));
        self.set_attribute(mark, "data-group-id", &marker.group_id);
        self.set_attribute(mark, "data-group", &marker.group_name);
        self.set_attribute(mark, "data-match", &marker.matched_text);
        self.set_attribute(mark, "title", &format!("{}: {}", marker.group_name, marker.matched_text));

        let inner = self.create_text(&middle);
        self.slot_mut(inner).parent = Some(mark);
        self.slot_mut(mark).children.push(inner);

        let index = self
            .slot(parent)
            .children
            .iter()
            .position(|&c| c == text_node)
            .ok_or_else(|| TreeError::Detached(text_node.to_string()))?;

        self.set_text(text_node, &head)?;

        let mut added = vec![mark];
        self.slot_mut(mark).parent = Some(parent);
        self.slot_mut(parent).children.insert(index + 1, mark);

        if !tail.is_empty() {
            let rest = self.create_text(&tail);
            self.slot_mut(rest).parent = Some(parent);
            self.slot_mut(parent).children.insert(index + 2, rest);
            added.push(rest);
        }

        self.record(parent, added);
        Ok(mark)
    }

    fn unwrap_marker(&mut self, marker: NodeId) -> Result<NodeId, TreeError> {
        if !self.is_marker(marker) {
            return Err(TreeError::NotMarker(marker.to_string()));
        }
        let parent = self
            .parent(marker)
            .ok_or_else(|| TreeError::Detached(marker.to_string()))?;
        let index = self
            .slot(parent)
            .children
            .iter()
            .position(|&c| c == marker)
            .ok_or_else(|| TreeError::Detached(marker.to_string()))?;

        let moved = std::mem::take(&mut self.slot_mut(marker).children);
        for child in &moved {
            self.slot_mut(*child).parent = Some(parent);
        }

        let siblings = &mut self.slot_mut(parent).children;
        siblings.splice(index..=index, moved.iter().copied());
        self.slot_mut(marker).parent = None;

        self.record(parent, moved);
        Ok(parent)
    }

    fn normalize(&mut self, node: NodeId) {
        if !self.owns(node) {
            return;
        }
        let children = self.children(node);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                self.normalize(child);
                kept.push(child);
                continue;
            };

            let previous_text = kept.last().copied().filter(|&p| self.is_text(p));
            if text.is_empty() {
                self.slot_mut(child).parent = None;
            } else if let Some(previous) = previous_text {
                if let NodeData::Text(t) = &mut self.slot_mut(previous).data {
                    t.push_str(&text);
                }
                self.slot_mut(child).parent = None;
            } else {
                kept.push(child);
            }
        }

        self.slot_mut(node).children = kept;
    }
}

impl MutationSource for Document {
    fn observe(&mut self) {
        self.observing = true;
    }

    fn disconnect(&mut self) {
        self.observing = false;
        self.records.clear();
    }

    fn is_observing(&self) -> bool {
        self.observing
    }

    fn take_records(&mut self) -> Vec<MutationRecord<NodeId>> {
        std::mem::take(&mut self.records)
    }
}

// =============================================================================
// Tests
// =============================================================================
