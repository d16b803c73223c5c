//! NodeSelector - eligible text leaves under a root
//!
//! A text leaf is eligible when its parent element is:
//! 1. not inside a technical container (script, style, form controls, head)
//! 2. not editable
//! 3. not computed-hidden and not collapsed to a degenerate box
//! 4. not styled with a screen-reader-only class
//! 5. not inside the engine's own UI host or a marker
//! 6. optionally, not inside an `aria-hidden="true"` subtree
//!
//! Subtrees rejected by 1, 5 and 6 are pruned without being walked.

use regex::Regex;

use super::config::EngineOptions;
use crate::tree::NodeTree;

/// Elements whose text is never prose
const TECHNICAL_TAGS: &[&str] = &[
    "script", "style", "noscript", "textarea", "input", "select", "option", "head", "meta",
];

/// Class names sites use for visually hidden, screen-reader-only text
const VISUALLY_HIDDEN_CLASSES: &str = r"(?i)visually-hidden|sr-only|accessibility-text|artdeco-button__text";

#[derive(Debug, Clone)]
pub struct NodeSelector {
    host_id: String,
    skip_aria_hidden: bool,
    visually_hidden: Option<Regex>,
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self::new(&EngineOptions::default())
    }
}

impl NodeSelector {
    pub fn new(options: &EngineOptions) -> Self {
        let visually_hidden = match Regex::new(VISUALLY_HIDDEN_CLASSES) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(error = %e, "visually-hidden class filter disabled");
                None
            }
        };

        Self {
            host_id: options.host_id.clone(),
            skip_aria_hidden: options.skip_aria_hidden,
            visually_hidden,
        }
    }

    /// Eligible text leaves under `root` (inclusive), in document order
    pub fn select<T: NodeTree>(&self, tree: &T, root: T::Node) -> Vec<T::Node> {
        let mut leaves = Vec::new();

        // a mutation root can land inside an excluded subtree
        let start = if tree.is_text(root) { tree.parent(root) } else { Some(root) };
        if let Some(el) = start {
            if tree.closest(el, |n| self.prunes(tree, n)).is_some() {
                return leaves;
            }
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if tree.is_text(node) {
                if self.accepts_text(tree, node) {
                    leaves.push(node);
                }
                continue;
            }
            if node != root && self.prunes(tree, node) {
                continue;
            }
            stack.extend(tree.children(node).into_iter().rev());
        }

        leaves
    }

    /// Element whose whole subtree is off limits
    fn prunes<T: NodeTree>(&self, tree: &T, element: T::Node) -> bool {
        if tree.is_marker(element) {
            return true;
        }
        if let Some(tag) = tree.tag_name(element) {
            if TECHNICAL_TAGS.contains(&tag) {
                return true;
            }
        }
        if tree.attribute(element, "id") == Some(self.host_id.as_str()) {
            return true;
        }
        self.skip_aria_hidden && tree.attribute(element, "aria-hidden") == Some("true")
    }

    fn accepts_text<T: NodeTree>(&self, tree: &T, node: T::Node) -> bool {
        if tree.text(node).map_or(true, str::is_empty) {
            return false;
        }
        let Some(parent) = tree.parent(node) else {
            return false;
        };

        if tree.is_editable(parent) || tree.is_hidden(parent) {
            return false;
        }

        match (&self.visually_hidden, tree.attribute(parent, "class")) {
            (Some(re), Some(class)) => !re.is_match(class),
            _ => true,
        }
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::types::Marker;
    use crate::tree::{Document, MarkerTree, NodeId, Style};

    fn texts(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().filter_map(|&n| doc.text(n)).map(str::to_string).collect()
    }

    fn paragraph(doc: &mut Document, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let el = doc.append_element(parent, tag).unwrap();
        doc.append_text(el, text).unwrap();
        el
    }

    #[test]
    fn test_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = paragraph(&mut doc, root, "div", "first");
        paragraph(&mut doc, div, "span", "second");
        paragraph(&mut doc, root, "p", "third");

        let selector = NodeSelector::default();
        let leaves = selector.select(&doc, root);
        assert_eq!(texts(&doc, &leaves), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_technical_and_editable_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        paragraph(&mut doc, root, "script", "var Java = 1;");
        paragraph(&mut doc, root, "style", ".java {}");
        paragraph(&mut doc, root, "textarea", "typed Java");
        let editor = paragraph(&mut doc, root, "div", "editing Java");
        doc.set_attribute(editor, "contenteditable", "true");
        paragraph(&mut doc, root, "p", "visible Java");

        let leaves = NodeSelector::default().select(&doc, root);
        assert_eq!(texts(&doc, &leaves), vec!["visible Java"]);
    }

    #[test]
    fn test_hidden_and_screen_reader_text_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        let gone = paragraph(&mut doc, root, "div", "display none");
        doc.set_style(gone, Style { display_none: true, ..Style::default() });
        let collapsed = paragraph(&mut doc, root, "div", "collapsed");
        doc.set_style(collapsed, Style { size: Some((0.0, 0.0)), ..Style::default() });
        let sr = paragraph(&mut doc, root, "span", "screen reader");
        doc.set_attribute(sr, "class", "label SR-ONLY");
        paragraph(&mut doc, root, "p", "shown");

        let leaves = NodeSelector::default().select(&doc, root);
        assert_eq!(texts(&doc, &leaves), vec!["shown"]);
    }

    #[test]
    fn test_own_ui_and_markers_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        let host = doc.append_element(root, "div").unwrap();
        doc.set_attribute(host, "id", "ink-shadow-host");
        paragraph(&mut doc, host, "span", "sidebar Java");

        let p = doc.append_element(root, "p").unwrap();
        let text = doc.append_text(p, "Java rocks").unwrap();
        let marker = Marker {
            group_id: "g".into(),
            group_name: "G".into(),
            matched_text: "Java".into(),
            color: "#fff".into(),
        };
        doc.wrap_range(text, 0..4, &marker).unwrap();

        let leaves = NodeSelector::default().select(&doc, root);
        assert_eq!(texts(&doc, &leaves), vec![" rocks"]);
    }

    #[test]
    fn test_root_inside_excluded_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        let script = doc.append_element(root, "script").unwrap();
        let inner = paragraph(&mut doc, script, "span", "inside");

        let selector = NodeSelector::default();
        assert!(selector.select(&doc, inner).is_empty());
    }

    #[test]
    fn test_text_node_as_root() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.append_element(root, "p").unwrap();
        let text = doc.append_text(p, "lone").unwrap();

        assert_eq!(NodeSelector::default().select(&doc, text), vec![text]);
    }

    #[test]
    fn test_aria_hidden_is_configurable() {
        let mut doc = Document::new();
        let root = doc.root();
        let decorative = paragraph(&mut doc, root, "span", "Senior Java Engineer");
        doc.set_attribute(decorative, "aria-hidden", "true");

        let lenient = NodeSelector::default();
        assert_eq!(lenient.select(&doc, root).len(), 1);

        let strict = NodeSelector::new(&EngineOptions {
            skip_aria_hidden: true,
            ..EngineOptions::default()
        });
        assert!(strict.select(&doc, root).is_empty());
    }

    #[test]
    fn test_empty_text_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        paragraph(&mut doc, root, "p", "");
        assert!(NodeSelector::default().select(&doc, root).is_empty());
    }
}
