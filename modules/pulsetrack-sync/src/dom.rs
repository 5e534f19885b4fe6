//! In-memory model of a rendered page and generic deep queries over it.
//!
//! The browser serializes its element tree (shadow roots included) into this
//! model with a single snapshot script; all searching happens here, on plain
//! data, independent of the rendering engine.

use serde::Deserialize;

/// Recursion ceiling for tree walks. Malformed or adversarial pages are
/// truncated at this depth rather than walked to exhaustion.
pub const MAX_WALK_DEPTH: usize = 64;

/// One element of the snapshot tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomNode {
    #[serde(default)]
    pub tag: String,
    /// Text content of the element's own text nodes, children excluded.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Value of the `aria-pressed` attribute, when present.
    #[serde(default)]
    pub pressed: Option<String>,
    /// Absolute vertical offset within the full scrollable document.
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub visible: bool,
    /// Light-DOM children followed by shadow-root children. Child-index paths
    /// into this list round-trip through the in-page press script, which uses
    /// the same ordering.
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// innerText approximation: own text plus descendant text, space-joined.
    pub fn subtree_text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, 0, &mut parts);
        parts.join(" ")
    }
}

fn collect_text<'a>(node: &'a DomNode, depth: usize, out: &mut Vec<&'a str>) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    if !node.text.is_empty() {
        out.push(&node.text);
    }
    for child in &node.children {
        collect_text(child, depth + 1, out);
    }
}

/// Depth-first search over the whole tree. Returns each matching node together
/// with its child-index path from the root.
pub fn deep_find<F>(root: &DomNode, pred: F) -> Vec<(Vec<usize>, &DomNode)>
where
    F: Fn(&DomNode) -> bool,
{
    let mut found = Vec::new();
    let mut path = Vec::new();
    walk(root, &pred, &mut path, 0, &mut found);
    found
}

fn walk<'a, F>(
    node: &'a DomNode,
    pred: &F,
    path: &mut Vec<usize>,
    depth: usize,
    out: &mut Vec<(Vec<usize>, &'a DomNode)>,
) where
    F: Fn(&DomNode) -> bool,
{
    if depth > MAX_WALK_DEPTH {
        return;
    }
    if pred(node) {
        out.push((path.clone(), node));
    }
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        walk(child, pred, path, depth + 1, out);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, text: &str, children: Vec<DomNode>) -> DomNode {
        DomNode {
            tag: tag.to_string(),
            text: text.to_string(),
            children,
            ..Default::default()
        }
    }

    #[test]
    fn deep_find_returns_paths_in_document_order() {
        let root = el(
            "body",
            "",
            vec![
                el("div", "", vec![el("span", "a", vec![])]),
                el("span", "b", vec![]),
            ],
        );
        let spans = deep_find(&root, |n| n.tag == "span");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].0, vec![0, 0]);
        assert_eq!(spans[0].1.text, "a");
        assert_eq!(spans[1].0, vec![1]);
        assert_eq!(spans[1].1.text, "b");
    }

    #[test]
    fn subtree_text_joins_descendants() {
        let root = el(
            "div",
            "top",
            vec![el("span", "middle", vec![el("b", "deep", vec![])])],
        );
        assert_eq!(root.subtree_text(), "top middle deep");
    }

    #[test]
    fn walk_truncates_beyond_max_depth() {
        // A chain twice as deep as the guard; the leaf must not be reached.
        let mut node = el("span", "leaf", vec![]);
        for _ in 0..(MAX_WALK_DEPTH * 2) {
            node = el("div", "", vec![node]);
        }
        let leaves = deep_find(&node, |n| n.text == "leaf");
        assert!(leaves.is_empty());
        // But text collection stays bounded too, without panicking.
        let _ = node.subtree_text();
    }

    #[test]
    fn has_class_matches_exactly() {
        let node = DomNode {
            classes: vec!["dueDate".to_string(), "slds-truncate".to_string()],
            ..Default::default()
        };
        assert!(node.has_class("dueDate"));
        assert!(!node.has_class("due"));
    }
}
