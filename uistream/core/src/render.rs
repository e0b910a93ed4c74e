//! Render-Time Resolution
//!
//! Turns a [`Tree`] snapshot into a nested structure a renderer can walk.
//! Child keys are looked up here, not when patches are applied, so this is
//! where forward references and missing elements are dealt with:
//!
//! - no root, or a root key not yet present: [`Resolved::NotReady`]
//! - a child key with no element: dropped
//! - a child key already on the ancestor path: dropped (breaks cycles)

use serde_json::{Map, Value};

use crate::tree::{Element, Tree};

/// Result of resolving a snapshot from its root
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved<'a> {
    /// Nothing renderable yet
    NotReady,
    /// The resolved root node
    Ready(ResolvedNode<'a>),
}

impl Resolved<'_> {
    /// Whether a root node was resolved
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Text outline, or a neutral placeholder when not ready
    #[must_use]
    pub fn outline(&self) -> String {
        match self {
            Self::NotReady => "(waiting for root)\n".to_string(),
            Self::Ready(node) => node.outline(),
        }
    }
}

/// An element with its children resolved
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedNode<'a> {
    /// Element key
    pub key: &'a str,
    /// Component-kind tag
    pub kind: &'a str,
    /// Component props
    pub props: &'a Map<String, Value>,
    /// Resolved children, in declaration order
    pub children: Vec<ResolvedNode<'a>>,
}

impl ResolvedNode<'_> {
    /// Count of nodes in this subtree, including this one
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ResolvedNode::node_count).sum::<usize>()
    }

    /// Indented text rendering, one node per line
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.kind);
        out.push_str(" #");
        out.push_str(self.key);
        if let Some(label) = self.label() {
            out.push_str(" \"");
            out.push_str(label);
            out.push('"');
        }
        out.push('\n');
        for child in &self.children {
            child.write_outline(depth + 1, out);
        }
    }

    /// Best human-readable prop for outlines
    fn label(&self) -> Option<&str> {
        ["label", "title", "text", "placeholder"]
            .iter()
            .find_map(|name| self.props.get(*name).and_then(Value::as_str))
    }
}

impl Tree {
    /// Resolve the snapshot from its root
    #[must_use]
    pub fn resolve(&self) -> Resolved<'_> {
        let Some(root) = self.root().and_then(|key| self.get(key)) else {
            return Resolved::NotReady;
        };
        let mut path = Vec::new();
        Resolved::Ready(self.resolve_node(root, &mut path))
    }

    /// Children of `element` that are present in this snapshot
    #[must_use]
    pub fn resolve_children<'a>(&'a self, element: &'a Element) -> Vec<&'a Element> {
        element
            .child_keys()
            .iter()
            .filter_map(|key| self.get(key))
            .collect()
    }

    fn resolve_node<'a>(&'a self, element: &'a Element, path: &mut Vec<&'a str>) -> ResolvedNode<'a> {
        path.push(element.key.as_str());
        let mut children = Vec::new();
        for key in element.child_keys() {
            if path.contains(&key.as_str()) {
                tracing::trace!(key = %key, "Dropping cyclic child reference");
                continue;
            }
            if let Some(child) = self.get(key) {
                children.push(self.resolve_node(child, path));
            }
        }
        path.pop();

        ResolvedNode {
            key: &element.key,
            kind: &element.kind,
            props: &element.props,
            children,
        }
    }
}
