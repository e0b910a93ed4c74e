//! Tree Snapshots
//!
//! The data model shared by the stream controller and the playback engine.
//! A [`Tree`] is an immutable snapshot: a root key plus a map of elements.
//!
//! # Structural Sharing
//!
//! ```text
//! Tree ──► Arc<HashMap<key, Arc<Element>>>
//!                         │
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!     Arc<Element>   Arc<Element>   Arc<Element>
//! ```
//!
//! Cloning a tree is two pointer bumps. Applying a patch copies the outer map
//! (pointers only) and allocates the one element that changed; every other
//! element is shared with the previous snapshot. Observers holding an older
//! snapshot never see it change.
//!
//! # Intermediate States
//!
//! A snapshot is valid at every point of construction: `root` may name a key
//! that has not arrived yet, children may be forward references, and orphaned
//! elements are kept. Resolution happens at render time (see
//! [`Tree::resolve`](crate::render)).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single UI element in the tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Identifier of this element (unique within a tree)
    #[serde(default)]
    pub key: String,
    /// Component-kind tag (e.g. "Form", "TextField"); empty when omitted
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Opaque component props
    #[serde(default)]
    pub props: Map<String, Value>,
    /// Child keys, resolved against the tree at render time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

impl Element {
    /// Create an element with no props and no children
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            props: Map::new(),
            children: None,
        }
    }

    /// Add a prop
    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: Value) -> Self {
        self.props.insert(name.into(), value);
        self
    }

    /// Set the child keys
    #[must_use]
    pub fn with_children<I, K>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.children = Some(children.into_iter().map(Into::into).collect());
        self
    }

    /// Child keys (empty when the element has none)
    #[must_use]
    pub fn child_keys(&self) -> &[String] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// An immutable snapshot of the UI tree
#[derive(Clone, Debug, Default)]
pub struct Tree {
    root: Option<String>,
    elements: Arc<HashMap<String, Arc<Element>>>,
}

impl Tree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a `{"root": ..., "elements": {...}}` object
    ///
    /// Returns `None` when the value is not an object or an element fails to
    /// deserialize. Elements without a `key` take their map key.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let root = object.get("root").and_then(Value::as_str);

        let mut elements = HashMap::new();
        if let Some(map) = object.get("elements").and_then(Value::as_object) {
            for (key, raw) in map {
                let element = Element::from_patch_value(key, raw)?;
                elements.insert(key.clone(), Arc::new(element));
            }
        }

        Some(Self {
            root: normalize_root(root),
            elements: Arc::new(elements),
        })
    }

    /// Root key, if one has been designated
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Look up an element by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Element> {
        self.elements.get(key).map(AsRef::as_ref)
    }

    /// Whether an element is stored at `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.elements.contains_key(key)
    }

    /// Number of stored elements (including orphans)
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the tree has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over stored element keys (unordered)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Whether the root is designated and present
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.root().is_some_and(|root| self.contains(root))
    }

    /// Whether both snapshots point at the same element map allocation
    #[must_use]
    pub fn shares_elements_with(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }

    /// Whether `key` refers to the same element allocation in both snapshots
    #[must_use]
    pub fn shares_element_with(&self, other: &Tree, key: &str) -> bool {
        match (self.elements.get(key), other.elements.get(key)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// New snapshot with a different root
    #[must_use]
    pub fn with_root(&self, root: &str) -> Self {
        Self {
            root: normalize_root(Some(root)),
            elements: Arc::clone(&self.elements),
        }
    }

    /// New snapshot with `element` stored at `key`, replacing any previous one
    #[must_use]
    pub fn with_element(&self, key: impl Into<String>, element: Element) -> Self {
        let mut elements = Arc::clone(&self.elements);
        Arc::make_mut(&mut elements).insert(key.into(), Arc::new(element));
        Self {
            root: self.root.clone(),
            elements,
        }
    }
}

impl Element {
    /// Deserialize an element stored at `key`, defaulting its `key` field
    pub(crate) fn from_patch_value(key: &str, value: &Value) -> Option<Self> {
        let mut element = Element::deserialize(value).ok()?;
        if element.key.is_empty() {
            element.key = key.to_string();
        }
        Some(element)
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && (self.shares_elements_with(other) || self.elements == other.elements)
    }
}

impl Serialize for Tree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        // Sorted so the JSON output is stable
        let mut entries: Vec<_> = self.elements.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let elements: Map<String, Value> = entries
            .into_iter()
            .map(|(key, element)| {
                serde_json::to_value(element.as_ref())
                    .map(|value| (key.clone(), value))
                    .map_err(serde::ser::Error::custom)
            })
            .collect::<Result<_, _>>()?;

        let mut state = serializer.serialize_struct("Tree", 2)?;
        state.serialize_field("root", &self.root)?;
        state.serialize_field("elements", &elements)?;
        state.end()
    }
}

fn normalize_root(root: Option<&str>) -> Option<String> {
    root.filter(|r| !r.is_empty()).map(str::to_string)
}
