//! Patch Lines
//!
//! Parsing of single newline-delimited patch lines and the pure reducer that
//! applies them to a [`Tree`].
//!
//! # Wire Format
//!
//! ```text
//! {"op":"set","path":"/root","value":"form"}
//! {"op":"add","path":"/elements/form","value":{"key":"form","type":"Form","props":{},"children":["name"]}}
//! ```
//!
//! Producers (generative ones especially) emit commentary, blank lines and
//! truncated tails. None of that is an error: a line is either a patch or it
//! is skipped, and a patch the reducer does not understand leaves the tree
//! as it was.

use serde::Deserialize;
use serde_json::Value;

use crate::tree::{Element, Tree};

/// Operation kind of a patch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    /// Replace the value at the path
    Set,
    /// Add the value at the path
    Add,
    /// Any other op string (remove, replace, move, ...)
    #[serde(other)]
    Unsupported,
}

/// A structurally parsed patch operation
///
/// Fields are optional because shape checking belongs to the reducer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PatchOp {
    /// Operation kind
    #[serde(default)]
    pub op: Option<PatchKind>,
    /// Target path
    #[serde(default)]
    pub path: Option<String>,
    /// Operation payload
    #[serde(default)]
    pub value: Value,
}

impl PatchOp {
    /// Build a patch from its parts
    pub fn new(op: PatchKind, path: impl Into<String>, value: Value) -> Self {
        Self {
            op: Some(op),
            path: Some(path.into()),
            value,
        }
    }

    /// Interpret an already-parsed JSON value as a patch
    ///
    /// Values that are not patch-shaped become an empty patch, which the
    /// reducer ignores.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Parsed target path
    #[must_use]
    pub fn target(&self) -> PatchPath<'_> {
        self.path.as_deref().map_or(PatchPath::Unknown, PatchPath::parse)
    }
}

/// Path shapes the reducer understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchPath<'a> {
    /// `/root`
    Root,
    /// `/elements/{key}`
    Element(&'a str),
    /// Anything else
    Unknown,
}

impl<'a> PatchPath<'a> {
    /// Classify a path string
    #[must_use]
    pub fn parse(path: &'a str) -> Self {
        if path == "/root" {
            return Self::Root;
        }
        match path.strip_prefix("/elements/") {
            Some(key) if !key.is_empty() => Self::Element(key),
            _ => Self::Unknown,
        }
    }
}

/// Classification of one raw line
#[derive(Clone, Debug, PartialEq)]
pub enum LineKind {
    /// Empty or whitespace only
    Blank,
    /// Starts with `//`
    Comment,
    /// Not valid JSON
    Invalid,
    /// Valid JSON, handed to the reducer
    Patch(PatchOp),
}

impl LineKind {
    /// The patch, if the line carried one
    #[must_use]
    pub fn into_patch(self) -> Option<PatchOp> {
        match self {
            Self::Patch(op) => Some(op),
            _ => None,
        }
    }
}

/// Classify a raw line
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("//") {
        return LineKind::Comment;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => LineKind::Patch(PatchOp::from_value(value)),
        Err(e) => {
            tracing::trace!(error = %e, "Skipping non-JSON line");
            LineKind::Invalid
        }
    }
}

/// Parse a raw line into a patch, or `None` if it is not one
pub fn parse_line(line: &str) -> Option<PatchOp> {
    classify_line(line).into_patch()
}

/// Apply one patch to a snapshot, producing the next snapshot
///
/// Never fails. Unsupported paths, op kinds and payloads return a snapshot
/// equal to `tree` that still shares its element map.
#[must_use]
pub fn apply_patch(tree: &Tree, patch: &PatchOp) -> Tree {
    match patch.target() {
        PatchPath::Root => match patch.value.as_str() {
            Some(root) => tree.with_root(root),
            None => {
                tracing::debug!("Ignoring /root patch with non-string value");
                tree.clone()
            }
        },
        PatchPath::Element(key) => {
            if !matches!(patch.op, Some(PatchKind::Set | PatchKind::Add)) {
                tracing::debug!(key = %key, op = ?patch.op, "Ignoring unsupported element op");
                return tree.clone();
            }
            match Element::from_patch_value(key, &patch.value) {
                Some(element) => tree.with_element(key, element),
                None => {
                    tracing::debug!(key = %key, "Ignoring element patch with malformed value");
                    tree.clone()
                }
            }
        }
        PatchPath::Unknown => {
            tracing::debug!(path = ?patch.path, "Ignoring patch with unknown path");
            tree.clone()
        }
    }
}

impl Tree {
    /// Apply one patch, see [`apply_patch`]
    #[must_use]
    pub fn apply(&self, patch: &PatchOp) -> Tree {
        apply_patch(self, patch)
    }

    /// Parse and apply a raw line; non-patch lines return an unchanged clone
    #[must_use]
    pub fn apply_line(&self, line: &str) -> Tree {
        match parse_line(line) {
            Some(patch) => self.apply(&patch),
            None => self.clone(),
        }
    }
}
