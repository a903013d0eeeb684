//! Graph schema definitions for Sextant
//!
//! Defines the node and edge records the store is built from. Producers
//! (language parsers, storage layers) hand these over as flat lists; the
//! store never mutates them after construction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind tag for a code entity node.
///
/// The set is open-ended: kinds the engine does not know about round-trip
/// through [`NodeKind::Other`] without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Function,
    Method,
    Class,
    Module,
    File,
    Variable,
    Other(String),
}

impl NodeKind {
    /// Parse a kind tag from its canonical lowercase form.
    pub fn parse(s: &str) -> Self {
        match s {
            "function" => NodeKind::Function,
            "method" => NodeKind::Method,
            "class" => NodeKind::Class,
            "module" => NodeKind::Module,
            "file" => NodeKind::File,
            "variable" => NodeKind::Variable,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Canonical lowercase form, the inverse of [`NodeKind::parse`].
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Class => "class",
            NodeKind::Module => "module",
            NodeKind::File => "file",
            NodeKind::Variable => "variable",
            NodeKind::Other(s) => s,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::parse(&s)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Kind tag for a directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeKind {
    Imports,
    Calls,
    Inherits,
    Contains,
    References,
    Other(String),
}

impl EdgeKind {
    /// Parse an edge kind from its canonical lowercase form.
    pub fn parse(s: &str) -> Self {
        match s {
            "imports" => EdgeKind::Imports,
            "calls" => EdgeKind::Calls,
            "inherits" => EdgeKind::Inherits,
            "contains" => EdgeKind::Contains,
            "references" => EdgeKind::References,
            other => EdgeKind::Other(other.to_string()),
        }
    }

    /// Canonical lowercase form, the inverse of [`EdgeKind::parse`].
    pub fn as_str(&self) -> &str {
        match self {
            EdgeKind::Imports => "imports",
            EdgeKind::Calls => "calls",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Contains => "contains",
            EdgeKind::References => "references",
            EdgeKind::Other(s) => s,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EdgeKind {
    fn from(s: String) -> Self {
        EdgeKind::parse(&s)
    }
}

impl From<EdgeKind> for String {
    fn from(kind: EdgeKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A code entity node.
///
/// The identifier uniquely determines every other field: two inserts with
/// the same `id` overwrite, never duplicate. By convention identifiers are
/// `<kind>:<file_path>:<qualified_name>`, but the store treats them as
/// opaque strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique identifier
    pub id: String,

    /// Entity kind (function, class, module, ...)
    pub kind: NodeKind,

    /// Simple name, for user-facing lookup. Not unique.
    pub name: String,

    /// Fully-qualified name (e.g. `billing::payout::PayoutService`)
    pub qualified_name: String,

    /// Source file containing the entity. External/virtual nodes may lack one.
    #[serde(default)]
    pub file_path: Option<String>,

    /// First line of the entity (1-indexed)
    pub line_start: u32,

    /// Last line of the entity (1-indexed, inclusive)
    pub line_end: u32,

    /// Complexity score assigned by the producer
    pub complexity: f64,

    /// Open-ended producer metadata (decorators, docstring, language, ...).
    ///
    /// Kept as an explicit ordered map so that serialization and scans are
    /// deterministic.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Node {
    /// Build a node with the conventional `<kind>:<file_path>:<qualified_name>`
    /// identifier.
    pub fn new(kind: NodeKind, name: &str, file_path: &str) -> Self {
        Self {
            id: format!("{}:{}:{}", kind.as_str(), file_path, name),
            kind,
            name: name.to_string(),
            qualified_name: name.to_string(),
            file_path: Some(file_path.to_string()),
            line_start: 0,
            line_end: 0,
            complexity: 0.0,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_qualified_name(mut self, qualified_name: &str) -> Self {
        self.qualified_name = qualified_name.to_string();
        self
    }

    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = start;
        self.line_end = end;
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// A directed, typed relationship between two nodes.
///
/// Endpoints are identifiers, not references: edges whose endpoints are not
/// present as [`Node`] records are tolerated, because producer and
/// graph-builder run as separate passes. Traversals surface such endpoints
/// as unknown ids rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,

    /// Open-ended producer metadata
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Edge {
    pub fn new(source_id: &str, target_id: &str, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            kind,
            properties: BTreeMap::new(),
        }
    }
}
