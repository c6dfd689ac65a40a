//! Node model: typed records persisted in the graph store

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Node properties keyed by name
pub type Metadata = serde_json::Map<String, Value>;

/// A typed, identified record persisted in the graph store
///
/// `Node` itself is unvalidated; the concrete kinds ([`Question`], [`Chunk`])
/// check their required metadata on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub type_label: String,
    pub metadata: Metadata,
}

impl Node {
    /// Create a generic node without any metadata validation
    pub fn new(id: impl Into<String>, type_label: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            type_label: type_label.into(),
            metadata,
        }
    }

    /// Check that every key in `required` is present in the metadata
    pub fn validate(&self, required: &[&str]) -> Result<()> {
        match required.iter().find(|key| !self.metadata.contains_key(**key)) {
            Some(key) => Err(Error::MissingMetadata((*key).to_string())),
            None => Ok(()),
        }
    }

    /// The `text` property, if it is a string
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(Value::as_str)
    }

    /// The `header` property, if it is a string
    pub fn header(&self) -> Option<&str> {
        self.metadata.get("header").and_then(Value::as_str)
    }
}

/// A user or ground-truth query, linkable to supporting chunks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question(Node);

impl Question {
    pub const TYPE_LABEL: &'static str = "Question";
    pub const REQUIRED_METADATA: &'static [&'static str] = &["text"];

    pub fn new(id: impl Into<String>, metadata: Metadata) -> Result<Self> {
        let node = Node::new(id, Self::TYPE_LABEL, metadata);
        node.validate(Self::REQUIRED_METADATA)?;
        Ok(Self(node))
    }

    /// Build a question carrying only its text
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), Value::String(text.into()));
        Self(Node::new(id, Self::TYPE_LABEL, metadata))
    }

    pub fn node(&self) -> &Node {
        &self.0
    }
}

/// A retrievable text passage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk(Node);

impl Chunk {
    pub const TYPE_LABEL: &'static str = "Chunk";
    pub const REQUIRED_METADATA: &'static [&'static str] = &["text"];

    pub fn new(id: impl Into<String>, metadata: Metadata) -> Result<Self> {
        let node = Node::new(id, Self::TYPE_LABEL, metadata);
        node.validate(Self::REQUIRED_METADATA)?;
        Ok(Self(node))
    }

    pub fn node(&self) -> &Node {
        &self.0
    }
}

macro_rules! node_kind_conversions {
    ($kind:ident) => {
        impl From<$kind> for Node {
            fn from(kind: $kind) -> Self {
                kind.0
            }
        }
    };
}

node_kind_conversions!(Question);
node_kind_conversions!(Chunk);
