//! Vertex in the property graph.

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value};

/// Vertex identifier.
///
/// Ids are either numeric or textual depending on the source data. The two
/// never compare equal: `Long(7)` and `Text("7")` are distinct vertices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VertexId {
    Long(i64),
    Text(String),
}

impl VertexId {
    /// Parse a raw token: numeric tokens become `Long`, everything else `Text`.
    pub fn parse(token: &str) -> Self {
        match token.parse::<i64>() {
            Ok(n) => VertexId::Long(n),
            Err(_) => VertexId::Text(token.to_owned()),
        }
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexId::Long(n) => write!(f, "{n}"),
            VertexId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for VertexId { fn from(v: i64) -> Self { VertexId::Long(v) } }
impl From<&str> for VertexId { fn from(v: &str) -> Self { VertexId::Text(v.to_owned()) } }
impl From<String> for VertexId { fn from(v: String) -> Self { VertexId::Text(v) } }

/// A vertex in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Vertex {
    pub fn new(id: impl Into<VertexId>) -> Self {
        Self {
            id: id.into(),
            properties: PropertyMap::new(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
