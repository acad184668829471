//! Edge in the property graph.

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value, VertexId};

/// Edge identity: the ordered (source, dest) pair.
///
/// Two edges with the same endpoints are duplicates regardless of label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId {
    pub source: VertexId,
    pub dest: VertexId,
}

impl EdgeId {
    pub fn new(source: impl Into<VertexId>, dest: impl Into<VertexId>) -> Self {
        Self { source: source.into(), dest: dest.into() }
    }

    /// The same pair with source and dest swapped.
    pub fn reverse(&self) -> EdgeId {
        EdgeId { source: self.dest.clone(), dest: self.source.clone() }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.dest
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})->({})", self.source, self.dest)
    }
}

/// A directed edge in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub dest: VertexId,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<VertexId>, dest: impl Into<VertexId>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
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

    pub fn id(&self) -> EdgeId {
        EdgeId { source: self.source.clone(), dest: self.dest.clone() }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.dest
    }

    /// The "other" end of the edge from the given vertex.
    pub fn other_vertex(&self, from: &VertexId) -> Option<&VertexId> {
        if *from == self.source { Some(&self.dest) }
        else if *from == self.dest { Some(&self.source) }
        else { None }
    }
}
