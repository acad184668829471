//! GraphElement: what the tokenizer emits and the deduplicator consumes.

use serde::{Deserialize, Serialize};
use super::{Edge, Vertex};

/// Either a vertex or an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GraphElement {
    Vertex(Vertex),
    Edge(Edge),
}

impl GraphElement {
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            GraphElement::Vertex(v) => Some(v),
            GraphElement::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            GraphElement::Edge(e) => Some(e),
            GraphElement::Vertex(_) => None,
        }
    }
}

impl From<Vertex> for GraphElement {
    fn from(v: Vertex) -> Self { GraphElement::Vertex(v) }
}

impl From<Edge> for GraphElement {
    fn from(e: Edge) -> Self { GraphElement::Edge(e) }
}
