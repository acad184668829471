//! Grouping keys for vertices and edges.
//!
//! A key function decides which elements land in the same key-group and are
//! therefore deduplicated together. Equal relevant attributes always give
//! equal keys; nothing is promised about order within a group.

use serde::{Deserialize, Serialize};

use crate::model::{Edge, GraphElement, PartitionId, Vertex, VertexId};

/// Key function variants.
///
/// Vertices always key by their id. Edges key by:
/// - `SourceVertex`: the source id, so an edge groups with its source vertex
/// - `DestVertex`: the destination id
/// - `FullIdentity`: (source, dest, label)
/// - `UnorderedPair`: the endpoint pair regardless of direction, so an edge
///   and its reverse share a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFunction {
    #[default]
    SourceVertex,
    DestVertex,
    FullIdentity,
    UnorderedPair,
}

/// Hasher behind every grouping key and placement decision.
///
/// BLAKE3 over a canonical byte encoding, so keys do not depend on the
/// toolchain, the platform or the process:
///
/// - vertex id: tag byte (`0` Long, `1` Text), then the little-endian `i64`
///   or the little-endian `u64` byte length followed by the UTF-8 bytes
/// - label: `0` when absent, else `1` and the string as above
///
/// The key is the first 8 bytes of the digest read little-endian.
#[derive(Clone)]
pub struct StableHasher(blake3::Hasher);

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StableHasher {
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    pub fn vertex(mut self, id: &VertexId) -> Self {
        match id {
            VertexId::Long(n) => {
                self.0.update(&[0]);
                self.0.update(&n.to_le_bytes());
            }
            VertexId::Text(s) => {
                self.0.update(&[1]);
                self.write_str(s);
            }
        }
        self
    }

    pub fn label(mut self, label: Option<&str>) -> Self {
        match label {
            None => {
                self.0.update(&[0]);
            }
            Some(l) => {
                self.0.update(&[1]);
                self.write_str(l);
            }
        }
        self
    }

    fn write_str(&mut self, s: &str) {
        self.0.update(&(s.len() as u64).to_le_bytes());
        self.0.update(s.as_bytes());
    }

    pub fn finish(&self) -> u64 {
        let digest = self.0.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

/// Key of a single vertex id.
pub fn vertex_hash(id: &VertexId) -> u64 {
    StableHasher::new().vertex(id).finish()
}

/// Key of an ordered `(source, dest)` pair.
pub fn pair_hash(source: &VertexId, dest: &VertexId) -> u64 {
    StableHasher::new().vertex(source).vertex(dest).finish()
}

/// Map a key onto `[0, num_partitions)`.
pub fn partition_of(key: u64, num_partitions: u32) -> PartitionId {
    (key % num_partitions.max(1) as u64) as PartitionId
}

impl KeyFunction {
    pub fn vertex_key(&self, vertex: &Vertex) -> u64 {
        Self::id_key(&vertex.id)
    }

    pub fn edge_key(&self, edge: &Edge) -> u64 {
        match self {
            KeyFunction::SourceVertex => Self::id_key(&edge.source),
            KeyFunction::DestVertex => Self::id_key(&edge.dest),
            KeyFunction::FullIdentity => StableHasher::new()
                .vertex(&edge.source)
                .vertex(&edge.dest)
                .label(edge.label.as_deref())
                .finish(),
            KeyFunction::UnorderedPair => {
                let (lo, hi) = if edge.source <= edge.dest {
                    (&edge.source, &edge.dest)
                } else {
                    (&edge.dest, &edge.source)
                };
                pair_hash(lo, hi)
            }
        }
    }

    pub fn element_key(&self, element: &GraphElement) -> u64 {
        match element {
            GraphElement::Vertex(v) => self.vertex_key(v),
            GraphElement::Edge(e) => self.edge_key(e),
        }
    }

    /// True when `e` and `e.reverse()` always get the same key.
    pub fn groups_reverse_pairs(&self) -> bool {
        matches!(self, KeyFunction::UnorderedPair)
    }

    fn id_key(id: &VertexId) -> u64 {
        vertex_hash(id)
    }
}
