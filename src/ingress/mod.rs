//! # Vertex-Cut Ingress
//!
//! Places every edge on exactly one partition and derives, per vertex, the
//! set of partitions holding at least one of its edges. One of those is the
//! owner; the rest are mirrors.
//!
//! | Code | Algorithm | Edge placement |
//! |------|-----------|----------------|
//! | 0 | `Random` | hash of the edge id |
//! | 1 | `Oblivious` | greedy: reuse partitions already holding the endpoints |
//! | 2 | `Grid` | least loaded cell shared by both endpoints' grid row/column |
//!
//! Owner choice: the replica holding most of the vertex's edges; ties are
//! broken by the vertex hash over the sorted candidates. Vertices without
//! edges are owned by `hash(id) % n` and have no mirrors.

mod placement;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dedup::DedupOutput;
use crate::key::{partition_of, vertex_hash};
use crate::model::{Edge, PartitionId, PropertyMap, VertexId, VertexRecord};
use crate::{Error, Result};

use placement::PlacementState;

/// Highest valid ingress algorithm code.
pub const INGRESS_CODE_LIMIT: u32 = 2;

/// Ingress algorithms, by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngressAlgorithm {
    Random,
    Oblivious,
    Grid,
}

impl IngressAlgorithm {
    /// Resolve a selector code. Codes outside `[0, INGRESS_CODE_LIMIT]` are a
    /// configuration error.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(IngressAlgorithm::Random),
            1 => Ok(IngressAlgorithm::Oblivious),
            2 => Ok(IngressAlgorithm::Grid),
            _ => Err(Error::Configuration(format!(
                "ingress code {code} outside [0, {INGRESS_CODE_LIMIT}]"
            ))),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            IngressAlgorithm::Random => 0,
            IngressAlgorithm::Oblivious => 1,
            IngressAlgorithm::Grid => 2,
        }
    }
}

/// Placement of a deduplicated graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngressResult {
    /// One record per vertex, sorted by id.
    pub records: Vec<VertexRecord>,
    /// Edges per partition, indexed by partition id.
    pub edges: Vec<Vec<Edge>>,
}

/// Configured ingress stage.
#[derive(Debug, Clone, Copy)]
pub struct VertexCutIngress {
    algorithm: IngressAlgorithm,
    num_partitions: u32,
    grid_side: u32,
}

impl VertexCutIngress {
    pub fn new(algorithm: IngressAlgorithm, num_partitions: u32) -> Result<Self> {
        if num_partitions == 0 {
            return Err(Error::Configuration("num_partitions must be > 0".into()));
        }
        let grid_side = match algorithm {
            IngressAlgorithm::Grid => grid_side(num_partitions)?,
            _ => 0,
        };
        Ok(Self { algorithm, num_partitions, grid_side })
    }

    pub fn from_code(code: u32, num_partitions: u32) -> Result<Self> {
        Self::new(IngressAlgorithm::from_code(code)?, num_partitions)
    }

    pub fn algorithm(&self) -> IngressAlgorithm {
        self.algorithm
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    /// Place `graph`. Edges are visited in the order given.
    pub fn run(&self, graph: DedupOutput) -> IngressResult {
        let DedupOutput { vertices, edges } = graph;
        let mut state = PlacementState::new(self.num_partitions, &edges);
        let mut per_partition: Vec<Vec<Edge>> = vec![Vec::new(); self.num_partitions as usize];
        // vertex → partition → edges of that vertex placed there
        let mut spread: BTreeMap<VertexId, BTreeMap<PartitionId, u64>> = BTreeMap::new();

        for edge in edges {
            let p = match self.algorithm {
                IngressAlgorithm::Random => state.random(&edge),
                IngressAlgorithm::Oblivious => state.oblivious(&edge),
                IngressAlgorithm::Grid => state.grid(&edge, self.grid_side),
            };
            state.record(&edge, p);
            for v in [&edge.source, &edge.dest] {
                *spread.entry(v.clone()).or_default().entry(p).or_default() += 1;
            }
            per_partition[p as usize].push(edge);
        }

        let mut properties: BTreeMap<VertexId, PropertyMap> = vertices
            .into_iter()
            .map(|v| (v.id, v.properties))
            .collect();
        for id in spread.keys() {
            properties.entry(id.clone()).or_default();
        }

        let records = properties
            .into_iter()
            .map(|(id, props)| {
                let (owner, mirrors) = match spread.get(&id) {
                    Some(counts) => choose_owner(&id, counts),
                    None => (partition_of(vertex_hash(&id), self.num_partitions), Vec::new()),
                };
                VertexRecord::new(id, owner, mirrors, props)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            algorithm = ?self.algorithm,
            vertices = records.len(),
            replicas = records.iter().map(|r| r.fan_out()).sum::<usize>(),
            "ingress placed graph"
        );
        IngressResult { records, edges: per_partition }
    }
}

/// Side of the square grid holding `num_partitions` cells. Fails unless the
/// count is a perfect square.
pub fn grid_side(num_partitions: u32) -> Result<u32> {
    let side = (num_partitions as f64).sqrt().round() as u64;
    if side * side != u64::from(num_partitions) {
        return Err(Error::Configuration(format!(
            "grid ingress needs a square partition count, got {num_partitions}"
        )));
    }
    Ok(side as u32)
}

/// Owner = most edges; ties by vertex hash over sorted candidates.
fn choose_owner(id: &VertexId, counts: &BTreeMap<PartitionId, u64>) -> (PartitionId, Vec<PartitionId>) {
    let best = counts.values().copied().max().unwrap_or(0);
    let candidates: Vec<PartitionId> = counts
        .iter()
        .filter(|&(_, &n)| n == best)
        .map(|(&p, _)| p)
        .collect();
    let owner = candidates[(vertex_hash(id) % candidates.len() as u64) as usize];
    let mirrors = counts.keys().copied().filter(|&p| p != owner).collect();
    (owner, mirrors)
}
