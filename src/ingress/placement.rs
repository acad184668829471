//! Edge placement strategies.
//!
//! Each strategy sees the edges one at a time and picks a partition. The
//! greedy strategies look at where each endpoint has already been placed.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::key::{pair_hash, partition_of, vertex_hash};
use crate::model::{Edge, PartitionId, VertexId};

type PartSet = SmallVec<[PartitionId; 4]>;

/// Running placement state shared by the strategies.
pub(crate) struct PlacementState {
    num_partitions: u32,
    /// Edges placed on each partition.
    load: Vec<u64>,
    /// Partitions each vertex has been placed on.
    replicas: HashMap<VertexId, PartSet>,
    /// Edges per vertex not placed yet.
    remaining: HashMap<VertexId, u64>,
}

impl PlacementState {
    pub(crate) fn new(num_partitions: u32, edges: &[Edge]) -> Self {
        let mut remaining: HashMap<VertexId, u64> = HashMap::new();
        for e in edges {
            *remaining.entry(e.source.clone()).or_default() += 1;
            *remaining.entry(e.dest.clone()).or_default() += 1;
        }
        Self {
            num_partitions,
            load: vec![0; num_partitions as usize],
            replicas: HashMap::new(),
            remaining,
        }
    }

    fn replicas_of(&self, v: &VertexId) -> &[PartitionId] {
        self.replicas.get(v).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Least loaded partition among `candidates`, lowest id on ties.
    fn least_loaded(&self, candidates: impl IntoIterator<Item = PartitionId>) -> Option<PartitionId> {
        candidates.into_iter().min_by_key(|&p| (self.load[p as usize], p))
    }

    fn least_loaded_overall(&self) -> PartitionId {
        self.least_loaded(0..self.num_partitions).unwrap_or(0)
    }

    pub(crate) fn record(&mut self, edge: &Edge, partition: PartitionId) {
        self.load[partition as usize] += 1;
        for v in [&edge.source, &edge.dest] {
            let set = self.replicas.entry(v.clone()).or_default();
            if !set.contains(&partition) {
                set.push(partition);
            }
            if let Some(n) = self.remaining.get_mut(v) {
                *n = n.saturating_sub(1);
            }
        }
    }

    pub(crate) fn random(&self, edge: &Edge) -> PartitionId {
        partition_of(pair_hash(&edge.source, &edge.dest), self.num_partitions)
    }

    pub(crate) fn oblivious(&self, edge: &Edge) -> PartitionId {
        let a = self.replicas_of(&edge.source);
        let b = self.replicas_of(&edge.dest);

        let shared = a.iter().copied().filter(|p| b.contains(p));
        if let Some(p) = self.least_loaded(shared) {
            return p;
        }
        match (a.is_empty(), b.is_empty()) {
            (false, false) => {
                let rem_a = self.remaining.get(&edge.source).copied().unwrap_or(0);
                let rem_b = self.remaining.get(&edge.dest).copied().unwrap_or(0);
                let pick = if rem_a >= rem_b { a } else { b };
                self.least_loaded(pick.iter().copied()).unwrap_or(0)
            }
            (false, true) => self.least_loaded(a.iter().copied()).unwrap_or(0),
            (true, false) => self.least_loaded(b.iter().copied()).unwrap_or(0),
            (true, true) => self.least_loaded_overall(),
        }
    }

    pub(crate) fn grid(&self, edge: &Edge, side: u32) -> PartitionId {
        let cu = grid_constraint(&edge.source, side);
        let cv = grid_constraint(&edge.dest, side);
        let shared = cu.iter().copied().filter(|p| cv.contains(p));
        self.least_loaded(shared).unwrap_or_else(|| self.least_loaded_overall())
    }
}

/// Row ∪ column of the vertex's home cell on a `side × side` grid.
pub(crate) fn grid_constraint(v: &VertexId, side: u32) -> PartSet {
    let n = side * side;
    let home = partition_of(vertex_hash(v), n);
    let (row, col) = (home / side, home % side);
    let mut set: PartSet = (0..side).map(|c| row * side + c).collect();
    set.extend((0..side).map(|r| r * side + col).filter(|&p| p != home));
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_constraints_always_intersect() {
        let side = 3;
        let ids: Vec<VertexId> = (0..30).map(VertexId::Long).collect();
        for u in &ids {
            let cu = grid_constraint(u, side);
            assert_eq!(cu.len(), (2 * side - 1) as usize);
            for v in &ids {
                let cv = grid_constraint(v, side);
                assert!(cu.iter().any(|p| cv.contains(p)));
            }
        }
    }

    #[test]
    fn test_oblivious_reuses_shared_partition() {
        let edges = vec![Edge::new(1, 2), Edge::new(2, 3), Edge::new(1, 3)];
        let mut st = PlacementState::new(4, &edges);
        let p0 = st.oblivious(&edges[0]);
        st.record(&edges[0], p0);
        // Vertex 2 already lives on p0, 3 is new: follow 2.
        let p1 = st.oblivious(&edges[1]);
        assert_eq!(p1, p0);
        st.record(&edges[1], p1);
        // 1 and 3 now share p0.
        assert_eq!(st.oblivious(&edges[2]), p0);
    }

    #[test]
    fn test_least_loaded_when_both_new() {
        let edges = vec![Edge::new(1, 2), Edge::new(3, 4)];
        let mut st = PlacementState::new(2, &edges);
        let p0 = st.oblivious(&edges[0]);
        assert_eq!(p0, 0);
        st.record(&edges[0], p0);
        assert_eq!(st.oblivious(&edges[1]), 1);
    }
}
