//! # Graph Element Deduplicator
//!
//! Collapses duplicate vertices and edges inside one key-group.
//!
//! ## Edge rules (in order)
//!
//! 1. Self-loops are dropped.
//! 2. A known `EdgeId` merges into the existing entry: the reducer if one is
//!    configured, else last-write-wins.
//! 3. With `no_bidirectional`, an edge whose reverse is already present is
//!    dropped. Which direction survives depends on arrival order.
//! 4. Otherwise the edge is inserted (through `reducer.base()` when a
//!    reducer is configured).
//!
//! Vertices follow rules 2 and 4 keyed by vertex id. Labels are first
//! non-null wins, for vertices and edges alike.
//!
//! State lives for one batch: build a deduplicator, feed one group, call
//! `finish()`. Nothing is shared between batches.

pub mod reducer;

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::key::KeyFunction;
use crate::metrics::{Counter, IngressMetrics};
use crate::model::{Edge, EdgeId, GraphElement, PropertyMap, Vertex, VertexId, merge_properties};
use crate::{Error, Result};

pub use reducer::{CountReducer, FnReducer, Reducer, ReducerKind, SumReducer};

/// Edge accumulator: one property map per edge identity.
pub type EdgeSet = HashMap<EdgeId, PropertyMap>;
/// Vertex accumulator: one property map per vertex id.
pub type VertexSet = HashMap<VertexId, PropertyMap>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Keep only one direction of a bidirectional pair.
    pub no_bidirectional: bool,
}

/// What happened to an ingested element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Merged,
    SelfLoop,
    ReverseExists,
}

/// Deduplicated contents of one batch, sorted by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutput {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl DedupOutput {
    pub fn extend(&mut self, other: DedupOutput) {
        self.vertices.extend(other.vertices);
        self.edges.extend(other.edges);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a deduplicator. Both accumulator maps must be supplied.
pub struct DeduplicatorBuilder<'a> {
    config: DedupConfig,
    metrics: &'a IngressMetrics,
    edge_set: Option<EdgeSet>,
    vertex_set: Option<VertexSet>,
    edge_reducer: Option<&'a dyn Reducer>,
    vertex_reducer: Option<&'a dyn Reducer>,
}

impl<'a> DeduplicatorBuilder<'a> {
    pub fn edge_set(mut self, set: EdgeSet) -> Self {
        self.edge_set = Some(set);
        self
    }

    pub fn vertex_set(mut self, set: VertexSet) -> Self {
        self.vertex_set = Some(set);
        self
    }

    pub fn edge_reducer(mut self, reducer: &'a dyn Reducer) -> Self {
        self.edge_reducer = Some(reducer);
        self
    }

    pub fn vertex_reducer(mut self, reducer: &'a dyn Reducer) -> Self {
        self.vertex_reducer = Some(reducer);
        self
    }

    pub fn build(self) -> Result<GraphElementDeduplicator<'a>> {
        let edge_set = self.edge_set
            .ok_or_else(|| Error::Configuration("deduplicator needs an edge accumulator".into()))?;
        let vertex_set = self.vertex_set
            .ok_or_else(|| Error::Configuration("deduplicator needs a vertex accumulator".into()))?;
        Ok(GraphElementDeduplicator {
            config: self.config,
            metrics: self.metrics,
            edge_set,
            edge_labels: HashMap::new(),
            vertex_set,
            vertex_labels: HashMap::new(),
            edge_reducer: self.edge_reducer,
            vertex_reducer: self.vertex_reducer,
        })
    }
}

// ============================================================================
// GraphElementDeduplicator
// ============================================================================

/// Merge state for one key-group.
pub struct GraphElementDeduplicator<'a> {
    config: DedupConfig,
    metrics: &'a IngressMetrics,
    edge_set: EdgeSet,
    edge_labels: HashMap<EdgeId, String>,
    vertex_set: VertexSet,
    vertex_labels: HashMap<VertexId, String>,
    edge_reducer: Option<&'a dyn Reducer>,
    vertex_reducer: Option<&'a dyn Reducer>,
}

impl<'a> GraphElementDeduplicator<'a> {
    pub fn builder(config: DedupConfig, metrics: &'a IngressMetrics) -> DeduplicatorBuilder<'a> {
        DeduplicatorBuilder {
            config,
            metrics,
            edge_set: None,
            vertex_set: None,
            edge_reducer: None,
            vertex_reducer: None,
        }
    }

    /// Fresh empty accumulators, no reducers.
    pub fn for_batch(config: DedupConfig, metrics: &'a IngressMetrics) -> Self {
        Self {
            config,
            metrics,
            edge_set: EdgeSet::new(),
            edge_labels: HashMap::new(),
            vertex_set: VertexSet::new(),
            vertex_labels: HashMap::new(),
            edge_reducer: None,
            vertex_reducer: None,
        }
    }

    pub fn add(&mut self, element: GraphElement) -> Outcome {
        match element {
            GraphElement::Vertex(v) => self.add_vertex(v),
            GraphElement::Edge(e) => self.add_edge(e),
        }
    }

    pub fn add_edge(&mut self, edge: Edge) -> Outcome {
        if edge.is_self_loop() {
            self.metrics.incr(Counter::SelfLoopsDropped);
            return Outcome::SelfLoop;
        }
        let id = edge.id();
        if let Some(acc) = self.edge_set.get_mut(&id) {
            fold(acc, edge.properties, self.edge_reducer);
            if let Some(label) = edge.label {
                self.edge_labels.entry(id).or_insert(label);
            }
            self.metrics.incr(Counter::EdgesMerged);
            return Outcome::Merged;
        }
        if self.config.no_bidirectional && self.edge_set.contains_key(&id.reverse()) {
            self.metrics.incr(Counter::BidirectionalDropped);
            tracing::trace!(edge = %id, "reverse already present, dropping");
            return Outcome::ReverseExists;
        }
        let props = seed(edge.properties, self.edge_reducer);
        if let Some(label) = edge.label {
            self.edge_labels.insert(id.clone(), label);
        }
        self.edge_set.insert(id, props);
        Outcome::Inserted
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Outcome {
        let outcome = if let Some(acc) = self.vertex_set.get_mut(&vertex.id) {
            fold(acc, vertex.properties, self.vertex_reducer);
            self.metrics.incr(Counter::VerticesMerged);
            Outcome::Merged
        } else {
            let props = seed(vertex.properties, self.vertex_reducer);
            self.vertex_set.insert(vertex.id.clone(), props);
            Outcome::Inserted
        };
        if let Some(label) = vertex.label {
            self.vertex_labels.entry(vertex.id).or_insert(label);
        }
        outcome
    }

    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_set.len()
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_set.contains_key(id)
    }

    /// Emit the batch, sorted by id, and drop the merge state.
    pub fn finish(self) -> DedupOutput {
        let mut vertex_labels = self.vertex_labels;
        let mut vertices: Vec<Vertex> = self.vertex_set
            .into_iter()
            .map(|(id, properties)| {
                let label = vertex_labels.remove(&id);
                Vertex { id, properties, label }
            })
            .collect();
        vertices.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        let mut edge_labels = self.edge_labels;
        let mut edges: Vec<Edge> = self.edge_set
            .into_iter()
            .map(|(id, properties)| {
                let label = edge_labels.remove(&id);
                Edge { source: id.source, dest: id.dest, properties, label }
            })
            .collect();
        edges.sort_unstable_by(|a, b| (&a.source, &a.dest).cmp(&(&b.source, &b.dest)));

        DedupOutput { vertices, edges }
    }
}

fn fold(acc: &mut PropertyMap, new: PropertyMap, reducer: Option<&dyn Reducer>) {
    match reducer {
        Some(r) => *acc = r.reduce(new, std::mem::take(acc)),
        None => merge_properties(acc, new),
    }
}

fn seed(new: PropertyMap, reducer: Option<&dyn Reducer>) -> PropertyMap {
    match reducer {
        Some(r) => r.reduce(new, r.base()),
        None => new,
    }
}

// ============================================================================
// Grouped dedup
// ============================================================================

/// Reducers applied while deduplicating.
#[derive(Default, Clone, Copy)]
pub struct Reducers<'a> {
    pub edge: Option<&'a dyn Reducer>,
    pub vertex: Option<&'a dyn Reducer>,
}

/// Group `elements` by `key_fn` and deduplicate each group with its own
/// fresh merge state. Groups are processed in key order; element order
/// inside a group is arrival order.
pub fn dedup_grouped(
    elements: impl IntoIterator<Item = GraphElement>,
    key_fn: KeyFunction,
    config: DedupConfig,
    reducers: Reducers<'_>,
    metrics: &IngressMetrics,
) -> Result<DedupOutput> {
    let mut groups: BTreeMap<u64, Vec<GraphElement>> = BTreeMap::new();
    for element in elements {
        groups.entry(key_fn.element_key(&element)).or_default().push(element);
    }
    tracing::debug!(groups = groups.len(), ?key_fn, "deduplicating key-groups");

    let mut out = DedupOutput::default();
    for (_, group) in groups {
        let mut builder = GraphElementDeduplicator::builder(config, metrics)
            .edge_set(EdgeSet::with_capacity(group.len()))
            .vertex_set(VertexSet::new());
        if let Some(r) = reducers.edge {
            builder = builder.edge_reducer(r);
        }
        if let Some(r) = reducers.vertex {
            builder = builder.vertex_reducer(r);
        }
        let mut dedup = builder.build()?;
        for element in group {
            dedup.add(element);
        }
        out.extend(dedup.finish());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{props, Value};
    use pretty_assertions::assert_eq;

    fn dedup(metrics: &IngressMetrics, no_bidirectional: bool) -> GraphElementDeduplicator<'_> {
        GraphElementDeduplicator::for_batch(DedupConfig { no_bidirectional }, metrics)
    }

    #[test]
    fn test_builder_requires_accumulators() {
        let m = IngressMetrics::new();
        let missing_edges = GraphElementDeduplicator::builder(DedupConfig::default(), &m)
            .vertex_set(VertexSet::new())
            .build();
        assert!(matches!(missing_edges, Err(Error::Configuration(_))));

        let missing_vertices = GraphElementDeduplicator::builder(DedupConfig::default(), &m)
            .edge_set(EdgeSet::new())
            .build();
        assert!(matches!(missing_vertices, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_self_loop_dropped() {
        let m = IngressMetrics::new();
        let mut d = dedup(&m, false);
        assert_eq!(d.add_edge(Edge::new(1, 1)), Outcome::SelfLoop);
        assert_eq!(d.edge_count(), 0);
        assert_eq!(m.get(Counter::SelfLoopsDropped), 1);
    }

    #[test]
    fn test_duplicate_edges_merge_last_write_wins() {
        let m = IngressMetrics::new();
        let mut d = dedup(&m, false);
        d.add_edge(Edge::new(1, 2).with_property("w", 1).with_property("c", "red"));
        assert_eq!(d.add_edge(Edge::new(1, 2).with_property("w", 5)), Outcome::Merged);
        let out = d.finish();
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].properties, props([("w", Value::Int(5)), ("c", Value::from("red"))]));
        assert_eq!(m.get(Counter::EdgesMerged), 1);
    }

    #[test]
    fn test_bidirectional_collapse() {
        let m = IngressMetrics::new();
        let mut on = dedup(&m, true);
        on.add_edge(Edge::new("A", "B").with_label("friend"));
        assert_eq!(on.add_edge(Edge::new("B", "A").with_label("friend")), Outcome::ReverseExists);
        let out = on.finish();
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].source, VertexId::from("A"));

        let mut off = dedup(&m, false);
        off.add_edge(Edge::new("A", "B").with_label("friend"));
        off.add_edge(Edge::new("B", "A").with_label("friend"));
        assert_eq!(off.finish().edges.len(), 2);
    }

    #[test]
    fn test_existing_id_merges_even_with_reverse_present() {
        let m = IngressMetrics::new();
        let mut d = dedup(&m, true);
        d.add_edge(Edge::new(1, 2));
        d.add_edge(Edge::new(2, 1));
        assert_eq!(d.add_edge(Edge::new(1, 2).with_property("x", 1)), Outcome::Merged);
        assert_eq!(d.edge_count(), 1);
    }

    #[test]
    fn test_first_label_wins() {
        let m = IngressMetrics::new();
        let mut d = dedup(&m, false);
        d.add_vertex(Vertex::new(1));
        d.add_vertex(Vertex::new(1).with_label("Person"));
        d.add_vertex(Vertex::new(1).with_label("Robot"));
        d.add_edge(Edge::new(1, 2).with_label("knows"));
        d.add_edge(Edge::new(1, 2).with_label("likes"));
        let out = d.finish();
        assert_eq!(out.vertices[0].label.as_deref(), Some("Person"));
        assert_eq!(out.edges[0].label.as_deref(), Some("knows"));
    }

    #[test]
    fn test_reducer_applied_on_insert_and_merge() {
        let m = IngressMetrics::new();
        let count = CountReducer::new("dups");
        let mut d = GraphElementDeduplicator::builder(DedupConfig::default(), &m)
            .edge_set(EdgeSet::new())
            .vertex_set(VertexSet::new())
            .edge_reducer(&count)
            .vertex_reducer(&SumReducer)
            .build()
            .unwrap();
        d.add_edge(Edge::new(1, 2));
        d.add_edge(Edge::new(1, 2));
        d.add_vertex(Vertex::new(1).with_property("score", 2));
        d.add_vertex(Vertex::new(1).with_property("score", 3));
        let out = d.finish();
        assert_eq!(out.edges[0].properties.get("dups"), Some(&Value::Int(2)));
        assert_eq!(out.vertices[0].properties.get("score"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_output_sorted() {
        let m = IngressMetrics::new();
        let mut d = dedup(&m, false);
        for id in [5, 3, 9, 1] {
            d.add_vertex(Vertex::new(id));
        }
        d.add_edge(Edge::new(3, 1));
        d.add_edge(Edge::new(1, 9));
        let out = d.finish();
        let ids: Vec<_> = out.vertices.iter().map(|v| v.id.clone()).collect();
        assert_eq!(ids, vec![VertexId::Long(1), VertexId::Long(3), VertexId::Long(5), VertexId::Long(9)]);
        assert_eq!(out.edges[0].source, VertexId::Long(1));
    }

    #[test]
    fn test_dedup_grouped_pairs_reverse_edges() {
        let m = IngressMetrics::new();
        let elements = vec![
            GraphElement::Edge(Edge::new("A", "B")),
            GraphElement::Edge(Edge::new("B", "A")),
            GraphElement::Edge(Edge::new("A", "B")),
            GraphElement::Vertex(Vertex::new("A")),
            GraphElement::Vertex(Vertex::new("A")),
        ];
        let out = dedup_grouped(
            elements,
            KeyFunction::UnorderedPair,
            DedupConfig { no_bidirectional: true },
            Reducers::default(),
            &m,
        )
        .unwrap();
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.vertices.len(), 1);
    }
}
