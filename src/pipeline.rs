//! In-process pipeline: every stage, one after the other.
//!
//! ```text
//! bytes ─▶ read splits ─▶ tokenize ─▶ group by key + dedup ─▶ ingress ─▶ distribute ─▶ write
//! ```
//!
//! A real deployment runs each stage as many tasks on an external engine
//! that also does the grouping. Here the stages run sequentially on the
//! calling thread with the same per-task semantics, so a run over the same
//! input always yields the same output.

use std::path::Path;

use crate::config::IngressConfig;
use crate::dedup::{self, DedupOutput, Reducer, Reducers};
use crate::distributor::{self, DirectoryWriter, VertexRecordDistributor};
use crate::ingress::VertexCutIngress;
use crate::metrics::{Counter, IngressMetrics};
use crate::model::{GraphElement, PartitionOutput};
use crate::reader::{self, Delimiters, RawRecord};
use crate::tokenizer::Tokenizer;
use crate::Result;

pub struct IngressPipeline<'m> {
    config: IngressConfig,
    delimiters: Delimiters,
    ingress: VertexCutIngress,
    edge_reducer: Option<Box<dyn Reducer>>,
    vertex_reducer: Option<Box<dyn Reducer>>,
    metrics: &'m IngressMetrics,
}

impl<'m> IngressPipeline<'m> {
    /// Validate `config` and set up every stage. Fails before any input is
    /// read if the configuration is unusable.
    pub fn new(config: IngressConfig, metrics: &'m IngressMetrics) -> Result<Self> {
        config.validate()?;
        let delimiters = config.reader.delimiters()?;
        let ingress = VertexCutIngress::from_code(
            config.partitioning.ingress_code,
            config.partitioning.num_partitions,
        )?;
        Ok(Self {
            edge_reducer: config.dedup.edge_reducer.build(),
            vertex_reducer: config.dedup.vertex_reducer.build(),
            config,
            delimiters,
            ingress,
            metrics,
        })
    }

    pub fn config(&self) -> &IngressConfig {
        &self.config
    }

    /// Boundary-read `input` as `splits` windows.
    pub fn read(&self, input: &[u8], splits: usize) -> Result<Vec<RawRecord>> {
        reader::read_splits(
            input,
            splits,
            &self.delimiters,
            self.config.reader.position_check,
            self.config.reader.max_record_bytes,
            self.metrics,
        )
    }

    /// Tokenize records; unparsable ones are logged, counted and skipped.
    pub fn tokenize(&self, records: &[RawRecord]) -> Vec<GraphElement> {
        let tokenizer = self.config.tokenizer.kind;
        let mut elements = Vec::new();
        for record in records {
            match tokenizer.parse_record(record, &self.delimiters) {
                Ok(tokens) => elements.extend(tokens.into_elements()),
                Err(err) => {
                    self.metrics.incr(Counter::RecordsUnparsable);
                    tracing::warn!(error = %err, "skipping record");
                }
            }
        }
        elements
    }

    /// Group by the configured key function and deduplicate each group.
    pub fn dedup(&self, elements: Vec<GraphElement>) -> Result<DedupOutput> {
        let reducers = Reducers {
            edge: self.edge_reducer.as_deref(),
            vertex: self.vertex_reducer.as_deref(),
        };
        dedup::dedup_grouped(
            elements,
            self.config.dedup.key_function,
            self.config.dedup.dedup_config(),
            reducers,
            self.metrics,
        )
    }

    /// Run every stage over `input` and return the per-partition output.
    pub fn run(&self, input: &[u8], splits: usize) -> Result<Vec<PartitionOutput>> {
        let records = self.read(input, splits)?;
        let elements = self.tokenize(&records);
        let graph = self.dedup(elements)?;
        tracing::debug!(
            records = records.len(),
            vertices = graph.vertices.len(),
            edges = graph.edges.len(),
            "graph deduplicated"
        );

        let placed = self.ingress.run(graph);
        let distributor = VertexRecordDistributor::new(
            self.config.partitioning.num_partitions,
            self.config.partitioning.ingress_code,
            self.metrics,
        )?;
        let mut outputs = distributor.distribute(placed.records.into_iter().map(Ok));
        for (output, edges) in outputs.iter_mut().zip(placed.edges) {
            output.edges = edges;
        }
        Ok(outputs)
    }

    /// `run`, then write the partition layout under `dir`. Partitions that
    /// fail to write are counted in `write_errors`; the rest are kept.
    pub fn run_to_dir(
        &self,
        input: &[u8],
        splits: usize,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<PartitionOutput>> {
        let outputs = self.run(input, splits)?;
        std::fs::create_dir_all(dir.as_ref())?;
        let mut writer = DirectoryWriter::new(dir.as_ref());
        let written = distributor::write_all(&mut writer, &outputs, self.metrics);
        tracing::info!(
            written,
            partitions = outputs.len(),
            dir = %dir.as_ref().display(),
            "partition output written"
        );
        Ok(outputs)
    }
}
