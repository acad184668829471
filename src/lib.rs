//! # graph-ingress: Property Graph Ingestion and Vertex-Cut Partitioning
//!
//! Turns raw delimited records into property-graph elements, collapses
//! duplicates, and spreads the result over a fixed number of partitions
//! with vertex replication (owner + mirrors).
//!
//! ## Design Principles
//!
//! 1. **Pure folds per batch**: every stage consumes one split / key-group /
//!    partition and emits output with no hidden side effects, so a task can
//!    be re-run from the same input
//! 2. **Clean DTOs**: `Vertex`, `Edge`, `VertexRecord`, `Value` cross all
//!    stage boundaries
//! 3. **Strategies are data**: tokenizers, key functions and ingress
//!    algorithms are tagged enums chosen by configuration
//! 4. **Explicit metrics**: counters travel through the call chain as an
//!    `IngressMetrics` handle, never as globals
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graph_ingress::{IngressConfig, IngressMetrics, IngressPipeline};
//!
//! # fn example() -> graph_ingress::Result<()> {
//! let config = IngressConfig::load("ingress.toml")?;
//! let metrics = IngressMetrics::new();
//! let pipeline = IngressPipeline::new(config, &metrics)?;
//!
//! let input = std::fs::read("dump.xml")?;
//! let partitions = pipeline.run(&input, 4)?;
//! for p in &partitions {
//!     println!("partition {}: {} vertices", p.partition, p.meta.num_vertices);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! | Stage | Module | Unit of work |
//! |-------|--------|--------------|
//! | Boundary reading | `reader` | one input split |
//! | Tokenizing | `tokenizer` | one raw record |
//! | Grouping keys | `key` | one element |
//! | Dedup / merge | `dedup` | one key-group |
//! | Owner + mirrors | `ingress` | the deduplicated graph |
//! | Fan-out | `distributor` | one partition's incoming records |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod reader;
pub mod tokenizer;
pub mod key;
pub mod dedup;
pub mod ingress;
pub mod distributor;
pub mod metrics;
pub mod config;
pub mod logging;
pub mod pipeline;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Edge, EdgeId, GraphElement, PartitionId, PartitionMeta, PartitionOutput,
    PropertyMap, Value, Vertex, VertexId, VertexRecord,
};

// ============================================================================
// Re-exports: Stages
// ============================================================================

pub use reader::{Delimiters, PositionCheck, RawRecord, RecordBoundaryReader, SplitWindow};
pub use tokenizer::{Tokenizer, TokenizerKind, Tokens};
pub use key::KeyFunction;
pub use dedup::{DedupConfig, DedupOutput, GraphElementDeduplicator, Reducer};
pub use ingress::{IngressAlgorithm, IngressResult, VertexCutIngress, INGRESS_CODE_LIMIT};
pub use distributor::{DirectoryWriter, PartitionWriter, VertexRecordDistributor};
pub use metrics::{IngressMetrics, MetricsSnapshot};
pub use config::IngressConfig;
pub use pipeline::IngressPipeline;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Write error on partition {partition}: {source}")]
    Write {
        partition: PartitionId,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream position mismatch: counted {counted}, stream reports {reported}")]
    PositionMismatch { counted: u64, reported: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
