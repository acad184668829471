//! Partition output writers.
//!
//! ```text
//! <root>/
//!   partition_0/
//!     vrecords.jsonl   one vertex record per line
//!     edges.jsonl      one edge per line
//!     meta.json        {"numVertices": .., "numOwnVertices": ..}
//!   partition_1/
//!   ...
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::metrics::{Counter, IngressMetrics};
use crate::model::{PartitionId, PartitionOutput};
use crate::Error;

pub const RECORDS_FILE: &str = "vrecords.jsonl";
pub const EDGES_FILE: &str = "edges.jsonl";
pub const META_FILE: &str = "meta.json";

/// Sink for one partition's output.
pub trait PartitionWriter {
    fn write_partition(&mut self, output: &PartitionOutput) -> io::Result<()>;
}

/// Writes the directory-per-partition layout under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    root: PathBuf,
}

impl DirectoryWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn partition_dir(&self, partition: PartitionId) -> PathBuf {
        partition_dir(&self.root, partition)
    }
}

pub fn partition_dir(root: &Path, partition: PartitionId) -> PathBuf {
    root.join(format!("partition_{partition}"))
}

fn write_jsonl<T: serde::Serialize>(path: &Path, items: &[T]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut out, item).map_err(io::Error::other)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

impl PartitionWriter for DirectoryWriter {
    fn write_partition(&mut self, output: &PartitionOutput) -> io::Result<()> {
        let dir = self.partition_dir(output.partition);
        fs::create_dir_all(&dir)?;
        write_jsonl(&dir.join(RECORDS_FILE), &output.records)?;
        write_jsonl(&dir.join(EDGES_FILE), &output.edges)?;
        let meta = serde_json::to_vec(&output.meta).map_err(io::Error::other)?;
        fs::write(dir.join(META_FILE), meta)
    }
}

/// Write every partition. A failing partition is logged and counted and
/// the rest are still written. Returns how many partitions succeeded.
pub fn write_all<W: PartitionWriter + ?Sized>(
    writer: &mut W,
    outputs: &[PartitionOutput],
    metrics: &IngressMetrics,
) -> usize {
    let mut written = 0;
    for output in outputs {
        match writer.write_partition(output) {
            Ok(()) => written += 1,
            Err(source) => {
                let err = Error::Write { partition: output.partition, source };
                metrics.incr(Counter::WriteErrors);
                tracing::warn!(error = %err, "partition output failed");
            }
        }
    }
    written
}
