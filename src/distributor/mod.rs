//! # Vertex Record Distributor
//!
//! Fans each vertex record out to its owner and every mirror, then
//! aggregates what each partition received.
//!
//! ```text
//! record(owner=2, mirrors=[0,1,4])
//!   ──fan_out──▶ (0, r) (1, r) (2, r) (4, r)
//!   ──aggregate──▶ partition 2: vertices +1, owned +1
//!                  partitions 0,1,4: vertices +1
//! ```
//!
//! Unparsable or misplaced records are logged, counted as malformed and
//! skipped; the rest of the stream is still processed.

pub mod writer;

use crate::ingress::IngressAlgorithm;
use crate::metrics::{Counter, IngressMetrics};
use crate::model::{PartitionId, PartitionOutput, VertexRecord};
use crate::{Error, Result};

pub use writer::{DirectoryWriter, PartitionWriter, write_all};

/// Reduce side for one partition.
#[derive(Debug, Clone)]
pub struct PartitionAggregator {
    output: PartitionOutput,
}

impl PartitionAggregator {
    pub fn new(partition: PartitionId) -> Self {
        Self { output: PartitionOutput::new(partition) }
    }

    pub fn accept(&mut self, record: VertexRecord) {
        let meta = &mut self.output.meta;
        meta.num_vertices += 1;
        if record.owner == self.output.partition {
            meta.num_own_vertices += 1;
        }
        self.output.records.push(record);
    }

    pub fn finish(self) -> PartitionOutput {
        self.output
    }
}

/// Validated distribution stage.
pub struct VertexRecordDistributor<'m> {
    algorithm: IngressAlgorithm,
    num_partitions: u32,
    metrics: &'m IngressMetrics,
}

impl<'m> VertexRecordDistributor<'m> {
    /// Validate the ingress selector and partition count before any record
    /// is touched.
    pub fn new(num_partitions: u32, ingress_code: u32, metrics: &'m IngressMetrics) -> Result<Self> {
        let algorithm = IngressAlgorithm::from_code(ingress_code)?;
        if num_partitions == 0 {
            return Err(Error::Configuration("num_partitions must be > 0".into()));
        }
        Ok(Self { algorithm, num_partitions, metrics })
    }

    pub fn algorithm(&self) -> IngressAlgorithm {
        self.algorithm
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    /// Map side: one `(partition, copy)` per owner and mirror.
    pub fn fan_out(&self, record: &VertexRecord) -> Result<Vec<(PartitionId, VertexRecord)>> {
        record.validate(self.num_partitions)?;
        Ok(record.partitions().map(|p| (p, record.clone())).collect())
    }

    /// Distribute a stream of records. Items that failed upstream (or fail
    /// validation here) are skipped.
    pub fn distribute<I>(&self, records: I) -> Vec<PartitionOutput>
    where
        I: IntoIterator<Item = Result<VertexRecord>>,
    {
        let mut partitions: Vec<PartitionAggregator> =
            (0..self.num_partitions).map(PartitionAggregator::new).collect();

        for item in records {
            let copies = match item.and_then(|r| self.fan_out(&r)) {
                Ok(copies) => copies,
                Err(err) => {
                    self.metrics.incr(Counter::RecordsMalformed);
                    tracing::warn!(error = %err, "skipping vertex record");
                    continue;
                }
            };
            for (p, copy) in copies {
                partitions[p as usize].accept(copy);
            }
        }

        let outputs: Vec<PartitionOutput> =
            partitions.into_iter().map(PartitionAggregator::finish).collect();
        tracing::debug!(
            partitions = outputs.len(),
            copies = outputs.iter().map(|o| o.meta.num_vertices).sum::<u64>(),
            "vertex records distributed"
        );
        outputs
    }

    /// Distribute wire-format lines (one JSON record per line). Blank lines
    /// are ignored.
    pub fn distribute_lines<'a, I>(&self, lines: I) -> Vec<PartitionOutput>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.distribute(
            lines
                .into_iter()
                .filter(|l| !l.trim().is_empty())
                .map(VertexRecord::from_json),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingress::INGRESS_CODE_LIMIT;
    use crate::model::{PropertyMap, VertexId};

    fn record(id: i64, owner: PartitionId, mirrors: &[PartitionId]) -> VertexRecord {
        VertexRecord::new(VertexId::Long(id), owner, mirrors.iter().copied(), PropertyMap::new())
    }

    #[test]
    fn test_selector_validated_up_front() {
        let m = IngressMetrics::new();
        assert!(VertexRecordDistributor::new(4, INGRESS_CODE_LIMIT, &m).is_ok());
        assert!(matches!(
            VertexRecordDistributor::new(4, INGRESS_CODE_LIMIT + 1, &m),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(VertexRecordDistributor::new(0, 0, &m), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_fan_out_owner_and_mirrors() {
        let m = IngressMetrics::new();
        let d = VertexRecordDistributor::new(5, 0, &m).unwrap();
        let out = d.distribute([Ok(record(1, 2, &[0, 1, 4]))]);

        let holding: Vec<PartitionId> = out
            .iter()
            .filter(|p| !p.records.is_empty())
            .map(|p| p.partition)
            .collect();
        assert_eq!(holding, vec![0, 1, 2, 4]);
        assert_eq!(out[2].meta.num_own_vertices, 1);
        for p in [0, 1, 4] {
            assert_eq!(out[p].meta.num_vertices, 1);
            assert_eq!(out[p].meta.num_own_vertices, 0);
        }
        assert_eq!(out[3].meta.num_vertices, 0);
    }

    #[test]
    fn test_malformed_skipped() {
        let m = IngressMetrics::new();
        let d = VertexRecordDistributor::new(3, 1, &m).unwrap();
        let out = d.distribute_lines([
            r#"{"id": 1, "owner": 0, "mirrors": [1]}"#,
            "not json",
            r#"{"id": 2, "owner": 7, "mirrors": []}"#,
            "",
            r#"{"id": 3, "owner": 2, "mirrors": [], "name": "c"}"#,
        ]);
        let total: u64 = out.iter().map(|p| p.meta.num_vertices).sum();
        let owned: u64 = out.iter().map(|p| p.meta.num_own_vertices).sum();
        assert_eq!(total, 3);
        assert_eq!(owned, 2);
        assert_eq!(m.get(Counter::RecordsMalformed), 2);
    }

    #[test]
    fn test_aggregator_counts() {
        let mut agg = PartitionAggregator::new(1);
        agg.accept(record(1, 1, &[]));
        agg.accept(record(2, 0, &[1]));
        let out = agg.finish();
        assert_eq!(out.meta.num_vertices, 2);
        assert_eq!(out.meta.num_own_vertices, 1);
        assert_eq!(out.records.len(), 2);
    }
}
