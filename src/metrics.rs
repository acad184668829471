//! Ingress counters.
//!
//! Every stage takes an `&IngressMetrics` and bumps counters for the records
//! it drops or fails on. Skipped records never fail a task; they surface
//! only here and in the logs.
//!
//! Counters are atomics so one handle can be shared by tasks running on
//! different threads. `snapshot()` freezes the values for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counter names, one per event the stages report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    RecordsRead,
    RecordsOversized,
    RecordsUnparsable,
    RecordsMalformed,
    SelfLoopsDropped,
    BidirectionalDropped,
    EdgesMerged,
    VerticesMerged,
    WriteErrors,
    PositionMismatches,
}

impl Counter {
    pub const ALL: [Counter; 10] = [
        Counter::RecordsRead,
        Counter::RecordsOversized,
        Counter::RecordsUnparsable,
        Counter::RecordsMalformed,
        Counter::SelfLoopsDropped,
        Counter::BidirectionalDropped,
        Counter::EdgesMerged,
        Counter::VerticesMerged,
        Counter::WriteErrors,
        Counter::PositionMismatches,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Counter::RecordsRead => "records_read",
            Counter::RecordsOversized => "records_oversized",
            Counter::RecordsUnparsable => "records_unparsable",
            Counter::RecordsMalformed => "records_malformed",
            Counter::SelfLoopsDropped => "self_loops_dropped",
            Counter::BidirectionalDropped => "bidirectional_dropped",
            Counter::EdgesMerged => "edges_merged",
            Counter::VerticesMerged => "vertices_merged",
            Counter::WriteErrors => "write_errors",
            Counter::PositionMismatches => "position_mismatches",
        }
    }
}

/// Metrics handle passed through the call chain.
#[derive(Debug, Default)]
pub struct IngressMetrics {
    counters: [AtomicU64; Counter::ALL.len()],
}

impl IngressMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&self, counter: Counter, n: u64) {
        self.counters[counter.slot()].fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_read: self.get(Counter::RecordsRead),
            records_oversized: self.get(Counter::RecordsOversized),
            records_unparsable: self.get(Counter::RecordsUnparsable),
            records_malformed: self.get(Counter::RecordsMalformed),
            self_loops_dropped: self.get(Counter::SelfLoopsDropped),
            bidirectional_dropped: self.get(Counter::BidirectionalDropped),
            edges_merged: self.get(Counter::EdgesMerged),
            vertices_merged: self.get(Counter::VerticesMerged),
            write_errors: self.get(Counter::WriteErrors),
            position_mismatches: self.get(Counter::PositionMismatches),
        }
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub records_read: u64,
    pub records_oversized: u64,
    pub records_unparsable: u64,
    pub records_malformed: u64,
    pub self_loops_dropped: u64,
    pub bidirectional_dropped: u64,
    pub edges_merged: u64,
    pub vertices_merged: u64,
    pub write_errors: u64,
    pub position_mismatches: u64,
}
