//! # Record Boundary Reader
//!
//! Pulls complete delimited records (`<page>…</page>`) out of one split of
//! a byte stream.
//!
//! ## Split ownership
//!
//! A split is the window `[start, end)` of the stream. A record belongs to
//! the split in which the first byte of its start delimiter lies:
//!
//! - scanning for a start delimiter stops once position ≥ `end`, unless a
//!   partial match that began before `end` is still in progress
//! - once a start delimiter is matched, scanning for the end delimiter runs
//!   past `end` as far as needed
//!
//! So every record is produced by exactly one split's reader, even when it
//! straddles a boundary.
//!
//! ## Position tracking
//!
//! Decompressing streams cannot seek or report a position, so the reader
//! counts bytes itself. Seekable sources additionally report the stream
//! position; after each record the two are compared and a mismatch is
//! handled per `PositionCheck`.
//!
//! ```text
//!   ... <page>AB</page><page>CD</page> ...
//!             ^  |end
//!   split 1 returns <page>AB</page>; split 2 starts scanning inside it
//!   and only sees <page>CD</page>
//! ```

pub mod source;

use std::io::{Cursor, Read, Seek};

use serde::{Deserialize, Serialize};

use crate::metrics::{Counter, IngressMetrics};
use crate::{Error, Result};

pub use source::{ByteSource, CountedSource, SeekableSource};

// ============================================================================
// Configuration types
// ============================================================================

/// Literal start/end delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    start: Vec<u8>,
    end: Vec<u8>,
}

impl Delimiters {
    pub fn new(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Result<Self> {
        let (start, end) = (start.into(), end.into());
        if start.is_empty() || end.is_empty() {
            return Err(Error::Configuration("record delimiters must be non-empty".into()));
        }
        Ok(Self { start, end })
    }

    /// `<tag>` / `</tag>`.
    pub fn xml_tag(tag: &str) -> Result<Self> {
        Self::new(format!("<{tag}>"), format!("</{tag}>"))
    }

    pub fn start(&self) -> &[u8] { &self.start }
    pub fn end(&self) -> &[u8] { &self.end }
}

/// What to do when the counted position disagrees with the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionCheck {
    /// Warn and keep reading.
    #[default]
    Log,
    /// Stop the reader with `Error::PositionMismatch`.
    Fatal,
}

/// Byte window `[start, end)` of the input owned by one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitWindow {
    pub start: u64,
    pub end: u64,
}

impl SplitWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Cut `len` bytes into `n` contiguous windows (the last absorbs the
    /// remainder). `n == 0` is treated as one window.
    pub fn divide(len: u64, n: usize) -> Vec<SplitWindow> {
        let n = n.max(1) as u64;
        let step = len / n;
        (0..n)
            .map(|i| {
                let start = i * step;
                let end = if i + 1 == n { len } else { start + step };
                SplitWindow { start, end }
            })
            .collect()
    }
}

/// A complete record, delimiters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Stream offset of the first byte of the start delimiter.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl RawRecord {
    /// The record body between the delimiters.
    pub fn body(&self, delimiters: &Delimiters) -> &[u8] {
        let from = delimiters.start.len().min(self.bytes.len());
        let to = self.bytes.len().saturating_sub(delimiters.end.len()).max(from);
        &self.bytes[from..to]
    }
}

// ============================================================================
// RecordBoundaryReader
// ============================================================================

enum EndScan {
    Found,
    Eof,
    Oversized,
}

/// Lazy, single-use sequence of the records in one split.
///
/// Iteration yields `Result<RawRecord>`; after the first `None` or error
/// the reader stays exhausted.
pub struct RecordBoundaryReader<'m, S> {
    source: S,
    delimiters: Delimiters,
    pos: u64,
    end: u64,
    position_check: PositionCheck,
    max_record_bytes: Option<usize>,
    metrics: &'m IngressMetrics,
    done: bool,
}

impl<'m, R: Read> RecordBoundaryReader<'m, CountedSource<R>> {
    /// Open over a non-seekable stream. The first `window.start` bytes are
    /// read and discarded.
    pub fn open(
        input: R,
        window: SplitWindow,
        delimiters: Delimiters,
        metrics: &'m IngressMetrics,
    ) -> Result<Self> {
        let (source, skipped) = CountedSource::skipping(input, window.start)?;
        Ok(Self::with_source(source, skipped, window.end, delimiters, metrics))
    }
}

impl<'m, R: Read + Seek> RecordBoundaryReader<'m, SeekableSource<R>> {
    /// Open over a seekable stream, positioned at `window.start`.
    pub fn open_seekable(
        input: R,
        window: SplitWindow,
        delimiters: Delimiters,
        metrics: &'m IngressMetrics,
    ) -> Result<Self> {
        let source = SeekableSource::at(input, window.start)?;
        Ok(Self::with_source(source, window.start, window.end, delimiters, metrics))
    }
}

impl<'m, S: ByteSource> RecordBoundaryReader<'m, S> {
    /// Scan `source`, which is already at stream offset `pos`.
    pub fn with_source(
        source: S,
        pos: u64,
        end: u64,
        delimiters: Delimiters,
        metrics: &'m IngressMetrics,
    ) -> Self {
        Self {
            source,
            delimiters,
            pos,
            end,
            position_check: PositionCheck::default(),
            max_record_bytes: None,
            metrics,
            done: false,
        }
    }

    pub fn with_position_check(mut self, check: PositionCheck) -> Self {
        self.position_check = check;
        self
    }

    /// Drop records that grow past `limit` bytes instead of buffering them.
    pub fn with_max_record_bytes(mut self, limit: usize) -> Self {
        self.max_record_bytes = Some(limit);
        self
    }

    /// Bytes consumed so far, as a stream offset.
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.source.next_byte()?;
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    /// Find the next start delimiter inside the window. Returns the offset
    /// of its first byte.
    fn scan_for_start(&mut self) -> Result<Option<u64>> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let mut i = 0;
        loop {
            let Some(b) = self.next_byte()? else {
                return Ok(None);
            };
            let delim = &self.delimiters.start;
            if b == delim[i] {
                i += 1;
                if i == delim.len() {
                    return Ok(Some(self.pos - delim.len() as u64));
                }
            } else {
                // Restart on this byte only if it still lies inside the window.
                i = if b == delim[0] && self.pos - 1 < self.end { 1 } else { 0 };
            }
            if i == 0 && self.pos >= self.end {
                return Ok(None);
            }
        }
    }

    /// Append bytes to `buf` until the end delimiter completes.
    fn scan_for_end(&mut self, buf: &mut Vec<u8>) -> Result<EndScan> {
        let mut i = 0;
        loop {
            let Some(b) = self.next_byte()? else {
                return Ok(EndScan::Eof);
            };
            buf.push(b);
            let delim = &self.delimiters.end;
            if b == delim[i] {
                i += 1;
                if i == delim.len() {
                    return Ok(EndScan::Found);
                }
            } else {
                i = if b == delim[0] { 1 } else { 0 };
            }
            if self.max_record_bytes.is_some_and(|max| buf.len() > max) {
                return Ok(EndScan::Oversized);
            }
        }
    }

    fn check_position(&mut self) -> Result<()> {
        let Some(reported) = self.source.reported_position() else {
            return Ok(());
        };
        let reported = reported?;
        if reported == self.pos {
            return Ok(());
        }
        self.metrics.incr(Counter::PositionMismatches);
        match self.position_check {
            PositionCheck::Log => {
                tracing::warn!(counted = self.pos, reported, "stream position mismatch");
                Ok(())
            }
            PositionCheck::Fatal => Err(Error::PositionMismatch { counted: self.pos, reported }),
        }
    }

    /// Next complete record of this split, or `None` when the split is done.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>> {
        loop {
            let Some(offset) = self.scan_for_start()? else {
                return Ok(None);
            };
            let mut bytes = self.delimiters.start.clone();
            match self.scan_for_end(&mut bytes)? {
                EndScan::Found => {
                    self.check_position()?;
                    self.metrics.incr(Counter::RecordsRead);
                    return Ok(Some(RawRecord { offset, bytes }));
                }
                EndScan::Eof => {
                    tracing::debug!(offset, "end of stream inside a record");
                    return Ok(None);
                }
                EndScan::Oversized => {
                    self.metrics.incr(Counter::RecordsOversized);
                    tracing::warn!(offset, size = bytes.len(), "dropping oversized record");
                }
            }
        }
    }
}

impl<S: ByteSource> Iterator for RecordBoundaryReader<'_, S> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

// ============================================================================
// In-memory helper
// ============================================================================

/// Read every record of `input`, cut into `splits` windows, one reader per
/// window, in split order.
pub fn read_splits(
    input: &[u8],
    splits: usize,
    delimiters: &Delimiters,
    position_check: PositionCheck,
    max_record_bytes: Option<usize>,
    metrics: &IngressMetrics,
) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for window in SplitWindow::divide(input.len() as u64, splits) {
        let mut reader = RecordBoundaryReader::open_seekable(
            Cursor::new(input),
            window,
            delimiters.clone(),
            metrics,
        )?
        .with_position_check(position_check);
        if let Some(limit) = max_record_bytes {
            reader = reader.with_max_record_bytes(limit);
        }
        let before = records.len();
        for record in reader {
            records.push(record?);
        }
        tracing::debug!(
            start = window.start,
            end = window.end,
            records = records.len() - before,
            "split read"
        );
    }
    Ok(records)
}
