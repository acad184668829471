//! Byte sources the boundary reader scans.
//!
//! Position is always counted by the reader itself. A source may also
//! report the underlying stream position so the reader can cross-check the
//! two; only seekable streams can.

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

/// One byte at a time over a buffered stream.
pub trait ByteSource {
    /// Next byte, or `None` at end of stream.
    fn next_byte(&mut self) -> io::Result<Option<u8>>;

    /// Position the stream itself reports, if it can.
    fn reported_position(&mut self) -> Option<io::Result<u64>> {
        None
    }
}

fn read_byte<B: BufRead>(inner: &mut B) -> io::Result<Option<u8>> {
    loop {
        match inner.fill_buf() {
            Ok([]) => return Ok(None),
            Ok(buf) => {
                let byte = buf[0];
                inner.consume(1);
                return Ok(Some(byte));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// CountedSource
// ============================================================================

/// Any `Read`, including decompressing readers that cannot seek.
pub struct CountedSource<R> {
    inner: BufReader<R>,
}

impl<R: Read> CountedSource<R> {
    /// Wrap `input` and discard its first `skip` bytes.
    ///
    /// Returns the source and how many bytes were actually skipped, which is
    /// less than `skip` when the stream is shorter.
    pub fn skipping(input: R, skip: u64) -> io::Result<(Self, u64)> {
        let mut inner = BufReader::new(input);
        let skipped = io::copy(&mut (&mut inner).take(skip), &mut io::sink())?;
        Ok((Self { inner }, skipped))
    }
}

impl<R: Read> ByteSource for CountedSource<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        read_byte(&mut self.inner)
    }
}

// ============================================================================
// SeekableSource
// ============================================================================

/// Uncompressed files and in-memory cursors.
pub struct SeekableSource<R> {
    inner: BufReader<R>,
}

impl<R: Read + Seek> SeekableSource<R> {
    /// Seek to `start` before buffering.
    pub fn at(mut input: R, start: u64) -> io::Result<Self> {
        input.seek(SeekFrom::Start(start))?;
        Ok(Self { inner: BufReader::new(input) })
    }
}

impl<R: Read + Seek> ByteSource for SeekableSource<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        read_byte(&mut self.inner)
    }

    fn reported_position(&mut self) -> Option<io::Result<u64>> {
        // BufReader accounts for its unread buffer here.
        Some(self.inner.stream_position())
    }
}
