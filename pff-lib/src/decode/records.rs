use std::io::{ErrorKind, Read};

use serde_json::{Map, Value};

use super::metadata::parse_header;
use crate::geometry::FileGeometry;
use crate::layout::Layout;
use crate::{Error, Result};

/// A single raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based sample index in the file.
    pub index: usize,
    /// Header bytes, including the trailing sentinel.
    pub metadata: Vec<u8>,
    /// Little-endian pixel bytes.
    pub data: Vec<u8>,
}

impl Record {
    /// Decode this record's JSON header.
    ///
    /// # Errors
    /// [Error::Json] if the header is not a JSON object.
    pub fn metadata_json(&self) -> Result<Map<String, Value>> {
        let end = self.metadata.len().saturating_sub(Layout::SENTINEL_LEN);
        parse_header(&self.metadata[..end])
    }
}

pub struct RecordIter<R>
where
    R: Read,
{
    reader: R,
    metadata_width: usize,
    record_width: usize,
    index: usize,
    done: bool,
}

impl<R> RecordIter<R>
where
    R: Read,
{
    fn new(reader: R, geometry: &FileGeometry) -> Self {
        RecordIter {
            reader,
            metadata_width: geometry.metadata_width,
            record_width: geometry.record_width,
            index: 0,
            done: false,
        }
    }

    /// Fill `buf` as far as possible, returning the number of bytes read.
    ///
    /// `read_exact` fails with `UnexpectedEof` without saying how many bytes arrived,
    /// so it cannot tell a clean end at a record boundary from a partial record.
    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

impl<R> Iterator for RecordIter<R>
where
    R: Read,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.record_width];
        let filled = match self.fill(&mut buf) {
            Ok(n) => n,
            Err(err) => {
                self.done = true;
                return Some(Err(err.into()));
            }
        };
        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < self.record_width {
            self.done = true;
            return Some(Err(Error::TruncatedRecord {
                actual: self.index * self.record_width + filled,
                record_width: self.record_width,
            }));
        }

        let data = buf.split_off(self.metadata_width);
        let record = Record {
            index: self.index,
            metadata: buf,
            data,
        };
        self.index += 1;
        Some(Ok(record))
    }
}

/// Return an iterator providing each [Record] read from `reader`, one record at a time.
///
/// The iterator ends at end-of-file on a record boundary. A partial record at the end
/// produces [Error::TruncatedRecord], after which the iterator is done.
pub fn read_records<R>(reader: R, geometry: &FileGeometry) -> RecordIter<R>
where
    R: Read,
{
    RecordIter::new(reader, geometry)
}
