use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::decode::{decode, read_records, DecodeOptions, MetadataTable, RecordIter, SampleBlock};
use crate::geometry::FileGeometry;
use crate::{Error, Result};

/// A PFF data file on disk.
///
/// The record geometry is resolved from the file name when the handle is created.
/// The file itself is only opened for the duration of each read.
///
/// # Example
/// ```no_run
/// use pff::{DecodeOptions, PffFile};
///
/// let pff = PffFile::open("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff")?;
/// let opts = DecodeOptions::builder().include_metadata(true).build();
/// let (data, metadata) = pff.read(&opts)?;
/// println!("{:?} {:?}", data.shape(), metadata.field("pkt_num"));
/// # Ok::<(), pff::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PffFile {
    path: PathBuf,
    geometry: FileGeometry,
}

impl PffFile {
    /// Create a handle for the data file at `path`.
    ///
    /// # Errors
    /// Any error resolving the geometry from the file name, see
    /// [FileGeometry::from_file_name].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let geometry = FileGeometry::from_file_name(&path)?;
        Ok(Self { path, geometry })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn geometry(&self) -> &FileGeometry {
        &self.geometry
    }

    /// Number of records in the file.
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be inspected, or
    /// [crate::Error::TruncatedRecord] if it does not hold a whole number of records.
    pub fn sample_count(&self) -> Result<usize> {
        let len = fs::metadata(&self.path)?.len();
        self.geometry.sample_count(len)
    }

    /// Decode the file. See [decode].
    ///
    /// An empty file decodes to an empty block, consistent with [Self::sample_count].
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be opened, [crate::Error::TruncatedRecord]
    /// if a non-empty file yields no bytes, otherwise see [decode].
    pub fn read(&self, options: &DecodeOptions) -> Result<(SampleBlock, MetadataTable)> {
        debug!(path = ?self.path, ?options, "decoding");
        let file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        let zult = decode(BufReader::new(file), &self.geometry, options)?;
        if len > 0 && zult.0.samples() == 0 && options.sample_limit != Some(0) {
            return Err(Error::TruncatedRecord {
                actual: 0,
                record_width: self.geometry.record_width,
            });
        }
        Ok(zult)
    }

    /// Iterate over the raw records of the file. See [read_records].
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be opened.
    pub fn records(&self) -> Result<RecordIter<BufReader<File>>> {
        let file = File::open(&self.path)?;
        Ok(read_records(BufReader::new(file), &self.geometry))
    }
}
