//! Decoding of PFF data file records.
//!
//! A data file is a sequence of fixed width records, each a JSON header followed by
//! the pixel samples. [decode] turns a stream of records into a [SampleBlock] and an
//! optional [MetadataTable]; [read_records] iterates raw records one at a time.
mod block;
mod metadata;
mod records;

pub use block::{Element, SampleBlock};
pub use metadata::{MetadataColumn, MetadataTable, QuadrantMetadata};
pub use records::{read_records, Record, RecordIter};

use std::io::Read;

use tracing::debug;
use typed_builder::TypedBuilder;

use crate::geometry::FileGeometry;
use crate::layout::ElementType;
use crate::{Error, Result};

use block::data_plane;
use metadata::decode_metadata;

/// Options controlling [decode].
///
/// # Example
/// ```
/// use pff::decode::DecodeOptions;
///
/// let opts = DecodeOptions::builder()
///     .sample_limit(100)
///     .include_metadata(true)
///     .build();
/// assert_eq!(opts.channel, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
pub struct DecodeOptions {
    /// Maximum number of samples to decode. All remaining samples when `None`.
    #[builder(default, setter(strip_option))]
    pub sample_limit: Option<usize>,
    /// Samples to skip before the first decoded sample. Not supported yet; must be 0.
    #[builder(default)]
    pub skip: usize,
    /// Only return this pixel.
    #[builder(default, setter(strip_option))]
    pub channel: Option<usize>,
    /// Decode the record headers. This dominates the decode time, so it is off by
    /// default.
    #[builder(default)]
    pub include_metadata: bool,
}

impl DecodeOptions {
    fn validate(&self, geometry: &FileGeometry) -> Result<()> {
        if self.skip != 0 {
            return Err(Error::UnsupportedOption(format!(
                "skip={} is not implemented",
                self.skip
            )));
        }
        if let Some(channel) = self.channel {
            if channel >= geometry.pixel_count {
                return Err(Error::ChannelOutOfRange {
                    channel,
                    pixels: geometry.pixel_count,
                });
            }
        }
        Ok(())
    }
}

/// Decode records from `source` according to `geometry`.
///
/// Reads the whole stream, or at most `sample_limit` records, in a single read and
/// returns the pixel data along with the header values when
/// [DecodeOptions::include_metadata] is set. Without metadata an empty
/// [MetadataTable] is returned.
///
/// # Errors
/// - [Error::UnsupportedOption] if `skip` is not 0
/// - [Error::ChannelOutOfRange] if `channel` is not a valid pixel
/// - [Error::TruncatedRecord] if the bytes read are not a whole number of records
/// - [Error::Json], [Error::UnknownMetadataField], or [Error::MalformedMetadata] if the
///   headers cannot be decoded
/// - [Error::Io] for read failures
///
/// # Example
/// ```
/// use pff::decode::{decode, DecodeOptions};
/// use pff::geometry::FileGeometry;
///
/// let geo = FileGeometry::from_file_name(
///     "start_2023-06-08T04:30:29Z.dp_img8.bpp_1.module_1.seqno_0.pff",
/// ).unwrap();
/// let dat = vec![7u8; geo.record_width * 2];
///
/// let (data, metadata) = decode(&dat[..], &geo, &DecodeOptions::default()).unwrap();
/// assert_eq!(data.shape(), (2, 1024));
/// assert!(metadata.is_empty());
/// ```
pub fn decode<R>(
    source: R,
    geometry: &FileGeometry,
    options: &DecodeOptions,
) -> Result<(SampleBlock, MetadataTable)>
where
    R: Read,
{
    options.validate(geometry)?;
    let layout = geometry.layout();

    if options.sample_limit == Some(0) {
        return Ok((
            SampleBlock::empty(layout.element, output_pixels(geometry, options)),
            MetadataTable::Empty,
        ));
    }

    let buf = read_all(source, geometry, options.sample_limit)?;
    if buf.is_empty() {
        debug!(product = %geometry.product, "no records");
        return Ok((
            SampleBlock::empty(layout.element, output_pixels(geometry, options)),
            MetadataTable::Empty,
        ));
    }
    debug!(
        product = %geometry.product,
        samples = buf.len() / geometry.record_width,
        "read records"
    );

    let (rw, mw, px, ch) = (
        geometry.record_width,
        geometry.metadata_width,
        geometry.pixel_count,
        options.channel,
    );
    let data = match layout.element {
        ElementType::I16 => SampleBlock::I16(data_plane(&buf, rw, mw, px, ch)),
        ElementType::U16 => SampleBlock::U16(data_plane(&buf, rw, mw, px, ch)),
        ElementType::U8 => SampleBlock::U8(data_plane(&buf, rw, mw, px, ch)),
    };

    let metadata = if options.include_metadata {
        decode_metadata(&buf, rw, layout)?
    } else {
        MetadataTable::Empty
    };

    Ok((data, metadata))
}

fn output_pixels(geometry: &FileGeometry, options: &DecodeOptions) -> usize {
    if options.channel.is_some() {
        1
    } else {
        geometry.pixel_count
    }
}

fn read_all<R: Read>(
    mut source: R,
    geometry: &FileGeometry,
    limit: Option<usize>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match limit {
        Some(n) => {
            let want = n.saturating_mul(geometry.record_width) as u64;
            source.take(want).read_to_end(&mut buf)?;
        }
        None => {
            source.read_to_end(&mut buf)?;
        }
    }
    if buf.len() % geometry.record_width != 0 {
        return Err(Error::TruncatedRecord {
            actual: buf.len(),
            record_width: geometry.record_width,
        });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img8() -> FileGeometry {
        FileGeometry::from_file_name(
            "start_2023-06-08T04:30:29Z.dp_img8.bpp_1.module_1.seqno_0.pff",
        )
        .unwrap()
    }

    #[test]
    fn test_skip_rejected() {
        let geo = img8();
        let opts = DecodeOptions::builder().skip(1).build();
        let zult = decode(std::io::empty(), &geo, &opts);
        assert!(matches!(zult, Err(Error::UnsupportedOption(_))), "got {zult:?}");
    }

    #[test]
    fn test_channel_checked_before_read() {
        let geo = img8();
        let opts = DecodeOptions::builder().channel(1024).build();
        let zult = decode(std::io::empty(), &geo, &opts);
        assert!(matches!(
            zult,
            Err(Error::ChannelOutOfRange {
                channel: 1024,
                pixels: 1024
            })
        ));
    }

    #[test]
    fn test_empty_input() {
        let geo = img8();
        let opts = DecodeOptions::builder().include_metadata(true).build();
        let (data, metadata) = decode(std::io::empty(), &geo, &opts).unwrap();
        assert_eq!(data.shape(), (0, 1024));
        assert!(metadata.is_empty());

        let opts = DecodeOptions::builder().channel(5).build();
        let (data, _) = decode(std::io::empty(), &geo, &opts).unwrap();
        assert_eq!(data.shape(), (0, 1));
    }

    #[test]
    fn test_partial_input() {
        let geo = img8();
        let dat = vec![0u8; geo.record_width - 1];
        let zult = decode(&dat[..], &geo, &DecodeOptions::default());
        assert!(matches!(
            zult,
            Err(Error::TruncatedRecord { actual, .. }) if actual == geo.record_width - 1
        ));
    }

    #[test]
    fn test_zero_limit() {
        let geo = img8();
        let opts = DecodeOptions::builder().sample_limit(0).channel(3).build();
        let (data, metadata) = decode(std::io::empty(), &geo, &opts).unwrap();
        assert_eq!(data.shape(), (0, 1));
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_limit_reads_only_requested() {
        let geo = img8();
        let mut dat = vec![0u8; geo.record_width * 3];
        // first pixel of the third record
        dat[2 * geo.record_width + geo.metadata_width] = 9;

        let opts = DecodeOptions::builder().sample_limit(2).build();
        let (data, _) = decode(&dat[..], &geo, &opts).unwrap();
        assert_eq!(data.shape(), (2, 1024));

        let opts = DecodeOptions::builder().sample_limit(10).build();
        let (data, _) = decode(&dat[..], &geo, &opts).unwrap();
        assert_eq!(data.shape(), (3, 1024));
        assert_eq!(data.get(2, 0), Some(9));
    }
}
