//! Per-file record geometry derived from PFF file names.
//!
//! Data files are named like
//! `start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff`, optionally
//! with a prefix before `start`.
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::layout::{Layout, ProductType};
use crate::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const EXTENSION: &str = "pff";

/// Byte geometry of the records in a single PFF data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileGeometry {
    /// Start time of the file, UTC.
    pub start: NaiveDateTime,
    pub product: ProductType,
    /// Bytes per pixel sample.
    pub element_width: usize,
    pub module: u32,
    pub seqno: u32,
    pub metadata_width: usize,
    pub pixel_count: usize,
    /// Total bytes in one record, metadata plus pixels.
    pub record_width: usize,
}

impl FileGeometry {
    /// Resolve the geometry for a file name. Only the final path component is used.
    ///
    /// # Errors
    /// [Error::MalformedFileName] if the name does not follow the naming convention,
    /// [Error::UnsupportedProductType] for an unknown product, or
    /// [Error::ElementWidthMismatch] if the bytes per pixel disagrees with the product.
    pub fn from_file_name<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| malformed(&path.to_string_lossy(), "no file name"))?;

        let tokens: Vec<&str> = name.split('.').collect();
        if tokens.len() != 6 {
            return Err(malformed(
                name,
                &format!("expected 6 '.' separated tokens, got {}", tokens.len()),
            ));
        }
        if tokens[5] != EXTENSION {
            return Err(malformed(name, "extension is not .pff"));
        }

        // Anything before the last '_' of the first token is prefix
        let Some((_, start)) = tokens[0].rsplit_once('_') else {
            return Err(malformed(name, "missing start timestamp"));
        };
        let start = NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT)
            .map_err(|e| malformed(name, &format!("invalid start timestamp {start:?}: {e}")))?;

        let product = ProductType::from_str(value(name, tokens[1], "dp")?)?;
        let element_width: usize = number(name, tokens[2], "bpp")?;
        let module: u32 = number(name, tokens[3], "module")?;
        let seqno: u32 = number(name, tokens[4], "seqno")?;

        Self::new(start, product, element_width, module, seqno)
    }

    /// Construct from already parsed file name parts.
    ///
    /// # Errors
    /// [Error::ElementWidthMismatch] if `element_width` is not the width of `product`'s
    /// sample type.
    pub fn new(
        start: NaiveDateTime,
        product: ProductType,
        element_width: usize,
        module: u32,
        seqno: u32,
    ) -> Result<Self> {
        let layout = product.layout();
        if layout.element.width() != element_width {
            return Err(Error::ElementWidthMismatch {
                product: product.to_string(),
                expected: layout.element.width(),
                actual: element_width,
            });
        }
        Ok(FileGeometry {
            start,
            product,
            element_width,
            module,
            seqno,
            metadata_width: layout.metadata_width,
            pixel_count: layout.pixel_count,
            record_width: layout.metadata_width + layout.pixel_count * element_width,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &'static Layout {
        self.product.layout()
    }

    /// Bytes of pixel data in one record.
    #[must_use]
    pub fn data_width(&self) -> usize {
        self.pixel_count * self.element_width
    }

    /// Number of whole records in `len` bytes.
    ///
    /// # Errors
    /// [Error::TruncatedRecord] if `len` is not a multiple of the record width.
    pub fn sample_count(&self, len: u64) -> Result<usize> {
        let width = self.record_width as u64;
        if len % width != 0 {
            return Err(Error::TruncatedRecord {
                actual: usize::try_from(len).unwrap_or(usize::MAX),
                record_width: self.record_width,
            });
        }
        usize::try_from(len / width).map_err(|_| Error::TruncatedRecord {
            actual: usize::MAX,
            record_width: self.record_width,
        })
    }
}

fn malformed(name: &str, reason: &str) -> Error {
    Error::MalformedFileName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn value<'a>(name: &str, token: &'a str, key: &str) -> Result<&'a str> {
    match token.split_once('_') {
        Some((k, v)) if k == key && !v.is_empty() => Ok(v),
        _ => Err(malformed(
            name,
            &format!("expected {key}_<value>, got {token:?}"),
        )),
    }
}

fn number<T: FromStr>(name: &str, token: &str, key: &str) -> Result<T> {
    let v = value(name, token, key)?;
    v.parse::<T>()
        .map_err(|_| malformed(name, &format!("{key} value {v:?} is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use test_case::test_case;

    #[test]
    fn test_ph256_name() {
        let geo = FileGeometry::from_file_name(
            "start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff",
        )
        .unwrap();

        assert_eq!(geo.product, ProductType::Ph256);
        assert_eq!(geo.element_width, 2);
        assert_eq!(geo.pixel_count, 256);
        assert_eq!(geo.metadata_width, 124);
        assert_eq!(geo.record_width, 636);
        assert_eq!(geo.module, 254);
        assert_eq!(geo.seqno, 0);
        assert_eq!(
            geo.start,
            NaiveDate::from_ymd_opt(2023, 8, 2)
                .unwrap()
                .and_hms_opt(0, 39, 53)
                .unwrap()
        );
    }

    #[test_case("start_2023-06-08T04:30:29Z.dp_img16.bpp_2.module_1.seqno_0.pff", 492 + 2048)]
    #[test_case("start_2023-06-08T04:30:29Z.dp_img8.bpp_1.module_1.seqno_3.pff", 492 + 1024)]
    #[test_case("start_2023-06-08T04:30:29Z.dp_ph1024.bpp_2.module_1.seqno_0.pff", 492 + 2048)]
    fn test_record_width(name: &str, expected: usize) {
        let geo = FileGeometry::from_file_name(name).unwrap();
        assert_eq!(geo.record_width, expected);
        assert_eq!(
            geo.record_width,
            geo.metadata_width + geo.pixel_count * geo.element_width
        );
    }

    #[test]
    fn test_prefix_and_directory() {
        let geo = FileGeometry::from_file_name(
            "/data/obs/lick_start_2024-01-31T23:59:59Z.dp_img16.bpp_2.module_3.seqno_12.pff",
        )
        .unwrap();
        assert_eq!(geo.product, ProductType::Img16);
        assert_eq!(geo.module, 3);
        assert_eq!(geo.seqno, 12);
        assert_eq!(geo.start.hour(), 23);
    }

    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.pff" ; "missing seqno")]
    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_two.module_254.seqno_0.pff" ; "bad bpp")]
    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_x.seqno_0.pff" ; "bad module")]
    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_-1.pff" ; "negative seqno")]
    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.mod_254.seqno_0.pff" ; "wrong key")]
    #[test_case("start_2023-08-02 00:39:53.dp_ph256.bpp_2.module_254.seqno_0.pff" ; "bad timestamp")]
    #[test_case("2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff" ; "no start token")]
    #[test_case("start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.dat" ; "wrong extension")]
    #[test_case("obs_Lick.start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff" ; "dotted prefix")]
    fn test_malformed(name: &str) {
        let zult = FileGeometry::from_file_name(name);
        assert!(
            matches!(zult, Err(Error::MalformedFileName { .. })),
            "expected MalformedFileName, got {zult:?}"
        );
    }

    #[test]
    fn test_unsupported_product() {
        let zult = FileGeometry::from_file_name(
            "start_2023-08-02T00:39:53Z.dp_img32.bpp_4.module_1.seqno_0.pff",
        );
        assert!(matches!(zult, Err(Error::UnsupportedProductType(_))), "got {zult:?}");
    }

    #[test]
    fn test_element_width_mismatch() {
        let zult = FileGeometry::from_file_name(
            "start_2023-08-02T00:39:53Z.dp_img8.bpp_2.module_1.seqno_0.pff",
        );
        assert!(
            matches!(
                zult,
                Err(Error::ElementWidthMismatch {
                    expected: 1,
                    actual: 2,
                    ..
                })
            ),
            "got {zult:?}"
        );
    }

    #[test]
    fn test_sample_count() {
        let geo = FileGeometry::from_file_name(
            "start_2023-08-02T00:39:53Z.dp_ph256.bpp_2.module_254.seqno_0.pff",
        )
        .unwrap();
        assert_eq!(geo.sample_count(0).unwrap(), 0);
        assert_eq!(geo.sample_count(636 * 7).unwrap(), 7);
        assert!(matches!(
            geo.sample_count(636 * 7 + 10),
            Err(Error::TruncatedRecord {
                actual: 4462,
                record_width: 636
            })
        ));
    }
}
