//! Static record layouts for the supported PFF data products.
//!
//! Every record starts with an ASCII JSON header padded to a fixed width and
//! terminated by a 2 byte binary-start sentinel, followed directly by the pixel
//! samples. Header values are written with fixed printf widths, so each field
//! always occupies the same byte range and can be sliced out without parsing
//! the JSON of every record.
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Instrument data mode of a PFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Pulse-height, single quabo.
    Ph256,
    /// Pulse-height, all four quabos.
    Ph1024,
    /// 16-bit image.
    Img16,
    /// 8-bit image.
    Img8,
}

impl ProductType {
    pub const ALL: [ProductType; 4] = [Self::Ph256, Self::Ph1024, Self::Img16, Self::Img8];

    /// The tag used for this product in file names, e.g., `dp_ph256`.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ph256 => "ph256",
            Self::Ph1024 => "ph1024",
            Self::Img16 => "img16",
            Self::Img8 => "img8",
        }
    }

    #[must_use]
    pub fn layout(&self) -> &'static Layout {
        match self {
            Self::Ph256 => &PH256,
            Self::Ph1024 => &PH1024,
            Self::Img16 => &IMG16,
            Self::Img8 => &IMG8,
        }
    }
}

impl FromStr for ProductType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.tag() == s)
            .ok_or_else(|| Error::UnsupportedProductType(s.to_string()))
    }
}

impl Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Numeric type of the pixel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    I16,
    U16,
    U8,
}

impl ElementType {
    /// Size of a single element in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::I16 | Self::U16 => 2,
            Self::U8 => 1,
        }
    }
}

/// Byte range `[start, end)` of a metadata value, relative to the start of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRange {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
}

impl FieldRange {
    const fn new(name: &'static str, start: usize, end: usize) -> Self {
        Self { name, start, end }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Metadata fields of one quabo in a nested header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuadrantFields {
    /// JSON key of the quabo object, e.g., `quabo_0`.
    pub key: &'static str,
    pub fields: &'static [FieldRange],
}

/// Shape of the JSON header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldLayout {
    /// Top-level fields.
    Flat(&'static [FieldRange]),
    /// Fields grouped under one object per quabo.
    Quadrants(&'static [QuadrantFields; 4]),
}

/// Layout of a single record for a product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub product: ProductType,
    /// Header width in bytes, including the sentinel.
    pub metadata_width: usize,
    pub pixel_count: usize,
    pub element: ElementType,
    pub fields: FieldLayout,
}

impl Layout {
    /// Length of the sentinel terminating the JSON header.
    pub const SENTINEL_LEN: usize = 2;

    /// Number of header bytes that may hold JSON text.
    #[must_use]
    pub fn json_width(&self) -> usize {
        self.metadata_width - Self::SENTINEL_LEN
    }

    /// Look up the byte range for a top-level field, or for a field under the quabo
    /// object `quadrant` in nested layouts.
    #[must_use]
    pub fn field_range(&self, quadrant: Option<&str>, name: &str) -> Option<&'static FieldRange> {
        let fields = match (self.fields, quadrant) {
            (FieldLayout::Flat(fields), None) => fields,
            (FieldLayout::Quadrants(quads), Some(key)) => {
                quads.iter().find(|q| q.key == key)?.fields
            }
            _ => return None,
        };
        fields.iter().find(|f| f.name == name)
    }
}

/// Look up the layout registered for a product tag.
///
/// # Errors
/// [Error::UnsupportedProductType] if `tag` is not a known product.
pub fn lookup(tag: &str) -> Result<&'static Layout> {
    Ok(ProductType::from_str(tag)?.layout())
}

const PH256_METADATA_WIDTH: usize = 124;
const QUABO_METADATA_WIDTH: usize = 492;

static PH256_FIELDS: [FieldRange; 6] = [
    FieldRange::new("quabo_num", 14, 16),
    FieldRange::new("pkt_num", 28, 39),
    FieldRange::new("pkt_tai", 51, 56),
    FieldRange::new("pkt_nsec", 69, 79),
    FieldRange::new("tv_sec", 90, 101),
    FieldRange::new("tv_usec", 113, 120),
];

// Each quabo object is 122 bytes after the previous one.
static QUABO_FIELDS: [QuadrantFields; 4] = [
    QuadrantFields {
        key: "quabo_0",
        fields: &[
            FieldRange::new("pkt_num", 28, 39),
            FieldRange::new("pkt_tai", 51, 56),
            FieldRange::new("pkt_nsec", 69, 79),
            FieldRange::new("tv_sec", 90, 101),
            FieldRange::new("tv_usec", 113, 120),
        ],
    },
    QuadrantFields {
        key: "quabo_1",
        fields: &[
            FieldRange::new("pkt_num", 150, 161),
            FieldRange::new("pkt_tai", 173, 178),
            FieldRange::new("pkt_nsec", 191, 201),
            FieldRange::new("tv_sec", 212, 223),
            FieldRange::new("tv_usec", 235, 242),
        ],
    },
    QuadrantFields {
        key: "quabo_2",
        fields: &[
            FieldRange::new("pkt_num", 272, 283),
            FieldRange::new("pkt_tai", 295, 300),
            FieldRange::new("pkt_nsec", 313, 323),
            FieldRange::new("tv_sec", 334, 345),
            FieldRange::new("tv_usec", 357, 364),
        ],
    },
    QuadrantFields {
        key: "quabo_3",
        fields: &[
            FieldRange::new("pkt_num", 394, 405),
            FieldRange::new("pkt_tai", 417, 422),
            FieldRange::new("pkt_nsec", 435, 445),
            FieldRange::new("tv_sec", 456, 467),
            FieldRange::new("tv_usec", 479, 486),
        ],
    },
];

static PH256: Layout = Layout {
    product: ProductType::Ph256,
    metadata_width: PH256_METADATA_WIDTH,
    pixel_count: 256,
    element: ElementType::I16,
    fields: FieldLayout::Flat(&PH256_FIELDS),
};

static PH1024: Layout = Layout {
    product: ProductType::Ph1024,
    metadata_width: QUABO_METADATA_WIDTH,
    pixel_count: 1024,
    element: ElementType::I16,
    fields: FieldLayout::Quadrants(&QUABO_FIELDS),
};

static IMG16: Layout = Layout {
    product: ProductType::Img16,
    metadata_width: QUABO_METADATA_WIDTH,
    pixel_count: 1024,
    element: ElementType::U16,
    fields: FieldLayout::Quadrants(&QUABO_FIELDS),
};

static IMG8: Layout = Layout {
    product: ProductType::Img8,
    metadata_width: QUABO_METADATA_WIDTH,
    pixel_count: 1024,
    element: ElementType::U8,
    fields: FieldLayout::Quadrants(&QUABO_FIELDS),
};
