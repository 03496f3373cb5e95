#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed file name {name:?}: {reason}")]
    MalformedFileName { name: String, reason: String },

    #[error("unsupported product type: {0}")]
    UnsupportedProductType(String),

    /// The bytes-per-pixel in the file name does not match the product's element type.
    #[error("product {product} uses {expected} byte elements, file name says {actual}")]
    ElementWidthMismatch {
        product: String,
        expected: usize,
        actual: usize,
    },

    /// Byte count is not a whole, non-zero number of records.
    #[error("truncated record: {actual} bytes is not a multiple of the {record_width} byte record")]
    TruncatedRecord { actual: usize, record_width: usize },

    #[error("channel {channel} out of range for {pixels} pixels")]
    ChannelOutOfRange { channel: usize, pixels: usize },

    #[error("invalid board variant {0:?}; expected bga or qfp")]
    InvalidBoardVariant(String),

    #[error("invalid quadrant {0}; expected 0 to 3")]
    InvalidQuadrant(usize),

    #[error("pixel out of range: {0}")]
    PixelOutOfRange(String),

    #[error("invalid pixel map: {0}")]
    InvalidPixelMap(String),

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("no byte range registered for metadata field {0:?}")]
    UnknownMetadataField(String),

    #[error("malformed metadata value for {field} in sample {sample}: {value:?}")]
    MalformedMetadata {
        field: String,
        sample: usize,
        value: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
