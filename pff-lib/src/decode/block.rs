use ndarray::{s, Array2};
use serde::Serialize;

use crate::layout::ElementType;
use crate::{Error, Result};

/// A fixed width little-endian pixel sample type.
pub trait Element: Copy {
    /// Size in bytes.
    const WIDTH: usize;

    /// Decode from the first [Self::WIDTH] bytes of `buf`.
    fn from_le(buf: &[u8]) -> Self;
}

impl Element for i16 {
    const WIDTH: usize = 2;

    fn from_le(buf: &[u8]) -> Self {
        i16::from_le_bytes([buf[0], buf[1]])
    }
}

impl Element for u16 {
    const WIDTH: usize = 2;

    fn from_le(buf: &[u8]) -> Self {
        u16::from_le_bytes([buf[0], buf[1]])
    }
}

impl Element for u8 {
    const WIDTH: usize = 1;

    fn from_le(buf: &[u8]) -> Self {
        buf[0]
    }
}

/// Decoded pixel data, one row per sample and one column per pixel.
///
/// The element type follows the product: `i16` for pulse-height products, `u16` for
/// img16, and `u8` for img8.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleBlock {
    I16(Array2<i16>),
    U16(Array2<u16>),
    U8(Array2<u8>),
}

impl SampleBlock {
    /// An empty block with `pixels` columns.
    #[must_use]
    pub fn empty(element: ElementType, pixels: usize) -> Self {
        match element {
            ElementType::I16 => Self::I16(Array2::zeros((0, pixels))),
            ElementType::U16 => Self::U16(Array2::zeros((0, pixels))),
            ElementType::U8 => Self::U8(Array2::zeros((0, pixels))),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::I16(_) => ElementType::I16,
            Self::U16(_) => ElementType::U16,
            Self::U8(_) => ElementType::U8,
        }
    }

    /// `(samples, pixels)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::I16(a) => a.dim(),
            Self::U16(a) => a.dim(),
            Self::U8(a) => a.dim(),
        }
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.shape().0
    }

    #[must_use]
    pub fn pixels(&self) -> usize {
        self.shape().1
    }

    /// Value at `(sample, pixel)` widened to `i64`.
    #[must_use]
    pub fn get(&self, sample: usize, pixel: usize) -> Option<i64> {
        match self {
            Self::I16(a) => a.get((sample, pixel)).map(|v| i64::from(*v)),
            Self::U16(a) => a.get((sample, pixel)).map(|v| i64::from(*v)),
            Self::U8(a) => a.get((sample, pixel)).map(|v| i64::from(*v)),
        }
    }

    /// A new single column block holding pixel `channel` of every sample.
    ///
    /// # Errors
    /// [Error::ChannelOutOfRange] if `channel` is not less than the number of pixels.
    pub fn column(&self, channel: usize) -> Result<SampleBlock> {
        let pixels = self.pixels();
        if channel >= pixels {
            return Err(Error::ChannelOutOfRange { channel, pixels });
        }
        Ok(match self {
            Self::I16(a) => Self::I16(a.slice(s![.., channel..=channel]).to_owned()),
            Self::U16(a) => Self::U16(a.slice(s![.., channel..=channel]).to_owned()),
            Self::U8(a) => Self::U8(a.slice(s![.., channel..=channel]).to_owned()),
        })
    }

    /// Copy of the data as `f64`.
    #[must_use]
    pub fn to_f64(&self) -> Array2<f64> {
        match self {
            Self::I16(a) => a.mapv(f64::from),
            Self::U16(a) => a.mapv(f64::from),
            Self::U8(a) => a.mapv(f64::from),
        }
    }
}

/// Build the data plane from whole records in `buf`. With `channel` only that pixel
/// is extracted.
pub(crate) fn data_plane<T: Element>(
    buf: &[u8],
    record_width: usize,
    metadata_width: usize,
    pixels: usize,
    channel: Option<usize>,
) -> Array2<T> {
    let samples = buf.len() / record_width;
    let columns = if channel.is_some() { 1 } else { pixels };
    Array2::from_shape_fn((samples, columns), |(sample, col)| {
        let pixel = channel.unwrap_or(col);
        let offset = sample * record_width + metadata_width + pixel * T::WIDTH;
        T::from_le(&buf[offset..offset + T::WIDTH])
    })
}
