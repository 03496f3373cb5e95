#![doc = include_str!("../README.md")]

mod error;
mod file;

pub mod config;
pub mod decode;
pub mod geometry;
pub mod hk;
pub mod layout;
pub mod pixelmap;

pub use decode::{decode, DecodeOptions, MetadataTable, SampleBlock};
pub use error::{Error, Result};
pub use file::PffFile;
pub use geometry::FileGeometry;
pub use layout::ProductType;
pub use pixelmap::{BoardVariant, NativeLoc, PixelMaps};
