//! hvcube - memory-mapped hyperspectral cubes
//!
//! Zero-copy access to multi-band raster files stored as BIP, BIL or BSQ.
//! A [`MappedCube`] maps the pixel region of a file once; any number of
//! [`CubeView`]s present that mapping in whichever interleave the caller
//! prefers, all addressed by logical `(row, col, band)`. Writes through one
//! view are visible to every other view immediately and reach the file on
//! `flush`. [`convert`] rewrites a cube into a new file with a different
//! interleave, byte order or header offset.
//!
//! Header parsing is left to the caller, which hands over a
//! [`LayoutDescriptor`].

pub mod config;
pub mod convert;
pub mod cube;
pub mod error;
pub mod interleave;
pub mod layout;
pub mod scalar;

pub use config::{CONFIG_VERSION, ConfigError, CubeConfig, LogLevel};
pub use convert::{ConvertOptions, ConvertStatus, convert, convert_with};
pub use cube::{CubeView, MappedCube};
pub use error::{CubeError, Result};
pub use interleave::{Axis, Interleave, permutation_for, translate};
pub use layout::{ByteOrder, DataType, LayoutDescriptor, OpenMode};
pub use scalar::{Sample, Scalar};

#[cfg(test)]
mod tests;
