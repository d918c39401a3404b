//! Interleave tags and the axis permutations they imply.
//!
//! Every cube is addressed logically by `(row, col, band)`. On disk the three
//! axes are stored in one of three orders:
//!
//! | Interleave | Storage order        |
//! |------------|----------------------|
//! | BIP        | (row, col, band)     |
//! | BIL        | (row, band, col)     |
//! | BSQ        | (band, row, col)     |
//!
//! The functions here move coordinates (or shapes) between the canonical order
//! and any storage order. They are pure and total over the three variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CubeError;

/// A semantic cube axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Image line
    Row,
    /// Sample within a line
    Col,
    /// Spectral band
    Band,
}

impl Axis {
    /// Position of this axis in canonical `(row, col, band)` order.
    pub const fn canonical_index(self) -> usize {
        match self {
            Axis::Row => 0,
            Axis::Col => 1,
            Axis::Band => 2,
        }
    }
}

/// Physical axis ordering of a cube file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interleave {
    /// Band-interleaved-by-pixel
    Bip,
    /// Band-interleaved-by-line
    Bil,
    /// Band-sequential
    Bsq,
}

impl Interleave {
    /// All interleaves, in no particular order of preference.
    pub const ALL: [Interleave; 3] = [Interleave::Bip, Interleave::Bil, Interleave::Bsq];

    /// Storage axis order, outermost first.
    pub const fn axes(self) -> [Axis; 3] {
        match self {
            Interleave::Bip => [Axis::Row, Axis::Col, Axis::Band],
            Interleave::Bil => [Axis::Row, Axis::Band, Axis::Col],
            Interleave::Bsq => [Axis::Band, Axis::Row, Axis::Col],
        }
    }

    /// Lowercase tag as used in header files.
    pub fn name(self) -> &'static str {
        match self {
            Interleave::Bip => "bip",
            Interleave::Bil => "bil",
            Interleave::Bsq => "bsq",
        }
    }

    /// Reorder a canonical `(row, col, band)` triple into storage order.
    ///
    /// Works for coordinates, shapes and strides alike.
    pub fn to_storage<T: Copy>(self, canonical: [T; 3]) -> [T; 3] {
        self.axes().map(|axis| canonical[axis.canonical_index()])
    }

    /// Reorder a storage-order triple back into canonical `(row, col, band)`.
    pub fn to_canonical<T: Copy>(self, storage: [T; 3]) -> [T; 3] {
        let mut canonical = storage;
        for (position, axis) in self.axes().into_iter().enumerate() {
            canonical[axis.canonical_index()] = storage[position];
        }
        canonical
    }
}

impl fmt::Display for Interleave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

impl FromStr for Interleave {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bip" => Ok(Interleave::Bip),
            "bil" => Ok(Interleave::Bil),
            "bsq" => Ok(Interleave::Bsq),
            _ => Err(CubeError::UnsupportedInterleave { tag: s.to_string() }),
        }
    }
}

/// Axis order used to store a cube with the given interleave.
pub fn permutation_for(interleave: Interleave) -> [Axis; 3] {
    interleave.axes()
}

/// Re-express a coordinate given in `from`'s axis order in `to`'s axis order.
pub fn translate<T: Copy>(from: Interleave, to: Interleave, coord: [T; 3]) -> [T; 3] {
    to.to_storage(from.to_canonical(coord))
}
