//! Error types for cube mapping, view access and conversion.

use std::path::PathBuf;
use thiserror::Error;

use crate::layout::DataType;

/// Convenience alias used throughout the crate.
pub type Result<T, E = CubeError> = std::result::Result<T, E>;

/// Errors that can occur while opening, viewing or converting a cube.
#[derive(Error, Debug)]
pub enum CubeError {
    /// Interleave tag is not one of BIP, BIL or BSQ
    #[error("Unsupported interleave '{tag}' (expected bip, bil or bsq)")]
    UnsupportedInterleave {
        /// The tag that was rejected
        tag: String,
    },

    /// Data type name is not recognized
    #[error("Unsupported data type '{name}'")]
    UnsupportedDType {
        /// The name that was rejected
        name: String,
    },

    /// Byte order name is not recognized
    #[error("Unsupported byte order '{name}' (expected little or big)")]
    UnsupportedByteOrder {
        /// The name that was rejected
        name: String,
    },

    /// A cube extent is zero, or the cube is too large to address
    #[error(
        "Invalid cube dimensions {rows}x{cols}x{bands}: extents must be positive and addressable"
    )]
    InvalidDimensions {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
        /// Number of bands
        bands: usize,
    },

    /// Pixel region length on disk differs from the layout
    #[error(
        "File size mismatch for {path:?}: expected {expected} pixel bytes after the header, found {actual}"
    )]
    FileSizeMismatch {
        /// Backing file
        path: PathBuf,
        /// rows * cols * bands * sizeof(dtype)
        expected: u64,
        /// File length minus header offset
        actual: u64,
    },

    /// Write requested on a read-only cube or view
    #[error("Cube is not writable: {message}")]
    NotWritable {
        /// What was attempted
        message: String,
    },

    /// Coordinate outside the cube
    #[error("Index {index:?} out of range for cube of shape {shape:?} (row, col, band)")]
    IndexOutOfRange {
        /// Requested (row, col, band)
        index: [usize; 3],
        /// Cube extents (rows, cols, bands)
        shape: [usize; 3],
    },

    /// Scalar type does not match the cube's data type
    #[error("Data type mismatch: cube stores {expected}, got {found}")]
    DTypeMismatch {
        /// Data type of the cube
        expected: DataType,
        /// Data type that was supplied or requested
        found: DataType,
    },

    /// Writing dirty pages back to the file failed
    #[error("Failed to flush mapping of {path:?}: {source}")]
    IoFlush {
        /// Backing file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// I/O error while opening, mapping or converting
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Source and destination layouts cannot be converted into each other
    #[error("Incompatible layout: {message}")]
    IncompatibleLayout {
        /// Description of the mismatch
        message: String,
    },

    /// Mapped bytes could not be viewed with the cube's shape
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Handle used after it was closed, or closed while still referenced
    #[error("Use after close: {message}")]
    UseAfterClose {
        /// Description of the offending operation
        message: String,
    },
}

impl CubeError {
    /// Create a not-writable error.
    pub fn not_writable(message: impl Into<String>) -> Self {
        Self::NotWritable {
            message: message.into(),
        }
    }

    /// Create an incompatible layout error.
    pub fn incompatible_layout(message: impl Into<String>) -> Self {
        Self::IncompatibleLayout {
            message: message.into(),
        }
    }

    /// Create a use-after-close error.
    pub fn use_after_close(message: impl Into<String>) -> Self {
        Self::UseAfterClose {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
