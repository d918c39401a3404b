//! Resolved cube layouts.
//!
//! A [`LayoutDescriptor`] is what an external header parser hands to this
//! crate: dimensions, sample type, byte order, interleave, where the pixel
//! data starts and which file holds it. Nothing here reads headers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, Result};
use crate::interleave::Interleave;

/// Sample data type of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// IEEE 754 single precision
    Float32,
    /// IEEE 754 double precision
    Float64,
}

impl DataType {
    /// Size of one sample in bytes.
    pub const fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Whether the type is a floating point type.
    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DataType {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s.trim().to_lowercase().as_str() {
            "int8" | "i8" => DataType::Int8,
            "uint8" | "u8" | "byte" => DataType::UInt8,
            "int16" | "i16" => DataType::Int16,
            "uint16" | "u16" => DataType::UInt16,
            "int32" | "i32" => DataType::Int32,
            "uint32" | "u32" => DataType::UInt32,
            "int64" | "i64" => DataType::Int64,
            "uint64" | "u64" => DataType::UInt64,
            "float32" | "f32" | "float" => DataType::Float32,
            "float64" | "f64" | "double" => DataType::Float64,
            _ => {
                return Err(CubeError::UnsupportedDType {
                    name: s.to_string(),
                });
            }
        };
        Ok(dtype)
    }
}

/// Byte order of multi-byte samples in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl ByteOrder {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Whether samples in this order must be swapped to be read on the host.
    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "little" | "le" | "<" => Ok(ByteOrder::Little),
            "big" | "be" | ">" => Ok(ByteOrder::Big),
            _ => Err(CubeError::UnsupportedByteOrder {
                name: s.to_string(),
            }),
        }
    }
}

/// How a cube file is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Shared read-only mapping
    #[default]
    ReadOnly,
    /// Shared writable mapping; writes reach the file on flush
    ReadWrite,
}

/// Fully resolved description of a cube file.
///
/// Immutable: use the `with_*` methods to derive a descriptor for another
/// file (e.g. a conversion target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutFields", into = "LayoutFields")]
pub struct LayoutDescriptor {
    rows: usize,
    cols: usize,
    bands: usize,
    dtype: DataType,
    byte_order: ByteOrder,
    interleave: Interleave,
    header_offset: u64,
    path: PathBuf,
}

/// Serialized form of [`LayoutDescriptor`]; validated on the way in.
#[derive(Serialize, Deserialize)]
struct LayoutFields {
    rows: usize,
    cols: usize,
    bands: usize,
    dtype: DataType,
    #[serde(default = "ByteOrder::native")]
    byte_order: ByteOrder,
    interleave: Interleave,
    #[serde(default)]
    header_offset: u64,
    path: PathBuf,
}

impl TryFrom<LayoutFields> for LayoutDescriptor {
    type Error = CubeError;

    fn try_from(fields: LayoutFields) -> Result<Self> {
        Ok(LayoutDescriptor::new(
            fields.path,
            [fields.rows, fields.cols, fields.bands],
            fields.dtype,
            fields.interleave,
        )?
        .with_byte_order(fields.byte_order)
        .with_header_offset(fields.header_offset)?)
    }
}

impl From<LayoutDescriptor> for LayoutFields {
    fn from(layout: LayoutDescriptor) -> Self {
        Self {
            rows: layout.rows,
            cols: layout.cols,
            bands: layout.bands,
            dtype: layout.dtype,
            byte_order: layout.byte_order,
            interleave: layout.interleave,
            header_offset: layout.header_offset,
            path: layout.path,
        }
    }
}

impl LayoutDescriptor {
    /// Create a descriptor with host byte order and no header offset.
    ///
    /// # Arguments
    /// * `path` - File holding the cube
    /// * `dims` - `[rows, cols, bands]`, all positive
    /// * `dtype` - Sample type
    /// * `interleave` - Physical axis order in the file
    pub fn new(
        path: impl Into<PathBuf>,
        dims: [usize; 3],
        dtype: DataType,
        interleave: Interleave,
    ) -> Result<Self> {
        let [rows, cols, bands] = dims;
        let byte_len = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(bands))
            .and_then(|n| n.checked_mul(dtype.size()));
        if rows == 0 || cols == 0 || bands == 0 || byte_len.is_none() {
            return Err(CubeError::InvalidDimensions { rows, cols, bands });
        }

        Ok(Self {
            rows,
            cols,
            bands,
            dtype,
            byte_order: ByteOrder::native(),
            interleave,
            header_offset: 0,
            path: path.into(),
        })
    }

    /// Same layout with a different byte order.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Same layout with pixel data starting `header_offset` bytes into the file.
    ///
    /// Fails with `InvalidDimensions` if header and pixel region together do
    /// not fit in a `u64` file length.
    pub fn with_header_offset(mut self, header_offset: u64) -> Result<Self> {
        if header_offset.checked_add(self.pixel_bytes()).is_none() {
            return Err(CubeError::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
                bands: self.bands,
            });
        }
        self.header_offset = header_offset;
        Ok(self)
    }

    /// Same layout stored with a different interleave.
    pub fn with_interleave(mut self, interleave: Interleave) -> Self {
        self.interleave = interleave;
        self
    }

    /// Same layout in another file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Number of image lines.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of samples per line.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of spectral bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// `[rows, cols, bands]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.rows, self.cols, self.bands]
    }

    /// Sample data type.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Byte order of multi-byte samples in the file.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Physical axis order in the file.
    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// Bytes before the pixel region.
    pub fn header_offset(&self) -> u64 {
        self.header_offset
    }

    /// File holding the cube.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of samples in the cube.
    pub fn element_count(&self) -> usize {
        self.rows * self.cols * self.bands
    }

    /// Length of the pixel region in bytes.
    pub fn pixel_bytes(&self) -> u64 {
        (self.element_count() * self.dtype.size()) as u64
    }

    /// Total file length: header plus pixel region.
    ///
    /// Cannot overflow; `with_header_offset` rejects offsets that would.
    pub fn expected_file_len(&self) -> u64 {
        self.header_offset + self.pixel_bytes()
    }

    /// Shape in the file's storage order, outermost axis first.
    pub fn storage_shape(&self) -> [usize; 3] {
        self.interleave.to_storage(self.dims())
    }

    /// Serialize the descriptor to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate a descriptor from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DataType::Int8.size(), 1);
        assert_eq!(DataType::UInt16.size(), 2);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::Float64.size(), 8);
        assert_eq!(DataType::UInt64.size(), 8);
    }

    #[test]
    fn test_dtype_parse() {
        assert_eq!("float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("F64".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("i16".parse::<DataType>().unwrap(), DataType::Int16);
        assert!(matches!(
            "complex64".parse::<DataType>(),
            Err(CubeError::UnsupportedDType { .. })
        ));
    }

    #[test]
    fn test_byte_order_parse() {
        assert_eq!("LE".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert_eq!("big".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert!("middle".parse::<ByteOrder>().is_err());
    }

    #[test]
    fn test_expected_len() {
        let layout = LayoutDescriptor::new("cube.img", [100, 100, 50], DataType::Float32, Interleave::Bsq)
            .unwrap()
            .with_header_offset(128)
            .unwrap();
        assert_eq!(layout.element_count(), 500_000);
        assert_eq!(layout.pixel_bytes(), 2_000_000);
        assert_eq!(layout.expected_file_len(), 2_000_128);
        assert_eq!(layout.storage_shape(), [50, 100, 100]);
    }

    #[test]
    fn test_zero_extent_rejected() {
        let err = LayoutDescriptor::new("x", [10, 0, 5], DataType::UInt8, Interleave::Bip).unwrap_err();
        assert!(matches!(err, CubeError::InvalidDimensions { cols: 0, .. }));
    }

    #[test]
    fn test_json_roundtrip_and_defaults() {
        let json = r#"{
            "rows": 4, "cols": 3, "bands": 2,
            "dtype": "int16", "interleave": "bil",
            "path": "/data/cube.img"
        }"#;
        let layout = LayoutDescriptor::from_json(json).unwrap();
        assert_eq!(layout.dims(), [4, 3, 2]);
        assert_eq!(layout.byte_order(), ByteOrder::native());
        assert_eq!(layout.header_offset(), 0);

        let back = LayoutDescriptor::from_json(&layout.to_json().unwrap()).unwrap();
        assert_eq!(back, layout);
    }

    #[test]
    fn test_header_offset_overflow_rejected() {
        let layout = LayoutDescriptor::new("big.img", [2, 2, 2], DataType::UInt16, Interleave::Bip).unwrap();
        assert!(matches!(
            layout.clone().with_header_offset(u64::MAX - 2),
            Err(CubeError::InvalidDimensions { rows: 2, .. })
        ));

        let largest = u64::MAX - layout.pixel_bytes();
        let layout = layout.with_header_offset(largest).unwrap();
        assert_eq!(layout.expected_file_len(), u64::MAX);
    }

    #[test]
    fn test_json_rejects_overflowing_header_offset() {
        let json = format!(
            r#"{{"rows": 4, "cols": 3, "bands": 2, "dtype": "float64",
                 "interleave": "bip", "path": "c.img", "header_offset": {}}}"#,
            u64::MAX
        );
        assert!(LayoutDescriptor::from_json(&json).is_err());
    }

    #[test]
    fn test_json_rejects_zero_bands() {
        let json = r#"{"rows": 4, "cols": 3, "bands": 0, "dtype": "uint8",
                       "interleave": "bsq", "path": "c.img"}"#;
        assert!(LayoutDescriptor::from_json(json).is_err());
    }
}
