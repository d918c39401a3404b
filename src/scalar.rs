//! Typed samples and the byte-order adapter.
//!
//! Mapped bytes always stay in the file's byte order. Conversion to and from
//! host order happens here, one sample at a time, and never changes the data
//! type: an `int16` cube yields `Scalar::Int16` and only accepts it back.

use std::fmt;

use byteorder::{BigEndian, LittleEndian};

use crate::layout::{ByteOrder, DataType};

/// A single cube sample tagged with its data type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Scalar {
    /// Data type carried by this sample.
    pub fn dtype(&self) -> DataType {
        match self {
            Scalar::Int8(_) => DataType::Int8,
            Scalar::UInt8(_) => DataType::UInt8,
            Scalar::Int16(_) => DataType::Int16,
            Scalar::UInt16(_) => DataType::UInt16,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::UInt32(_) => DataType::UInt32,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::UInt64(_) => DataType::UInt64,
            Scalar::Float32(_) => DataType::Float32,
            Scalar::Float64(_) => DataType::Float64,
        }
    }

    /// Value as `f64`. Lossy for 64-bit integers beyond 2^53; callers opt in.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Int8(v) => f64::from(v),
            Scalar::UInt8(v) => f64::from(v),
            Scalar::Int16(v) => f64::from(v),
            Scalar::UInt16(v) => f64::from(v),
            Scalar::Int32(v) => f64::from(v),
            Scalar::UInt32(v) => f64::from(v),
            Scalar::Int64(v) => v as f64,
            Scalar::UInt64(v) => v as f64,
            Scalar::Float32(v) => f64::from(v),
            Scalar::Float64(v) => v,
        }
    }

    /// Decode one sample of `dtype` stored in `order` from the front of `bytes`.
    ///
    /// `bytes` must hold at least `dtype.size()` bytes.
    pub(crate) fn decode(dtype: DataType, order: ByteOrder, bytes: &[u8]) -> Self {
        match order {
            ByteOrder::Little => Self::decode_with::<LittleEndian>(dtype, bytes),
            ByteOrder::Big => Self::decode_with::<BigEndian>(dtype, bytes),
        }
    }

    fn decode_with<E: byteorder::ByteOrder>(dtype: DataType, bytes: &[u8]) -> Self {
        match dtype {
            DataType::Int8 => Scalar::Int8(i8::from_ne_bytes([bytes[0]])),
            DataType::UInt8 => Scalar::UInt8(bytes[0]),
            DataType::Int16 => Scalar::Int16(E::read_i16(bytes)),
            DataType::UInt16 => Scalar::UInt16(E::read_u16(bytes)),
            DataType::Int32 => Scalar::Int32(E::read_i32(bytes)),
            DataType::UInt32 => Scalar::UInt32(E::read_u32(bytes)),
            DataType::Int64 => Scalar::Int64(E::read_i64(bytes)),
            DataType::UInt64 => Scalar::UInt64(E::read_u64(bytes)),
            DataType::Float32 => Scalar::Float32(E::read_f32(bytes)),
            DataType::Float64 => Scalar::Float64(E::read_f64(bytes)),
        }
    }

    /// Encode this sample in `order` into the front of `out`.
    ///
    /// `out` must hold at least `self.dtype().size()` bytes.
    pub(crate) fn encode(self, order: ByteOrder, out: &mut [u8]) {
        match order {
            ByteOrder::Little => self.encode_with::<LittleEndian>(out),
            ByteOrder::Big => self.encode_with::<BigEndian>(out),
        }
    }

    fn encode_with<E: byteorder::ByteOrder>(self, out: &mut [u8]) {
        match self {
            Scalar::Int8(v) => out[0] = v.to_ne_bytes()[0],
            Scalar::UInt8(v) => out[0] = v,
            Scalar::Int16(v) => E::write_i16(out, v),
            Scalar::UInt16(v) => E::write_u16(out, v),
            Scalar::Int32(v) => E::write_i32(out, v),
            Scalar::UInt32(v) => E::write_u32(out, v),
            Scalar::Int64(v) => E::write_i64(out, v),
            Scalar::UInt64(v) => E::write_u64(out, v),
            Scalar::Float32(v) => E::write_f32(out, v),
            Scalar::Float64(v) => E::write_f64(out, v),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int8(v) => write!(f, "{v}"),
            Scalar::UInt8(v) => write!(f, "{v}"),
            Scalar::Int16(v) => write!(f, "{v}"),
            Scalar::UInt16(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::UInt32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::Float32(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// Copy an encoded sample from one byte order to another.
///
/// Equal orders copy verbatim; otherwise the bytes are reversed, which is the
/// full conversion for every supported type.
pub(crate) fn transcode(src: &[u8], src_order: ByteOrder, dst: &mut [u8], dst_order: ByteOrder) {
    dst.copy_from_slice(src);
    if src_order != dst_order {
        dst.reverse();
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust primitive types that can be stored in a cube.
///
/// Used by the typed accessors on [`CubeView`](crate::CubeView) so the data
/// type is checked once against the cube instead of per call site.
pub trait Sample: Copy + fmt::Debug + Send + Sync + 'static + sealed::Sealed {
    /// Cube data type this Rust type corresponds to.
    const DTYPE: DataType;

    /// Extract the value if `scalar` has exactly this type.
    fn from_scalar(scalar: Scalar) -> Option<Self>;

    /// Wrap the value in a [`Scalar`].
    fn into_scalar(self) -> Scalar;
}

macro_rules! impl_sample {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Sample for $ty {
                const DTYPE: DataType = DataType::$variant;

                fn from_scalar(scalar: Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }
            }

            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value)
                }
            }
        )*
    };
}

impl_sample! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}
