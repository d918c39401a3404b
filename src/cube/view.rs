//! Interleave-transparent access to a mapped cube.

use std::ops::Range;
use std::sync::Arc;

use ndarray::{Array1, Array2, Array3, ArrayView1, s};

use crate::cube::storage::CubeStorage;
use crate::error::{CubeError, Result};
use crate::interleave::{Interleave, translate};
use crate::layout::{ByteOrder, DataType, LayoutDescriptor};
use crate::scalar::{Sample, Scalar};

/// A window onto a [`MappedCube`](crate::MappedCube) presented in one
/// interleave.
///
/// Regardless of the requested interleave, [`get`](Self::get) and
/// [`set`](Self::set) take canonical `(row, col, band)` coordinates; the
/// interleave only decides [`shape`](Self::shape) and the addressing used by
/// [`get_ordered`](Self::get_ordered). Writes go straight into the shared
/// mapping, so every view over the same cube sees them immediately. They reach
/// the file on [`flush`](Self::flush).
///
/// Concurrent writers through different views are not coordinated beyond
/// per-sample atomicity; keep a single writer per byte range.
pub struct CubeView {
    storage: Option<Arc<CubeStorage>>,
    interleave: Interleave,
    /// Interleave of the backing file.
    native: Interleave,
    writable: bool,
    dims: [usize; 3],
    /// Element strides of (row, col, band) in the native layout.
    strides: [usize; 3],
    dtype: DataType,
    byte_order: ByteOrder,
}

impl CubeView {
    pub(crate) fn new(storage: Arc<CubeStorage>, interleave: Interleave, writable: bool) -> Self {
        let layout = storage.layout();
        let native = layout.interleave();

        Self {
            interleave,
            native,
            writable,
            dims: layout.dims(),
            strides: native.to_canonical(storage.strides()),
            dtype: layout.dtype(),
            byte_order: layout.byte_order(),
            storage: Some(storage),
        }
    }

    /// Interleave this view presents.
    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// Whether [`set`](Self::set) is allowed through this view.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.storage.is_none()
    }

    /// Data type of every sample in the cube.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// `[rows, cols, bands]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Logical shape in this view's own axis order, e.g. `[rows, bands, cols]`
    /// for BIL.
    pub fn shape(&self) -> [usize; 3] {
        self.interleave.to_storage(self.dims)
    }

    /// Layout of the underlying file.
    pub fn layout(&self) -> Result<&LayoutDescriptor> {
        Ok(self.storage()?.layout())
    }

    /// Read the sample at `(row, col, band)`.
    ///
    /// The returned scalar always has the cube's data type.
    pub fn get(&self, row: usize, col: usize, band: usize) -> Result<Scalar> {
        let offset = self.byte_offset([row, col, band])?;
        let storage = self.storage()?;
        let (dtype, order) = (self.dtype, self.byte_order);
        Ok(storage.read(|bytes| Scalar::decode(dtype, order, &bytes[offset..])))
    }

    /// Write the sample at `(row, col, band)`.
    ///
    /// `value` must have the cube's data type; nothing is converted.
    pub fn set(&self, row: usize, col: usize, band: usize, value: Scalar) -> Result<()> {
        if !self.writable {
            return Err(CubeError::not_writable(format!(
                "{} view opened read-only",
                self.interleave
            )));
        }
        let offset = self.byte_offset([row, col, band])?;
        if value.dtype() != self.dtype {
            return Err(CubeError::DTypeMismatch {
                expected: self.dtype,
                found: value.dtype(),
            });
        }

        let order = self.byte_order;
        self.storage()?
            .write(|bytes| value.encode(order, &mut bytes[offset..]))
    }

    /// Typed read; `T` must match the cube's data type.
    pub fn get_as<T: Sample>(&self, row: usize, col: usize, band: usize) -> Result<T> {
        self.check_sample::<T>()?;
        let scalar = self.get(row, col, band)?;
        T::from_scalar(scalar).ok_or(CubeError::DTypeMismatch {
            expected: self.dtype,
            found: T::DTYPE,
        })
    }

    /// Typed write; `T` must match the cube's data type.
    pub fn set_as<T: Sample>(&self, row: usize, col: usize, band: usize, value: T) -> Result<()> {
        self.set(row, col, band, value.into_scalar())
    }

    /// Read a sample addressed in this view's own axis order.
    pub fn get_ordered(&self, index: [usize; 3]) -> Result<Scalar> {
        let [row, col, band] = self.interleave.to_canonical(index);
        self.get(row, col, band)
    }

    /// Write a sample addressed in this view's own axis order.
    pub fn set_ordered(&self, index: [usize; 3], value: Scalar) -> Result<()> {
        let [row, col, band] = self.interleave.to_canonical(index);
        self.set(row, col, band, value)
    }

    /// Re-express an index in this view's axis order in another interleave's.
    pub fn translate_index(&self, index: [usize; 3], to: Interleave) -> [usize; 3] {
        translate(self.interleave, to, index)
    }

    /// Full spectrum of the pixel at `(row, col)`.
    pub fn read_pixel<T: Sample>(&self, row: usize, col: usize) -> Result<Array1<T>> {
        let region = self.read_subregion::<T>(row..row.saturating_add(1), col..col.saturating_add(1))?;
        Ok(region.slice_move(s![0, 0, ..]))
    }

    /// One band as a `rows x cols` image.
    pub fn read_band<T: Sample>(&self, band: usize) -> Result<Array2<T>> {
        let [rows, cols, bands] = self.dims;
        if band >= bands {
            return Err(self.out_of_range([0, 0, band]));
        }
        self.check_sample::<T>()?;

        let perm = self.canonical_axes();
        let (dtype, order) = (self.dtype, self.byte_order);
        let values = self.storage()?.with_native_array(|raw| {
            let canonical = raw.permuted_axes(perm);
            let plane = canonical.slice(s![.., .., band, ..]);
            Array2::from_shape_fn((rows, cols), |(r, c)| {
                decode_lane::<T>(plane.slice(s![r, c, ..]), dtype, order)
            })
        })?;
        collect_samples(values, dtype)
    }

    /// Samples of rows `rows` and columns `cols` across all bands, in
    /// `(row, col, band)` order.
    pub fn read_subregion<T: Sample>(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> Result<Array3<T>> {
        let [n_rows, n_cols, n_bands] = self.dims;
        if rows.start >= rows.end || rows.end > n_rows {
            return Err(self.out_of_range([rows.end.max(rows.start), cols.start, 0]));
        }
        if cols.start >= cols.end || cols.end > n_cols {
            return Err(self.out_of_range([rows.start, cols.end.max(cols.start), 0]));
        }
        self.check_sample::<T>()?;

        let perm = self.canonical_axes();
        let (dtype, order) = (self.dtype, self.byte_order);
        let shape = (rows.len(), cols.len(), n_bands);
        let values = self.storage()?.with_native_array(|raw| {
            let canonical = raw.permuted_axes(perm);
            let region = canonical.slice(s![rows.clone(), cols.clone(), .., ..]);
            Array3::from_shape_fn(shape, |(r, c, b)| {
                decode_lane::<T>(region.slice(s![r, c, b, ..]), dtype, order)
            })
        })?;
        collect_samples(values, dtype)
    }

    /// Force written samples to the backing file.
    ///
    /// Blocks until the OS reports completion. On failure the mapped memory
    /// keeps every write already applied.
    pub fn flush(&self) -> Result<()> {
        self.storage()?.flush()
    }

    /// Release this view's reference to the mapping. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.storage.take().is_some() {
            log::trace!("Closed {} view", self.interleave);
        }
    }

    /// Run `f` over the raw pixel bytes, in the file's layout and byte order.
    pub(crate) fn with_raw<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        Ok(self.storage()?.read(f))
    }

    /// Byte offset of an in-range `(row, col, band)` index.
    pub(crate) fn sample_offset(&self, [row, col, band]: [usize; 3]) -> usize {
        let [rs, cs, bs] = self.strides;
        (row * rs + col * cs + band * bs) * self.dtype.size()
    }

    /// Byte order of the backing file.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Axis permutation taking the native `(d0, d1, d2, byte)` array to
    /// `(row, col, band, byte)`.
    fn canonical_axes(&self) -> [usize; 4] {
        let [row, col, band] = self.native.to_canonical([0, 1, 2]);
        [row, col, band, 3]
    }

    fn byte_offset(&self, index: [usize; 3]) -> Result<usize> {
        if index.iter().zip(self.dims).any(|(&i, extent)| i >= extent) {
            return Err(self.out_of_range(index));
        }
        Ok(self.sample_offset(index))
    }

    fn out_of_range(&self, index: [usize; 3]) -> CubeError {
        CubeError::IndexOutOfRange {
            index,
            shape: self.dims,
        }
    }

    fn check_sample<T: Sample>(&self) -> Result<()> {
        if T::DTYPE == self.dtype {
            Ok(())
        } else {
            Err(CubeError::DTypeMismatch {
                expected: self.dtype,
                found: T::DTYPE,
            })
        }
    }

    fn storage(&self) -> Result<&Arc<CubeStorage>> {
        self.storage
            .as_ref()
            .ok_or_else(|| CubeError::use_after_close(format!("{} view is closed", self.interleave)))
    }
}

impl std::fmt::Debug for CubeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeView")
            .field("interleave", &self.interleave)
            .field("shape", &self.shape())
            .field("dtype", &self.dtype)
            .field("writable", &self.writable)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Decode one sample from its byte lane.
fn decode_lane<T: Sample>(lane: ArrayView1<'_, u8>, dtype: DataType, order: ByteOrder) -> Option<T> {
    let mut buf = [0u8; 8];
    for (dst, &src) in buf.iter_mut().zip(lane.iter()) {
        *dst = src;
    }
    T::from_scalar(Scalar::decode(dtype, order, &buf))
}

/// Unwrap decoded samples; `None` only appears when `T` disagrees with the cube.
fn collect_samples<T: Sample, D: ndarray::Dimension>(
    values: ndarray::Array<Option<T>, D>,
    dtype: DataType,
) -> Result<ndarray::Array<T, D>> {
    let dim = values.raw_dim();
    let samples = values
        .iter()
        .map(|&v| {
            v.ok_or(CubeError::DTypeMismatch {
                expected: dtype,
                found: T::DTYPE,
            })
        })
        .collect::<Result<Vec<T>>>()?;
    Ok(ndarray::Array::from_shape_vec(dim, samples)?)
}
