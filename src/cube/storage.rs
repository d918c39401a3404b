//! The mapping shared by a [`MappedCube`](super::MappedCube) and its views.

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use memmap2::{Mmap, MmapMut, MmapOptions};
use ndarray::ArrayView4;

use crate::error::{CubeError, Result};
use crate::layout::{LayoutDescriptor, OpenMode};

/// OS mapping of a cube's pixel region.
enum Mapping {
    ReadOnly(Mmap),
    /// Writers take the lock exclusively for the duration of one store.
    ReadWrite(RwLock<MmapMut>),
}

/// Pixel bytes of one cube file in native storage order and byte order.
pub(crate) struct CubeStorage {
    layout: LayoutDescriptor,
    mapping: Mapping,
    /// Element strides of the storage-order axes, outermost first.
    strides: [usize; 3],
    dirty: AtomicBool,
}

impl CubeStorage {
    /// Map the pixel region of an already validated file.
    pub(crate) fn map(file: &File, layout: LayoutDescriptor, mode: OpenMode) -> Result<Self> {
        let mapping = map_region(file, &layout, mode).map_err(|e| CubeError::io(layout.path(), e))?;
        let [_, d1, d2] = layout.storage_shape();

        Ok(Self {
            strides: [d1 * d2, d2, 1],
            layout,
            mapping,
            dirty: AtomicBool::new(false),
        })
    }

    pub(crate) fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// Storage-order element strides.
    pub(crate) fn strides(&self) -> [usize; 3] {
        self.strides
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Run `f` over the whole pixel region.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.mapping {
            Mapping::ReadOnly(map) => f(&map[..]),
            Mapping::ReadWrite(lock) => {
                let guard = lock.read().unwrap_or_else(PoisonError::into_inner);
                f(&guard[..])
            }
        }
    }

    /// Run `f` over the pixel region with write access.
    ///
    /// Returns `NotWritable` for read-only mappings.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        match &self.mapping {
            Mapping::ReadOnly(_) => Err(CubeError::not_writable(format!(
                "{:?} is mapped read-only",
                self.layout.path()
            ))),
            Mapping::ReadWrite(lock) => {
                let mut guard = lock.write().unwrap_or_else(PoisonError::into_inner);
                let result = f(&mut guard[..]);
                self.dirty.store(true, Ordering::Release);
                Ok(result)
            }
        }
    }

    /// Run `f` over the pixel region viewed as a `(d0, d1, d2, sample_bytes)`
    /// array in storage order.
    pub(crate) fn with_native_array<R>(&self, f: impl FnOnce(ArrayView4<'_, u8>) -> R) -> Result<R> {
        let [d0, d1, d2] = self.layout.storage_shape();
        let sample = self.layout.dtype().size();
        self.read(|bytes| {
            let raw = ArrayView4::from_shape((d0, d1, d2, sample), bytes)?;
            Ok(f(raw))
        })
    }

    /// Write dirty pages back to the file and wait for completion.
    pub(crate) fn flush(&self) -> Result<()> {
        let Mapping::ReadWrite(lock) = &self.mapping else {
            return Ok(());
        };

        let guard = lock.read().unwrap_or_else(PoisonError::into_inner);
        guard.flush().map_err(|source| CubeError::IoFlush {
            path: self.layout.path().to_path_buf(),
            source,
        })?;
        self.dirty.store(false, Ordering::Release);
        log::debug!("Flushed {:?}", self.layout.path());
        Ok(())
    }
}

#[expect(unsafe_code, reason = "memory mapping a file is inherently unsafe")]
fn map_region(file: &File, layout: &LayoutDescriptor, mode: OpenMode) -> std::io::Result<Mapping> {
    let mut options = MmapOptions::new();
    options
        .offset(layout.header_offset())
        .len(layout.pixel_bytes() as usize);

    // SAFETY: the file length was checked against the layout before mapping.
    // Truncation of the file by another process while mapped is outside what
    // this crate can guard against, as for any shared file mapping.
    let mapping = match mode {
        OpenMode::ReadOnly => Mapping::ReadOnly(unsafe { options.map(file)? }),
        OpenMode::ReadWrite => Mapping::ReadWrite(RwLock::new(unsafe { options.map_mut(file)? })),
    };
    Ok(mapping)
}
