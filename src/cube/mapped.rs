//! Ownership of a cube file's memory mapping.

use std::fs::OpenOptions;
use std::sync::Arc;

use crate::cube::storage::CubeStorage;
use crate::cube::view::CubeView;
use crate::error::{CubeError, Result};
use crate::interleave::Interleave;
use crate::layout::{LayoutDescriptor, OpenMode};

/// A cube file mapped into memory.
///
/// Only the pixel region is mapped; header bytes before
/// [`LayoutDescriptor::header_offset`] are never touched. Samples stay in the
/// file's storage order and byte order, and are read or written through
/// [`CubeView`]s obtained from [`MappedCube::view`].
///
/// ## Lifetime
///
/// Views share the mapping with the cube. [`MappedCube::close`] refuses to
/// unmap while any view is still open, so views must be closed (or dropped)
/// first. Dropping a `MappedCube` without closing it keeps the mapping alive
/// until the last view goes away.
pub struct MappedCube {
    storage: Option<Arc<CubeStorage>>,
    layout: LayoutDescriptor,
    mode: OpenMode,
}

impl MappedCube {
    /// Map an existing cube file.
    ///
    /// The file length is validated eagerly: the bytes after the header must
    /// be exactly `rows * cols * bands * sizeof(dtype)` long, otherwise
    /// `FileSizeMismatch` is returned and nothing is mapped.
    pub fn open(layout: &LayoutDescriptor, mode: OpenMode) -> Result<Self> {
        let path = layout.path();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(path)
            .map_err(|e| CubeError::io(path, e))?;

        let file_len = file.metadata().map_err(|e| CubeError::io(path, e))?.len();
        let expected = layout.pixel_bytes();
        let actual = file_len.saturating_sub(layout.header_offset());
        if file_len < layout.header_offset() || actual != expected {
            return Err(CubeError::FileSizeMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        let storage = CubeStorage::map(&file, layout.clone(), mode)?;
        log::info!(
            "Mapped {:?}: {}x{}x{} {} {} ({} byte order, header {} bytes, {:?})",
            path,
            layout.rows(),
            layout.cols(),
            layout.bands(),
            layout.dtype(),
            layout.interleave(),
            layout.byte_order(),
            layout.header_offset(),
            mode
        );

        Ok(Self {
            storage: Some(Arc::new(storage)),
            layout: layout.clone(),
            mode,
        })
    }

    /// Create (or truncate) a zero-filled cube file and map it read-write.
    ///
    /// The header region, if any, is zero bytes.
    pub fn create(layout: &LayoutDescriptor) -> Result<Self> {
        let path = layout.path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| CubeError::io(path, e))?;
        file.set_len(layout.expected_file_len())
            .map_err(|e| CubeError::io(path, e))?;
        drop(file);

        log::debug!(
            "Created {:?} ({} bytes)",
            path,
            layout.expected_file_len()
        );
        Self::open(layout, OpenMode::ReadWrite)
    }

    /// Open a view presenting the cube in `interleave` order.
    ///
    /// Requesting a writable view of a read-only cube fails with
    /// `NotWritable`. No data is copied.
    pub fn view(&self, interleave: Interleave, writable: bool) -> Result<CubeView> {
        let storage = self.storage()?;
        if writable && self.mode == OpenMode::ReadOnly {
            return Err(CubeError::not_writable(format!(
                "cannot open a writable {} view of {:?}: cube was opened read-only",
                interleave,
                self.layout.path()
            )));
        }

        log::debug!(
            "Opened {} view of {} cube {:?} (writable: {})",
            interleave,
            self.layout.interleave(),
            self.layout.path(),
            writable
        );
        Ok(CubeView::new(Arc::clone(storage), interleave, writable))
    }

    /// Open a view in the file's own interleave.
    pub fn native_view(&self, writable: bool) -> Result<CubeView> {
        self.view(self.layout.interleave(), writable)
    }

    /// Release the mapping.
    ///
    /// Fails with `UseAfterClose` while views are still open; the cube stays
    /// usable in that case. Closing an already closed cube does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(storage) = self.storage.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(storage) {
            Ok(storage) => {
                drop(storage);
                log::debug!("Unmapped {:?}", self.layout.path());
                Ok(())
            }
            Err(storage) => {
                let views = Arc::strong_count(&storage) - 1;
                self.storage = Some(storage);
                log::warn!(
                    "Refusing to close {:?}: {} view(s) still open",
                    self.layout.path(),
                    views
                );
                Err(CubeError::use_after_close(format!(
                    "{:?} still has {} open view(s)",
                    self.layout.path(),
                    views
                )))
            }
        }
    }

    /// Layout this cube was opened with.
    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// Mode the file was mapped with.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Shape in storage order, outermost axis first.
    pub fn native_shape(&self) -> [usize; 3] {
        self.layout.storage_shape()
    }

    /// Number of views currently sharing the mapping.
    pub fn live_views(&self) -> usize {
        self.storage
            .as_ref()
            .map_or(0, |storage| Arc::strong_count(storage) - 1)
    }

    /// Whether [`close`](Self::close) has released the mapping.
    pub fn is_closed(&self) -> bool {
        self.storage.is_none()
    }

    /// Whether samples were written since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        self.storage.as_ref().is_some_and(|s| s.is_dirty())
    }

    /// Flush the mapping; equivalent to flushing any of its views.
    pub fn flush(&self) -> Result<()> {
        self.storage()?.flush()
    }

    fn storage(&self) -> Result<&Arc<CubeStorage>> {
        self.storage.as_ref().ok_or_else(|| {
            CubeError::use_after_close(format!("{:?} is closed", self.layout.path()))
        })
    }
}

impl std::fmt::Debug for MappedCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedCube")
            .field("path", &self.layout.path())
            .field("dims", &self.layout.dims())
            .field("interleave", &self.layout.interleave())
            .field("mode", &self.mode)
            .field("live_views", &self.live_views())
            .finish()
    }
}
