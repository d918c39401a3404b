//! Streaming conversion of a cube into a new file with another layout.
//!
//! The destination is written strictly sequentially, walking its own storage
//! order outermost axis first. Samples are gathered from the source view into
//! a fixed-size chunk buffer, byte-swapped if the byte orders differ, and
//! appended to the file. Memory use is bounded by the chunk size, not by the
//! cube size.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use web_time::Instant;

use crate::config::CubeConfig;
use crate::cube::CubeView;
use crate::error::{CubeError, Result};
use crate::layout::{ByteOrder, LayoutDescriptor};
use crate::scalar::transcode;

/// Tuning for [`convert_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Maximum number of samples gathered before each write.
    pub chunk_elements: usize,
}

impl ConvertOptions {
    /// Default chunk size (1 Mi samples, at most 8 MiB of buffer).
    pub const DEFAULT_CHUNK_ELEMENTS: usize = 1 << 20;

    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size; values below one sample are raised to one.
    pub fn with_chunk_elements(mut self, chunk_elements: usize) -> Self {
        self.chunk_elements = chunk_elements.max(1);
        self
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_elements: Self::DEFAULT_CHUNK_ELEMENTS,
        }
    }
}

impl From<&CubeConfig> for ConvertOptions {
    fn from(config: &CubeConfig) -> Self {
        Self::new().with_chunk_elements(config.converter.chunk_elements)
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertStatus {
    /// Samples written
    pub elements: usize,
    /// Bytes written, header padding included
    pub bytes_written: u64,
    /// Number of chunk writes
    pub chunks: usize,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Convert the cube behind `source` into a new file described by
/// `destination`, using default options.
pub fn convert(source: &CubeView, destination: &LayoutDescriptor) -> Result<ConvertStatus> {
    convert_with(source, destination, &ConvertOptions::default())
}

/// Convert the cube behind `source` into a new file described by
/// `destination`.
///
/// `destination` must agree with the source on rows, columns, bands and data
/// type; interleave, byte order, header offset and path may differ. The
/// destination file is created or truncated, and its header region is zero
/// filled. If an I/O error interrupts the conversion the partially written
/// file is left in place.
///
/// Writers on the source cube are blocked while the conversion runs.
pub fn convert_with(
    source: &CubeView,
    destination: &LayoutDescriptor,
    options: &ConvertOptions,
) -> Result<ConvertStatus> {
    let start = Instant::now();
    let src_layout = source.layout()?;
    check_compatible(src_layout, destination)?;

    let dst_path = destination.path();
    let mut file = File::create(dst_path).map_err(|e| CubeError::io(dst_path, e))?;
    file.set_len(destination.expected_file_len())
        .map_err(|e| CubeError::io(dst_path, e))?;
    io::copy(
        &mut io::repeat(0).take(destination.header_offset()),
        &mut file,
    )
    .map_err(|e| CubeError::io(dst_path, e))?;

    log::info!(
        "Converting {:?} ({} {}) -> {:?} ({} {})",
        src_layout.path(),
        src_layout.interleave(),
        src_layout.byte_order(),
        dst_path,
        destination.interleave(),
        destination.byte_order()
    );

    let chunk_elements = options.chunk_elements.max(1);
    let chunks = source.with_raw(|bytes| {
        let mut stream = SampleStream {
            source,
            bytes,
            src_order: src_layout.byte_order(),
            destination,
            buffer: vec![0u8; chunk_elements.min(destination.element_count()) * destination.dtype().size()],
        };
        stream.write_all(&mut file)
    })??;

    file.sync_all().map_err(|e| CubeError::io(dst_path, e))?;

    let status = ConvertStatus {
        elements: destination.element_count(),
        bytes_written: destination.expected_file_len(),
        chunks,
        elapsed: start.elapsed(),
    };
    log::info!(
        "Converted {} samples in {} chunk(s) ({:.1?})",
        status.elements,
        status.chunks,
        status.elapsed
    );
    Ok(status)
}

/// Reject destinations that would change the cube's content or clobber its
/// own backing file.
fn check_compatible(source: &LayoutDescriptor, destination: &LayoutDescriptor) -> Result<()> {
    if source.dims() != destination.dims() {
        return Err(CubeError::incompatible_layout(format!(
            "dimensions differ: source {:?}, destination {:?}",
            source.dims(),
            destination.dims()
        )));
    }
    if source.dtype() != destination.dtype() {
        return Err(CubeError::incompatible_layout(format!(
            "data types differ: source {}, destination {}",
            source.dtype(),
            destination.dtype()
        )));
    }
    if same_file(source.path(), destination.path()) {
        return Err(CubeError::incompatible_layout(format!(
            "destination {:?} is the source file",
            destination.path()
        )));
    }
    Ok(())
}

/// Whether `a` and `b` name the same file, hard links included.
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Gathers source samples in destination storage order.
struct SampleStream<'a> {
    source: &'a CubeView,
    bytes: &'a [u8],
    src_order: ByteOrder,
    destination: &'a LayoutDescriptor,
    buffer: Vec<u8>,
}

impl SampleStream<'_> {
    /// Fill and write chunks until the whole cube is written. Returns the
    /// number of chunks.
    fn write_all(&mut self, out: &mut impl Write) -> Result<usize> {
        let shape = self.destination.storage_shape();
        let interleave = self.destination.interleave();
        let dst_order = self.destination.byte_order();
        let size = self.destination.dtype().size();
        let total = self.destination.element_count();
        let chunk_elements = self.buffer.len() / size;

        let mut index = [0usize; 3];
        let mut written = 0;
        let mut chunks = 0;
        while written < total {
            let count = chunk_elements.min(total - written);
            let chunk = &mut self.buffer[..count * size];
            for slot in chunk.chunks_exact_mut(size) {
                let offset = self.source.sample_offset(interleave.to_canonical(index));
                transcode(&self.bytes[offset..offset + size], self.src_order, slot, dst_order);
                advance(&mut index, shape);
            }

            out.write_all(chunk)
                .map_err(|e| CubeError::io(self.destination.path(), e))?;
            written += count;
            chunks += 1;
            log::trace!("Wrote chunk {} ({}/{} samples)", chunks, written, total);
        }
        Ok(chunks)
    }
}

/// Step a storage-order index to the next sample, innermost axis fastest.
fn advance(index: &mut [usize; 3], shape: [usize; 3]) {
    for axis in (0..3).rev() {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return;
        }
        index[axis] = 0;
    }
}
