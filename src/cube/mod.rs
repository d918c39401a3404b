//! Memory-mapped cubes and the views that read and write them.
//!
//! This module provides:
//! - `MappedCube`: owns the mapping of a cube file's pixel region
//! - `CubeView`: interleave-transparent, byte-order adapted access to it
//!
//! ```rust,ignore
//! use hvcube::{Interleave, MappedCube, OpenMode};
//!
//! let cube = MappedCube::open(&layout, OpenMode::ReadWrite)?;
//! let view = cube.view(Interleave::Bip, true)?;
//! let value = view.get(30, 40, 25)?;
//! view.set(30, 40, 25, value)?;
//! view.flush()?;
//! ```

mod mapped;
mod storage;
mod view;

pub use mapped::MappedCube;
pub use view::CubeView;
