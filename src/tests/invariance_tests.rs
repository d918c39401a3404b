//! Every interleave must present the same samples, whatever the file layout.

use crate::MappedCube;
use crate::interleave::Interleave;
use crate::layout::{ByteOrder, DataType, OpenMode};
use crate::tests::fixtures::{self, init_logging, ramp_value, same_sample};

const DIMS: [usize; 3] = [4, 5, 6];

/// Compare all three views of one cube against the ramp, sample by sample.
fn assert_views_agree(cube: &MappedCube) {
    let dtype = cube.layout().dtype();
    let views: Vec<_> = Interleave::ALL
        .iter()
        .map(|&interleave| cube.view(interleave, false).unwrap())
        .collect();

    let [rows, cols, bands] = DIMS;
    for r in 0..rows {
        for c in 0..cols {
            for b in 0..bands {
                let expected = ramp_value(dtype, r, c, b);
                for view in &views {
                    let got = view.get(r, c, b).unwrap();
                    assert!(
                        same_sample(got, expected),
                        "{} view of {} cube at ({r}, {c}, {b}): got {got}, expected {expected}",
                        view.interleave(),
                        cube.layout().interleave()
                    );
                }
            }
        }
    }
}

#[test]
fn test_views_agree_for_every_native_interleave() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    for native in Interleave::ALL {
        let name = format!("ramp_{}.img", native.name());
        let layout = fixtures::write_ramp_cube(dir.path(), &name, DIMS, DataType::Float32, native);
        let cube = MappedCube::open(&layout, OpenMode::ReadOnly).unwrap();
        assert_views_agree(&cube);
    }
}

#[test]
fn test_views_agree_across_dtypes_byte_orders_and_headers() {
    let dir = tempfile::tempdir().unwrap();
    let dtypes = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
    ];

    for dtype in dtypes {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for native in Interleave::ALL {
                let name = format!("{}_{}_{}.img", dtype, order, native.name());
                let layout = fixtures::layout(dir.path(), &name, DIMS, dtype, native)
                    .with_byte_order(order)
                    .with_header_offset(7)
                    .unwrap();
                fixtures::write_ramp_layout(&layout);

                let cube = MappedCube::open(&layout, OpenMode::ReadOnly).unwrap();
                assert_views_agree(&cube);
            }
        }
    }
}

#[test]
fn test_ordered_indexing_matches_storage_layout() {
    // Same cell through each view's own axis order, as mm[i, j, k], mm[i, k, j]
    // and mm[k, i, j].
    let dir = tempfile::tempdir().unwrap();
    let layout = fixtures::write_ramp_cube(dir.path(), "ordered.img", DIMS, DataType::Int32, Interleave::Bil);
    let cube = MappedCube::open(&layout, OpenMode::ReadOnly).unwrap();
    let (i, j, k) = (3, 4, 5);
    let expected = ramp_value(DataType::Int32, i, j, k);

    let bip = cube.view(Interleave::Bip, false).unwrap();
    let bil = cube.view(Interleave::Bil, false).unwrap();
    let bsq = cube.view(Interleave::Bsq, false).unwrap();
    assert_eq!(bip.get_ordered([i, j, k]).unwrap(), expected);
    assert_eq!(bil.get_ordered([i, k, j]).unwrap(), expected);
    assert_eq!(bsq.get_ordered([k, i, j]).unwrap(), expected);
}
