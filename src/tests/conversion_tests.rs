//! Conversions between layouts must preserve every sample exactly.

use crate::MappedCube;
use crate::convert::{ConvertOptions, convert, convert_with};
use crate::interleave::Interleave;
use crate::layout::{ByteOrder, DataType, LayoutDescriptor, OpenMode};
use crate::scalar::Scalar;
use crate::tests::fixtures::{self, init_logging, ramp_value, same_sample};

const DIMS: [usize; 3] = [6, 5, 4];

fn assert_same_cube(a: &LayoutDescriptor, b: &LayoutDescriptor) {
    let a_cube = MappedCube::open(a, OpenMode::ReadOnly).unwrap();
    let b_cube = MappedCube::open(b, OpenMode::ReadOnly).unwrap();
    let a_view = a_cube.view(Interleave::Bip, false).unwrap();
    let b_view = b_cube.view(Interleave::Bsq, false).unwrap();

    let [rows, cols, bands] = a.dims();
    for r in 0..rows {
        for c in 0..cols {
            for k in 0..bands {
                let (x, y) = (a_view.get(r, c, k).unwrap(), b_view.get(r, c, k).unwrap());
                assert!(same_sample(x, y), "({r}, {c}, {k}): {x} != {y}");
            }
        }
    }
}

#[test]
fn test_round_trip_restores_original_bytes() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    for from in Interleave::ALL {
        for to in Interleave::ALL {
            let name = format!("orig_{}_{}.img", from.name(), to.name());
            let original = fixtures::write_ramp_cube(dir.path(), &name, DIMS, DataType::Int16, from);
            let there = original
                .clone()
                .with_interleave(to)
                .with_path(dir.path().join(format!("there_{}_{}.img", from.name(), to.name())));
            let back = original
                .clone()
                .with_path(dir.path().join(format!("back_{}_{}.img", from.name(), to.name())));

            {
                let cube = MappedCube::open(&original, OpenMode::ReadOnly).unwrap();
                convert(&cube.native_view(false).unwrap(), &there).unwrap();
            }
            {
                let cube = MappedCube::open(&there, OpenMode::ReadOnly).unwrap();
                convert(&cube.view(Interleave::Bil, false).unwrap(), &back).unwrap();
            }

            assert_same_cube(&original, &there);
            assert_eq!(
                std::fs::read(original.path()).unwrap(),
                std::fs::read(back.path()).unwrap(),
                "{from} -> {to} -> {from}"
            );
        }
    }
}

#[test]
fn test_byte_order_conversion_is_exact_for_floats() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixtures::layout(dir.path(), "le.img", DIMS, DataType::Float32, Interleave::Bil)
        .with_byte_order(ByteOrder::Little);
    let specials = [
        f32::from_bits(0x7fc0_1234),
        -0.0,
        f32::INFINITY,
        f32::MIN_POSITIVE / 2.0,
    ];
    fixtures::write_cube(&source, |r, c, b| {
        if r == 0 && c == 0 {
            Scalar::Float32(specials[b])
        } else {
            ramp_value(DataType::Float32, r, c, b)
        }
    });

    let big = source
        .clone()
        .with_byte_order(ByteOrder::Big)
        .with_interleave(Interleave::Bip)
        .with_header_offset(100)
        .unwrap()
        .with_path(dir.path().join("be.img"));
    let little_again = source.clone().with_path(dir.path().join("le_again.img"));

    {
        let cube = MappedCube::open(&source, OpenMode::ReadOnly).unwrap();
        convert(&cube.native_view(false).unwrap(), &big).unwrap();
    }
    assert_same_cube(&source, &big);

    let cube = MappedCube::open(&big, OpenMode::ReadOnly).unwrap();
    let view = cube.view(Interleave::Bsq, false).unwrap();
    for (b, special) in specials.iter().enumerate() {
        assert_eq!(view.get_as::<f32>(0, 0, b).unwrap().to_bits(), special.to_bits());
    }

    let options = ConvertOptions::new().with_chunk_elements(3);
    convert_with(&view, &little_again, &options).unwrap();
    assert_eq!(
        std::fs::read(source.path()).unwrap(),
        std::fs::read(little_again.path()).unwrap()
    );
}

#[test]
fn test_chunk_size_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixtures::write_ramp_cube(dir.path(), "src.img", DIMS, DataType::UInt64, Interleave::Bsq);
    let cube = MappedCube::open(&source, OpenMode::ReadOnly).unwrap();
    let view = cube.native_view(false).unwrap();

    let mut outputs = Vec::new();
    for chunk in [1, 7, 120, 10_000] {
        let target = source
            .clone()
            .with_interleave(Interleave::Bip)
            .with_byte_order(ByteOrder::Big)
            .with_path(dir.path().join(format!("chunk_{chunk}.img")));
        let status = convert_with(&view, &target, &ConvertOptions::new().with_chunk_elements(chunk)).unwrap();
        assert_eq!(status.chunks, 120usize.div_ceil(chunk));
        outputs.push(std::fs::read(target.path()).unwrap());
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_unflushed_writes_are_converted() {
    // The converter reads the shared mapping, so pending writes are included.
    let dir = tempfile::tempdir().unwrap();
    let source = fixtures::write_ramp_cube(dir.path(), "dirty.img", DIMS, DataType::UInt32, Interleave::Bip);
    let cube = MappedCube::open(&source, OpenMode::ReadWrite).unwrap();
    let writer = cube.view(Interleave::Bip, true).unwrap();
    writer.set_as(5, 4, 3, 42u32).unwrap();

    let target = source
        .clone()
        .with_interleave(Interleave::Bsq)
        .with_path(dir.path().join("dirty.bsq"));
    convert(&writer, &target).unwrap();

    let converted = MappedCube::open(&target, OpenMode::ReadOnly).unwrap();
    assert_eq!(
        converted.native_view(false).unwrap().get_as::<u32>(5, 4, 3).unwrap(),
        42
    );
}

#[test]
fn test_destination_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixtures::write_ramp_cube(dir.path(), "t.img", DIMS, DataType::UInt8, Interleave::Bip);
    let target = source.clone().with_path(dir.path().join("existing.img"));
    std::fs::write(target.path(), vec![0xFFu8; 10_000]).unwrap();

    let cube = MappedCube::open(&source, OpenMode::ReadOnly).unwrap();
    convert(&cube.native_view(false).unwrap(), &target).unwrap();
    assert_eq!(std::fs::metadata(target.path()).unwrap().len(), target.expected_file_len());
    assert!(MappedCube::open(&target, OpenMode::ReadOnly).is_ok());
}
