//! # Kernel ELF Tests
//!
//! Images come from [`ImageBuilder::elf`], so byte order, word size and the
//! symbol table go through the real ELF reader.

use std::fs;
use std::path::Path;

use dtgen_core::config::HandleConfig;
use dtgen_core::handles::{self, KernelImage};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::{chain, chain_image};
use crate::common::harness::{init_logging, temp_dir};
use crate::common::image::{ImageBuilder, START, STRUCT_SIZE, pass1};

fn parse(builder: &ImageBuilder) -> KernelImage {
    KernelImage::parse(&builder.elf(), Path::new("zephyr_pre0.elf")).expect("valid ELF")
}

#[rstest]
#[case::le32(ImageBuilder::new(), false, 4)]
#[case::be32(ImageBuilder::new().big_endian(), true, 4)]
#[case::le64(ImageBuilder::new().class_64(), false, 8)]
#[case::be64(ImageBuilder::new().big_endian().class_64(), true, 8)]
fn test_elf_class_and_byte_order(
    #[case] builder: ImageBuilder,
    #[case] big_endian: bool,
    #[case] pointer_size: usize,
) {
    let image = parse(&chain_image(builder));
    assert_eq!(image.is_big_endian(), big_endian);
    assert_eq!(image.pointer_size(), pointer_size);

    let bus = image.symbol("__device_bus").expect("device symbol");
    assert!(bus.is_object);
    assert_eq!((bus.address, bus.size), (START, STRUCT_SIZE));
    let start = image.symbol("__device_start").expect("linker constant");
    assert!(!start.is_object);
    assert_eq!(start.address, START);

    let handles = image.symbol("__devicehdl_sensor").expect("handles symbol");
    assert_eq!(
        image.read_i16s(handles.address, 4),
        Some(pass1(2, &[1], &[], &[], 0))
    );
}

#[rstest]
#[case::le32(ImageBuilder::new())]
#[case::be32(ImageBuilder::new().big_endian())]
#[case::le64(ImageBuilder::new().class_64())]
#[case::be64(ImageBuilder::new().big_endian().class_64())]
fn test_elf_renders_like_memory_image(#[case] builder: ImageBuilder) {
    let builder = chain_image(builder);
    let edt = chain().build();
    let from_memory = handles::render(&builder.build(), &edt, "__device_start", 0).expect("memory");
    let from_elf = handles::render(&parse(&builder), &edt, "__device_start", 0).expect("elf");
    assert_eq!(from_elf.0, from_memory.0);
}

#[test]
fn test_elf_power_domain_flags() {
    let builder = ImageBuilder::new()
        .big_endian()
        .class_64()
        .with_pm()
        .pm_device("bus", pass1(1, &[], &[], &[], 4), true);
    let edt = chain().build();
    let (source, _) =
        handles::render(&parse(&builder), &edt, "__device_start", 4).expect("translated");
    assert!(source.contains("DEVICE_HANDLE_NULL, DEVICE_HANDLE_NULL, DEVICE_HANDLE_ENDS };\n"));
}

#[test]
fn test_generate_from_elf_on_disk() {
    init_logging();
    let dir = temp_dir();
    let builder = chain_image(ImageBuilder::new().class_64());
    let kernel = dir.path().join("zephyr_pre0.elf");
    fs::write(&kernel, builder.elf()).expect("write kernel");
    let config = HandleConfig {
        kernel,
        output_source: dir.path().join("dev_handles.c"),
        start_symbol: "__device_start".to_string(),
        edt_pickle: Some(chain().write(dir.path())),
        ..HandleConfig::default()
    };
    let summary = handles::generate(&config).expect("generated");
    assert_eq!((summary.devices, summary.rewritten), (3, 3));

    let (expected, _) =
        handles::render(&builder.build(), &chain().build(), "__device_start", 0).expect("memory");
    assert_eq!(fs::read_to_string(&config.output_source).expect("source written"), expected);
}
