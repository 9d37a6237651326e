//! # Device Table Tests

use dtgen_core::Error;
use dtgen_core::handles::device::{DEVICE_HANDLE_ENDS, DEVICE_HANDLE_SEP};
use dtgen_core::handles::{DeviceTable, KernelImage, LinkerConstants, Symbol};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::chain_image;
use crate::common::image::{self, ImageBuilder, pass1};

fn scan(image: &KernelImage) -> dtgen_core::Result<DeviceTable> {
    let constants = LinkerConstants::scan(image, "__device_start")?;
    DeviceTable::scan(image, &constants)
}

#[rstest]
#[case::le32(ImageBuilder::new())]
#[case::be32(ImageBuilder::new().big_endian())]
#[case::le64(ImageBuilder::new().class_64())]
#[case::be64(ImageBuilder::new().big_endian().class_64())]
fn test_scan_pairs_devices(#[case] builder: ImageBuilder) {
    let table = scan(&chain_image(builder).build()).expect("scanned");

    let devices: Vec<(&str, i16)> = table
        .devices()
        .iter()
        .map(|d| (d.symbol.as_str(), d.handle))
        .collect();
    assert_eq!(
        devices,
        [("__device_bus", 1), ("__device_sensor", 2), ("__device_app", 3)]
    );

    let app = table.devices()[2].handles.as_ref().expect("paired");
    assert_eq!(app.symbol, "__devicehdl_app");
    assert_eq!(app.ordinal, Some(4));
    assert_eq!(app.depends, vec![3]);
    assert_eq!(app.capacity, 5);
    assert_eq!(table.with_handles().count(), 3);
}

#[test]
fn test_linker_constants() {
    let image = ImageBuilder::new().with_pm().build();
    let constants = LinkerConstants::scan(&image, "__device_start").expect("complete");
    assert_eq!(constants.start, image::START);
    assert_eq!(constants.struct_size, image::STRUCT_SIZE);
    assert_eq!(constants.handles_offset, image::HANDLES_OFFSET);
    let pm = constants.pm.expect("pm layout");
    assert_eq!(pm.flag_pd, image::PM_FLAG_PD);
    assert_eq!(pm.pm_offset, image::PM_OFFSET);

    let plain = LinkerConstants::scan(&ImageBuilder::new().build(), "__device_start").expect("complete");
    assert!(plain.pm.is_none());
}

#[rstest]
#[case::size("_DEVICE_STRUCT_SIZEOF", "_DEVICE_STRUCT_SIZEOF")]
#[case::start("__device_start", "__device_start")]
#[case::handles("_DEVICE_STRUCT_HANDLES_OFFSET", "_DEVICE_STRUCT_HANDLES_OFFSET")]
fn test_missing_constant(#[case] dropped: &str, #[case] reported: &str) {
    let full = ImageBuilder::new().build();
    let mut image = KernelImage::new(false, false);
    for symbol in full.symbols().iter().filter(|s| s.name != dropped) {
        image.add_symbol(symbol.clone());
    }
    let err = LinkerConstants::scan(&image, "__device_start").unwrap_err();
    assert!(matches!(err, Error::ConstantMissing { name } if name == reported));
}

#[test]
fn test_custom_start_symbol() {
    let err = LinkerConstants::scan(&ImageBuilder::new().build(), "_device_list_start").unwrap_err();
    assert_eq!(err.to_string(), "linker map data incomplete: missing _device_list_start");
}

#[test]
fn test_power_domain_flag() {
    let image = ImageBuilder::new()
        .with_pm()
        .pm_device("domain", pass1(1, &[], &[], &[], 4), true)
        .pm_device("leaf", pass1(2, &[], &[], &[], 0), false)
        .device("plain", pass1(3, &[], &[], &[], 0))
        .build();
    let table = scan(&image).expect("scanned");
    let flags: Vec<bool> = table.devices().iter().map(|d| d.power_domain).collect();
    assert_eq!(flags, [true, false, false]);
}

#[test]
fn test_device_without_handles_is_kept() {
    let image = ImageBuilder::new()
        .device("bus", pass1(1, &[], &[], &[], 0))
        .bare_device("late")
        .build();
    let table = scan(&image).expect("scanned");
    assert_eq!(table.len(), 2);
    assert!(table.devices()[1].handles.is_none());
    assert_eq!(table.with_handles().count(), 1);
}

#[test]
fn test_unpaired_handles_array() {
    let mut image = ImageBuilder::new().device("bus", pass1(1, &[], &[], &[], 0)).build();
    let stray: Vec<u8> = pass1(2, &[], &[], &[], 0)
        .iter()
        .flat_map(|h| h.to_le_bytes())
        .collect();
    image.add_symbol(Symbol {
        name: "__devicehdl_stray".to_string(),
        address: 0x4000,
        size: stray.len() as u64,
        is_object: true,
    });
    image.add_section(0x4000, stray);

    let err = scan(&image).unwrap_err();
    assert_eq!(err.to_string(), "no device for __devicehdl_stray");
}

#[test]
fn test_unreadable_handles_array() {
    let mut image = ImageBuilder::new().build();
    image.add_symbol(Symbol {
        name: "__devicehdl_ghost".to_string(),
        address: 0x9000,
        size: 8,
        is_object: true,
    });
    let err = scan(&image).unwrap_err();
    assert!(matches!(err, Error::UnreadableSymbol { address: 0x9000, .. }));
}

#[test]
fn test_misaligned_device() {
    let mut image = ImageBuilder::new().device("bus", pass1(1, &[], &[], &[], 0)).build();
    image.add_symbol(Symbol {
        name: "__device_odd".to_string(),
        address: image::START + 4,
        size: image::STRUCT_SIZE,
        is_object: true,
    });
    let err = scan(&image).unwrap_err();
    assert!(matches!(err, Error::MalformedHandles { name, .. } if name == "__device_odd"));
}

#[test]
fn test_unterminated_array_in_image() {
    let image = ImageBuilder::new()
        .device("bus", vec![1, DEVICE_HANDLE_SEP, DEVICE_HANDLE_SEP])
        .build();
    let err = scan(&image).unwrap_err();
    assert!(err.to_string().contains("missing DEVICE_HANDLE_ENDS"));

    let image = ImageBuilder::new()
        .device("bus", vec![-3, DEVICE_HANDLE_SEP, DEVICE_HANDLE_SEP, DEVICE_HANDLE_ENDS])
        .build();
    assert!(scan(&image).unwrap_err().to_string().contains("negative devicetree ordinal"));
}
