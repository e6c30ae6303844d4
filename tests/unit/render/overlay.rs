use super::*;
use crate::foundation::core::{PixelSize, Rgba8};

fn solid(w: u32, h: u32, px: [u8; 4]) -> DecodedImage {
    DecodedImage {
        width: w,
        height: h,
        rgba8_premul: px.repeat((w * h) as usize),
    }
}

#[test]
fn stretched_overlay_multiplies_every_pixel() {
    let mut sheet = Sheet::new();
    sheet.prepare(PixelSize::new(5, 3), Rgba8::opaque(128, 128, 128)).unwrap();

    let ov = OverlayCompositor::new(solid(1, 1, [128, 0, 0, 255]), BlendMode::Multiply, 1.0)
        .unwrap();
    ov.apply(&mut sheet).unwrap();
    assert_eq!(sheet.pixel(0, 0), Some([64, 0, 0, 255]));
    assert_eq!(sheet.pixel(4, 2), Some([64, 0, 0, 255]));
}

#[test]
fn zero_opacity_is_a_no_op_and_sheet_size_changes_are_followed() {
    let mut sheet = Sheet::new();
    sheet.prepare(PixelSize::new(2, 2), Rgba8::WHITE).unwrap();
    let ov = OverlayCompositor::new(solid(2, 2, [0, 0, 0, 255]), BlendMode::Normal, 0.0).unwrap();
    ov.apply(&mut sheet).unwrap();
    assert_eq!(sheet.pixel(1, 1), Some([255, 255, 255, 255]));

    let ov = OverlayCompositor::new(solid(2, 2, [0, 0, 0, 255]), BlendMode::Normal, 1.0).unwrap();
    ov.apply(&mut sheet).unwrap();
    assert_eq!(sheet.pixel(1, 1), Some([0, 0, 0, 255]));

    sheet.prepare(PixelSize::new(4, 1), Rgba8::WHITE).unwrap();
    ov.apply(&mut sheet).unwrap();
    assert_eq!(sheet.pixel(3, 0), Some([0, 0, 0, 255]));
}

#[test]
fn no_sheet_sized_buffer_outlives_the_sheet() {
    let mut sheet = Sheet::new();
    sheet.prepare(PixelSize::new(1000, 1000), Rgba8::WHITE).unwrap();
    let ov = OverlayCompositor::new(solid(1, 1, [0, 0, 255, 255]), BlendMode::Screen, 0.5).unwrap();
    ov.apply(&mut sheet).unwrap();
    sheet.release();

    assert!(sheet.is_released());
    assert_eq!(ov.retained_bytes(), 4);
}
