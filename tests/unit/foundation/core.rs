use super::*;

#[test]
fn pixel_size_rgba_len_and_empty() {
    assert_eq!(PixelSize::new(3, 2).rgba_len(), 24);
    assert!(PixelSize::new(0, 2).is_empty());
    assert!(!PixelSize::new(1, 1).is_empty());
}

#[test]
fn premul_scales_color_channels_only() {
    assert_eq!(Rgba8::WHITE.premul(), [255, 255, 255, 255]);
    assert_eq!(Rgba8::new(255, 0, 100, 0).premul(), [0, 0, 0, 0]);
    let p = Rgba8::new(200, 100, 50, 128).premul();
    assert_eq!(p[3], 128);
    assert_eq!(p[0], ((200u32 * 128 + 127) / 255) as u8);
}

#[test]
fn rect_conversion_keeps_coordinates() {
    let r = rect_to_cpu(Rect::new(1.0, 2.0, 30.5, 40.0));
    assert_eq!((r.x0, r.y0, r.x1, r.y1), (1.0, 2.0, 30.5, 40.0));
}
