use super::*;
use crate::foundation::core::PixelSize;
use crate::render::surface::CellTile;

fn assert_rect(r: Rect, x0: f64, y0: f64, x1: f64, y1: f64) {
    for (a, b) in [(r.x0, x0), (r.y0, y0), (r.x1, x1), (r.y1, y1)] {
        assert!((a - b).abs() < 1e-9, "{r:?} != ({x0}, {y0}, {x1}, {y1})");
    }
}

#[test]
fn wide_image_fills_height_and_centers_horizontally() {
    let r = cover_fit(200, 100, Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_rect(r, -50.0, 0.0, 150.0, 100.0);
}

#[test]
fn tall_image_fills_width_and_centers_vertically() {
    let r = cover_fit(100, 400, Rect::new(10.0, 20.0, 110.0, 220.0));
    assert_rect(r, 10.0, -80.0, 110.0, 320.0);
}

#[test]
fn equal_ratio_matches_cell() {
    let cell = Rect::new(0.0, 0.0, 300.0, 150.0);
    assert_rect(cover_fit(600, 300, cell), 0.0, 0.0, 300.0, 150.0);
}

#[test]
fn degenerate_sizes_fall_back_to_cell() {
    let cell = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(cover_fit(0, 5, cell), cell);
}

#[test]
fn broken_image_paints_placeholder_fill() {
    let mut tile = CellTile::new();
    let broken = Acquired::Broken {
        attempts: 3,
        reason: "gone".into(),
    };
    let pm = tile
        .render(PixelSize::new(40, 40), |ctx| {
            draw_cell(ctx, Rect::new(0.0, 0.0, 40.0, 40.0), &broken);
            Ok(())
        })
        .unwrap();
    assert_eq!(&pm.data_as_u8_slice()[..4], &[0xe5, 0xe7, 0xeb, 255]);
}

#[test]
fn decoded_image_covers_whole_cell() {
    let img = DecodedImage {
        width: 2,
        height: 1,
        rgba8_premul: vec![0, 0, 255, 255, 0, 0, 255, 255],
    };
    let mut tile = CellTile::new();
    let pm = tile
        .render(PixelSize::new(8, 8), |ctx| {
            draw_cell(ctx, Rect::new(0.0, 0.0, 8.0, 8.0), &Acquired::Decoded(img));
            Ok(())
        })
        .unwrap();
    let px = pm.data_as_u8_slice();
    assert_eq!(&px[..4], &[0, 0, 255, 255]);
    let last = px.len() - 4;
    assert_eq!(&px[last..], &[0, 0, 255, 255]);
}
