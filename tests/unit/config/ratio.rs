use super::*;

fn cfg_with(aspect: &str, cols: u32) -> SheetConfig {
    let mut cfg = SheetConfig {
        aspect_ratio: aspect.to_string(),
        ..SheetConfig::default()
    };
    cfg.grid.cols = cols;
    cfg
}

#[test]
fn custom_ratio_defaults_missing_sides() {
    let cfg = cfg_with("custom", 3);
    assert!((resolve_ratio(&cfg).unwrap() - 1000.0 / 1500.0).abs() < 1e-12);

    let mut cfg = cfg_with("custom", 3);
    cfg.custom_width = Some(1200);
    assert!((resolve_ratio(&cfg).unwrap() - 1200.0 / 1500.0).abs() < 1e-12);

    cfg.custom_height = Some(600);
    assert!((resolve_ratio(&cfg).unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn named_ratio_parses_as_decimal() {
    assert!((resolve_ratio(&cfg_with("0.75", 3)).unwrap() - 0.75).abs() < 1e-12);
    assert!(resolve_ratio(&cfg_with("3:4", 3)).is_err());
    assert!(resolve_ratio(&cfg_with("0", 3)).is_err());
    assert!(resolve_ratio(&cfg_with("NaN", 3)).is_err());
}

#[test]
fn cell_width_is_capped_and_height_follows() {
    let mut cfg = cfg_with("0.5", 10);
    cfg.cell_width = 2000;
    let cell = cell_size(&cfg).unwrap();
    assert_eq!(cell.width, 819);
    assert!(cell.width * 10 <= MAX_SHEET_DIM);
    assert_eq!(cell.height, 1638);
}

#[test]
fn cell_size_uses_custom_width_for_custom_ratio() {
    let mut cfg = cfg_with("custom", 2);
    cfg.custom_width = Some(400);
    cfg.custom_height = Some(300);
    assert_eq!(cell_size(&cfg).unwrap(), PixelSize::new(400, 300));
}

#[test]
fn grid_rows_follow_image_count() {
    let cell = PixelSize::new(10, 20);
    assert_eq!(GridSpec::for_count(3, 3, cell, 0).rows, 1);
    assert_eq!(GridSpec::for_count(4, 3, cell, 0).rows, 2);
    assert_eq!(GridSpec::for_count(9, 3, cell, 0).rows, 3);
}

#[test]
fn sheet_size_includes_gaps_between_cells_only() {
    let g = GridSpec::for_count(4, 3, PixelSize::new(10, 20), 2);
    assert_eq!(g.sheet_size(), PixelSize::new(3 * 10 + 2 * 2, 2 * 20 + 2));
}

#[test]
fn cell_rects_are_row_major() {
    let g = GridSpec::for_count(5, 2, PixelSize::new(10, 20), 1);
    assert_eq!(g.cell_origin(0), Some((0, 0)));
    assert_eq!(g.cell_origin(1), Some((11, 0)));
    assert_eq!(g.cell_origin(2), Some((0, 21)));
    assert_eq!(g.cell_rect(3), Some(Rect::new(11.0, 21.0, 21.0, 41.0)));
}

#[test]
fn huge_gap_overflows_instead_of_wrapping() {
    let g = GridSpec::for_count(4, 2, PixelSize::new(10, 10), u32::MAX - 5);
    assert_eq!(g.checked_sheet_size(), None);
    assert_eq!(g.sheet_size(), PixelSize::new(u32::MAX, u32::MAX));
    assert_eq!(g.cell_origin(0), Some((0, 0)));
    assert_eq!(g.cell_origin(1), None);
    assert!(g.cell_rect(3).is_none());
    assert!(g.check_encodable().unwrap_err().to_string().contains("overflows"));
}

#[test]
fn encodable_limit_is_per_side() {
    let edge = GridSpec::for_count(1, 1, PixelSize::new(MAX_ENCODED_DIM, 10), 0);
    assert_eq!(edge.check_encodable().unwrap(), PixelSize::new(MAX_ENCODED_DIM, 10));

    let tall = GridSpec::for_count(3300, 1, PixelSize::new(10, 20), 0);
    assert_eq!(tall.sheet_size(), PixelSize::new(10, 66_000));
    let err = tall.check_encodable().unwrap_err().to_string();
    assert!(err.contains("10x66000"), "{err}");
}
