use super::*;
use crate::assets::source::MemoryImageSource;
use crate::config::model::OverlayConfig;
use crate::render::blend::BlendMode;
use crate::session::pacing::{NeverCancel, NoPacer};
use std::cell::Cell;

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn quiet_config() -> SheetConfig {
    let mut cfg = SheetConfig::default();
    cfg.numbering.enabled = false;
    cfg
}

fn opts(cell: PixelSize) -> RendererOpts {
    RendererOpts {
        numbers: true,
        cell,
        sheet_width: cell.width * 2,
    }
}

fn grid(count: usize, cols: u32, cell: PixelSize, gap: u32) -> GridSpec {
    GridSpec::for_count(count, cols, cell, gap)
}

#[test]
fn draws_cells_in_row_major_order_with_placeholder() {
    let cfg = quiet_config();
    let src = MemoryImageSource::new()
        .with("red.png", png(4, 4, [255, 0, 0, 255]))
        .with("blue.png", png(4, 4, [0, 0, 255, 255]));
    let images = ImageRef::list(["red.png", "missing.png", "blue.png"]);
    let cell = PixelSize::new(10, 10);
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: grid(3, 2, cell, 2),
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    let out = r.render_grid(&mut sheet, &req, &NeverCancel).unwrap();
    assert_eq!(out, GridOutcome::Completed { cells: 3, broken: 1 });

    assert_eq!(sheet.size(), PixelSize::new(22, 22));
    assert_eq!(sheet.pixel(5, 5), Some([255, 0, 0, 255]));
    assert_eq!(sheet.pixel(13, 0), Some([0xe5, 0xe7, 0xeb, 255]));
    assert_eq!(sheet.pixel(5, 17), Some([0, 0, 255, 255]));
    // gap and empty trailing cell keep the background
    assert_eq!(sheet.pixel(11, 5), Some([255, 255, 255, 255]));
    assert_eq!(sheet.pixel(17, 17), Some([255, 255, 255, 255]));
}

#[test]
fn numbers_are_offset_into_the_full_list() {
    let mask = MaskIndexSet::new();
    let images = ImageRef::list(["a"]);
    let req = GridRequest {
        images: &images,
        grid: grid(1, 1, PixelSize::new(1, 1), 0),
        index_offset: 9,
        start_number: 5,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    assert_eq!(req.number_for(0), 14);
    assert_eq!(req.number_for(2), 16);
}

#[test]
fn targeted_cells_get_marks_only_when_active() {
    let mut cfg = quiet_config();
    cfg.redaction.targets = "2".into();
    cfg.redaction.line_width = 20.0;
    let src = MemoryImageSource::new().with("w.png", png(2, 2, [255, 255, 255, 255]));
    let images = ImageRef::list(["w.png", "w.png"]);
    let cell = PixelSize::new(50, 50);
    let mask = cfg.mask();
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();

    for active in [false, true] {
        let req = GridRequest {
            images: &images,
            grid: grid(2, 2, cell, 0),
            index_offset: 0,
            start_number: 1,
            mask: &mask,
            redaction_active: active,
            hide_numbers: false,
        };
        let mut sheet = Sheet::new();
        r.render_grid(&mut sheet, &req, &NeverCancel).unwrap();
        assert_eq!(sheet.pixel(25, 25), Some([255, 255, 255, 255]));
        let center_of_second = sheet.pixel(75, 25);
        if active {
            assert_eq!(center_of_second, Some([255, 0, 0, 255]));
        } else {
            assert_eq!(center_of_second, Some([255, 255, 255, 255]));
        }
    }
}

#[test]
fn cancellation_between_cells_stops_early() {
    let cfg = quiet_config();
    let src = MemoryImageSource::new().with("a.png", png(2, 2, [0, 0, 0, 255]));
    let images = ImageRef::list(["a.png"; 4]);
    let cell = PixelSize::new(4, 4);
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    let polls = Cell::new(0u32);
    // two polls per cell; cancel after the second cell's load
    let cancel = || {
        polls.set(polls.get() + 1);
        polls.get() >= 4
    };
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: grid(4, 2, cell, 0),
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    let out = r.render_grid(&mut sheet, &req, &cancel).unwrap();
    assert_eq!(out, GridOutcome::Cancelled { cells_drawn: 1 });
}

#[test]
fn numbering_font_falls_back_to_system_fonts() {
    let cfg = SheetConfig::default();
    assert!(cfg.numbering.font_source.is_none());
    let src = MemoryImageSource::new();
    let loaded = SheetRenderer::new(
        &cfg,
        &src,
        &NoPacer,
        RetryPolicy::NONE,
        opts(PixelSize::new(10, 10)),
    );
    if find_system_font(&cfg.numbering.font_family, cfg.numbering.weight).is_some() {
        assert!(loaded.is_ok());
    } else {
        assert!(loaded.err().unwrap().is_precondition());
    }
}

#[test]
fn unreadable_font_source_is_a_precondition_failure() {
    let src = MemoryImageSource::new();

    let mut cfg = SheetConfig::default();
    cfg.numbering.font_source = Some("fonts/missing.ttf".into());
    let err = SheetRenderer::new(
        &cfg,
        &src,
        &NoPacer,
        RetryPolicy::NONE,
        opts(PixelSize::new(10, 10)),
    )
    .err()
    .unwrap();
    assert!(err.is_precondition());

    let hidden = RendererOpts {
        numbers: false,
        ..opts(PixelSize::new(10, 10))
    };
    assert!(SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, hidden).is_ok());
}

#[test]
fn missing_overlay_is_skipped_and_loaded_overlay_applies() {
    let mut cfg = quiet_config();
    cfg.overlay = Some(OverlayConfig {
        source: "missing.png".into(),
        blend_mode: BlendMode::Multiply,
        opacity: 1.0,
    });
    let src = MemoryImageSource::new()
        .with("w.png", png(2, 2, [255, 255, 255, 255]))
        .with("half.png", png(1, 1, [128, 128, 128, 255]));
    let cell = PixelSize::new(6, 6);
    let r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    assert!(!r.has_overlay());

    cfg.overlay = Some(OverlayConfig {
        source: "half.png".into(),
        blend_mode: BlendMode::Multiply,
        opacity: 1.0,
    });
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    assert!(r.has_overlay());
    let images = ImageRef::list(["w.png"]);
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: grid(1, 1, cell, 0),
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    r.render_grid(&mut sheet, &req, &NeverCancel).unwrap();
    assert_eq!(sheet.pixel(3, 3), Some([128, 128, 128, 255]));
}

#[test]
fn too_many_images_for_grid_is_rejected() {
    let cfg = quiet_config();
    let src = MemoryImageSource::new();
    let cell = PixelSize::new(4, 4);
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    let images = ImageRef::list(["a", "b", "c"]);
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: GridSpec {
            rows: 1,
            cols: 2,
            cell_width: 4,
            cell_height: 4,
            gap: 0,
        },
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    assert!(r.render_grid(&mut sheet, &req, &NeverCancel).is_err());
}

#[test]
fn label_too_large_to_shadow_still_completes_the_sheet() {
    let mut cfg = SheetConfig::default();
    if find_system_font(&cfg.numbering.font_family, cfg.numbering.weight).is_none() {
        return;
    }
    cfg.numbering.size = 100_000.0;
    cfg.numbering.shadow.enabled = true;
    cfg.validate().unwrap();

    let src = MemoryImageSource::new().with("red.png", png(4, 4, [255, 0, 0, 255]));
    let images = ImageRef::list(["red.png"]);
    let cell = PixelSize::new(40, 40);
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: grid(1, 1, cell, 0),
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    let out = r.render_grid(&mut sheet, &req, &NeverCancel).unwrap();
    assert_eq!(out, GridOutcome::Completed { cells: 1, broken: 0 });
}

#[test]
fn unencodable_sheet_is_rejected_before_allocation() {
    let cfg = quiet_config();
    let src = MemoryImageSource::new();
    let images = ImageRef::list(["a.png", "b.png"]);
    let cell = PixelSize::new(10, 40_000);
    let mut r = SheetRenderer::new(&cfg, &src, &NoPacer, RetryPolicy::NONE, opts(cell)).unwrap();
    let mask = MaskIndexSet::new();
    let req = GridRequest {
        images: &images,
        grid: grid(2, 1, cell, 0),
        index_offset: 0,
        start_number: 1,
        mask: &mask,
        redaction_active: false,
        hide_numbers: false,
    };
    let mut sheet = Sheet::new();
    let err = r.render_grid(&mut sheet, &req, &NeverCancel).unwrap_err();
    assert!(err.is_precondition(), "{err}");
    assert!(sheet.is_released());
}
