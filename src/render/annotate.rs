use vello_cpu::kurbo::{Affine, BezPath, Cap, Join, Stroke};

use crate::assets::decode::DecodedImage;
use crate::assets::text::{LabelFont, LabelLayout};
use crate::config::model::{
    LabelAnchor, LineStyle, NumberingStyle, RedactionConfig, RedactionMode, StickerConfig,
};
use crate::foundation::core::{PixelSize, Point, Rect, Rgba8, point_to_cpu};
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::blur::{blur_rgba8_premul, radius_for_sigma};
use crate::render::surface::{CellTile, tile_dims, with_clip};

/// Inset of corner and edge anchors from the cell border, in pixels.
pub const LABEL_MARGIN: f64 = 20.0;

/// Horizontal alignment of a label around its anchor x.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
    /// Anchor x is the left edge.
    Left,
    /// Anchor x is the center.
    Center,
    /// Anchor x is the right edge.
    Right,
}

impl TextAlign {
    fn offset(self, width: f64) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => width / 2.0,
            Self::Right => width,
        }
    }
}

/// Anchor x, baseline y and alignment of a number label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    /// Anchor x.
    pub x: f64,
    /// Baseline y.
    pub baseline: f64,
    /// Alignment around `x`.
    pub align: TextAlign,
}

/// Place a label of `font_size` inside `rect` for `anchor`.
pub fn label_placement(anchor: LabelAnchor, rect: Rect, font_size: f64) -> LabelPlacement {
    let m = LABEL_MARGIN;
    let (x, y, w, h) = (rect.x0, rect.y0, rect.width(), rect.height());
    let (px, baseline, align) = match anchor {
        LabelAnchor::BottomCenter => (x + w / 2.0, y + h - m, TextAlign::Center),
        LabelAnchor::BottomLeft => (x + m, y + h - m, TextAlign::Left),
        LabelAnchor::BottomRight => (x + w - m, y + h - m, TextAlign::Right),
        LabelAnchor::Center => (x + w / 2.0, y + h / 2.0 + font_size / 3.0, TextAlign::Center),
        LabelAnchor::TopLeft => (x + m, y + m + font_size, TextAlign::Left),
        LabelAnchor::TopRight => (x + w - m, y + m + font_size, TextAlign::Right),
    };
    LabelPlacement {
        x: px,
        baseline,
        align,
    }
}

/// Drawn width of a line mark: the configured factor scaled by `cell_width / 100`.
pub fn mark_line_width(line_width: f64, cell_width: f64) -> f64 {
    line_width * (cell_width / 500.0) * 5.0
}

/// Segments of a line mark inside `rect`.
pub fn mark_segments(style: LineStyle, rect: Rect) -> Vec<(Point, Point)> {
    let at = |fx: f64, fy: f64| Point::new(rect.x0 + rect.width() * fx, rect.y0 + rect.height() * fy);
    match style {
        LineStyle::Cross => vec![(at(0.2, 0.2), at(0.8, 0.8)), (at(0.8, 0.2), at(0.2, 0.8))],
        LineStyle::Slash => vec![(at(0.2, 0.8), at(0.8, 0.2))],
    }
}

/// Sticker destination: centered on the configured point, `size_pct` of the cell width wide, and
/// as tall as the sticker's aspect ratio requires.
pub fn sticker_rect(rect: Rect, sticker: PixelSize, cfg: &StickerConfig) -> Rect {
    let cx = rect.x0 + rect.width() * cfg.x_pct / 100.0;
    let cy = rect.y0 + rect.height() * cfg.y_pct / 100.0;
    let w = rect.width() * cfg.size_pct / 100.0;
    let h = if sticker.width == 0 {
        0.0
    } else {
        w * f64::from(sticker.height) / f64::from(sticker.width)
    };
    Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
}

struct StickerPaint {
    paint: vello_cpu::Image,
    size: PixelSize,
}

/// Draws sequence numbers and redaction marks on cells.
pub(crate) struct Annotator {
    font: Option<LabelFont>,
    sticker: Option<StickerPaint>,
    shadow_tile: CellTile,
}

impl Annotator {
    pub(crate) fn new(font: Option<LabelFont>, sticker: Option<&DecodedImage>) -> Self {
        let sticker = sticker.and_then(|img| match img.to_paint() {
            Ok(paint) => Some(StickerPaint {
                paint,
                size: img.size(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "sticker could not be prepared, using line marks");
                None
            }
        });
        Self {
            font,
            sticker,
            shadow_tile: CellTile::new(),
        }
    }

    pub(crate) fn has_sticker(&self) -> bool {
        self.sticker.is_some()
    }

    pub(crate) fn release(&mut self) {
        self.shadow_tile.release();
    }

    /// Draw `number` (when given) and, when `redact` is set, the redaction mark.
    ///
    /// Never fails: a label that cannot be shaped is skipped, a shadow that cannot be rasterized
    /// is dropped, and both are logged.
    pub(crate) fn annotate(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        rect: Rect,
        number: Option<u32>,
        numbering: &NumberingStyle,
        redact: bool,
        redaction: &RedactionConfig,
    ) {
        if let Some(n) = number {
            self.draw_number(ctx, rect, n, numbering);
        }
        if redact {
            self.draw_redaction(ctx, rect, redaction);
        }
    }

    fn draw_number(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        rect: Rect,
        number: u32,
        style: &NumberingStyle,
    ) {
        let Some(font) = self.font.as_mut() else {
            return;
        };
        let layout = match font.layout(&number.to_string(), style.size, style.weight) {
            Ok(layout) => layout,
            Err(e) => {
                tracing::warn!(number, error = %e, "number label skipped");
                return;
            }
        };
        let place = label_placement(style.position, rect, f64::from(style.size));
        let left = place.x - place.align.offset(f64::from(layout.width));
        let top = place.baseline - f64::from(layout.baseline);

        let shadow = if style.shadow.enabled {
            let blur = style.size / 10.0;
            match shadow_paint(
                &mut self.shadow_tile,
                &layout,
                font.font(),
                style.shadow.color.to_rgba8(),
                blur,
            ) {
                Ok(paint) => paint,
                Err(e) => {
                    tracing::warn!(number, error = %e, "label shadow skipped");
                    None
                }
            }
        } else {
            None
        };

        let font = font.font();
        with_clip(ctx, rect, |ctx| {
            let origin = Affine::translate((left, top));
            if style.stroke.enabled {
                let mut stroke = Stroke::new(f64::from(style.size) / 12.0);
                stroke.join = Join::Round;
                stroke.miter_limit = 2.0;
                ctx.set_stroke(stroke);
                ctx.set_transform(origin);
                ctx.set_paint(style.stroke.color.to_rgba8().to_cpu());
                ctx.glyph_run(font)
                    .font_size(layout.font_size)
                    .stroke_glyphs(layout.glyphs.iter().copied());
            }
            if let Some(s) = shadow {
                ctx.set_transform(Affine::translate((left - s.pad, top - s.pad)));
                ctx.set_paint(s.paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(s.size.width),
                    f64::from(s.size.height),
                ));
            }
            ctx.set_transform(origin);
            ctx.set_paint(style.color.to_rgba8().to_cpu());
            ctx.glyph_run(font)
                .font_size(layout.font_size)
                .fill_glyphs(layout.glyphs.iter().copied());
        });
    }

    fn draw_redaction(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        rect: Rect,
        cfg: &RedactionConfig,
    ) {
        if cfg.mode == RedactionMode::Sticker
            && let (Some(sticker), Some(sticker_cfg)) = (&self.sticker, &cfg.sticker)
        {
            let dest = sticker_rect(rect, sticker.size, sticker_cfg);
            let (sw, sh) = (f64::from(sticker.size.width), f64::from(sticker.size.height));
            with_clip(ctx, rect, |ctx| {
                ctx.set_transform(
                    Affine::translate((dest.x0, dest.y0))
                        * Affine::scale_non_uniform(dest.width() / sw, dest.height() / sh),
                );
                ctx.set_paint(sticker.paint.clone());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));
            });
            return;
        }
        draw_line_mark(ctx, rect, cfg);
    }
}

fn draw_line_mark(ctx: &mut vello_cpu::RenderContext, rect: Rect, cfg: &RedactionConfig) {
    let mut stroke = Stroke::new(mark_line_width(cfg.line_width, rect.width()));
    stroke.start_cap = Cap::Round;
    stroke.end_cap = Cap::Round;
    let color: Rgba8 = cfg.line_color.to_rgba8();
    with_clip(ctx, rect, |ctx| {
        ctx.set_stroke(stroke);
        ctx.set_paint(color.to_cpu());
        for (a, b) in mark_segments(cfg.line_style, rect) {
            let mut path = BezPath::new();
            path.move_to(point_to_cpu(a));
            path.line_to(point_to_cpu(b));
            ctx.stroke_path(&path);
        }
    });
}

struct ShadowPaint {
    paint: vello_cpu::Image,
    size: PixelSize,
    pad: f64,
}

/// Rasterize the label in the shadow color offscreen and gaussian-blur it.
///
/// Sigma is half the blur length, matching how canvas-style shadow blur is specified.
fn shadow_paint(
    tile: &mut CellTile,
    layout: &LabelLayout,
    font: &vello_cpu::peniko::FontData,
    color: Rgba8,
    blur: f32,
) -> GridsheetResult<Option<ShadowPaint>> {
    if layout.glyphs.is_empty() || color.a == 0 {
        return Ok(None);
    }
    let sigma = blur / 2.0;
    let radius = radius_for_sigma(sigma);
    let pad = radius + 1;
    let size = PixelSize::new(
        (layout.width.max(1.0).ceil() as u32).saturating_add(2 * pad),
        (layout.height.max(1.0).ceil() as u32).saturating_add(2 * pad),
    );
    tile_dims(size).map_err(|_| {
        GridsheetError::render(format!(
            "label shadow {}x{} is larger than a render tile",
            size.width, size.height
        ))
    })?;

    let pm = tile.render(size, |ctx| {
        ctx.set_transform(Affine::translate((f64::from(pad), f64::from(pad))));
        ctx.set_paint(color.to_cpu());
        ctx.glyph_run(font)
            .font_size(layout.font_size)
            .fill_glyphs(layout.glyphs.iter().copied());
        Ok(())
    })?;
    let blurred = if radius == 0 {
        pm.data_as_u8_slice().to_vec()
    } else {
        blur_rgba8_premul(pm.data_as_u8_slice(), size.width, size.height, radius, sigma)?
    };
    let img = DecodedImage {
        width: size.width,
        height: size.height,
        rgba8_premul: blurred,
    };
    Ok(Some(ShadowPaint {
        paint: img.to_paint()?,
        size,
        pad: f64::from(pad),
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/render/annotate.rs"]
mod tests;
