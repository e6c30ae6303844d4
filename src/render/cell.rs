use vello_cpu::kurbo::{Affine, BezPath, Cap, Circle, Join, Shape as _, Stroke};

use crate::assets::acquire::Acquired;
use crate::assets::decode::DecodedImage;
use crate::foundation::core::{Rect, Rgba8, rect_to_cpu};
use crate::foundation::error::GridsheetResult;
use crate::render::surface::{rect_path, with_clip};

const PLACEHOLDER_FILL: Rgba8 = Rgba8::opaque(0xe5, 0xe7, 0xeb);
const PLACEHOLDER_GLYPH: Rgba8 = Rgba8::opaque(0x9c, 0xa3, 0xaf);

/// Destination rectangle that covers `cell` with an image of natural size `img_w x img_h`.
///
/// The image is scaled to the cell height when it is relatively wider than the cell, otherwise to
/// the cell width, and centered on the other axis. The result may extend past `cell`; callers clip.
pub fn cover_fit(img_w: u32, img_h: u32, cell: Rect) -> Rect {
    let (cw, ch) = (cell.width(), cell.height());
    if img_w == 0 || img_h == 0 || cw <= 0.0 || ch <= 0.0 {
        return cell;
    }
    let i_ratio = f64::from(img_w) / f64::from(img_h);
    let c_ratio = cw / ch;
    if i_ratio > c_ratio {
        let w = ch * i_ratio;
        let x0 = cell.x0 + (cw - w) / 2.0;
        Rect::new(x0, cell.y0, x0 + w, cell.y1)
    } else {
        let h = cw / i_ratio;
        let y0 = cell.y0 + (ch - h) / 2.0;
        Rect::new(cell.x0, y0, cell.x1, y0 + h)
    }
}

/// Draw one cell: the cover-fitted image, or the placeholder tile when it is broken.
pub(crate) fn draw_cell(ctx: &mut vello_cpu::RenderContext, rect: Rect, acquired: &Acquired) {
    let Some(img) = acquired.image() else {
        draw_placeholder(ctx, rect);
        return;
    };
    if let Err(e) = draw_cover(ctx, rect, img) {
        tracing::warn!(error = %e, "cell image could not be painted, using placeholder");
        draw_placeholder(ctx, rect);
    }
}

fn draw_cover(
    ctx: &mut vello_cpu::RenderContext,
    rect: Rect,
    img: &DecodedImage,
) -> GridsheetResult<()> {
    let paint = img.to_paint()?;
    let dest = cover_fit(img.width, img.height, rect);
    let (iw, ih) = (f64::from(img.width), f64::from(img.height));
    with_clip(ctx, rect, |ctx| {
        ctx.set_transform(
            Affine::translate((dest.x0, dest.y0))
                * Affine::scale_non_uniform(dest.width() / iw, dest.height() / ih),
        );
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
    });
    Ok(())
}

/// Flat tile with a vector "missing picture" glyph.
pub(crate) fn draw_placeholder(ctx: &mut vello_cpu::RenderContext, rect: Rect) {
    with_clip(ctx, rect, |ctx| {
        ctx.set_paint(PLACEHOLDER_FILL.to_cpu());
        ctx.fill_rect(&rect_to_cpu(rect));

        let s = rect.width().min(rect.height()) * 0.3;
        if s < 4.0 {
            return;
        }
        let c = rect.center();
        let frame = Rect::new(c.x - s / 2.0, c.y - s * 0.4, c.x + s / 2.0, c.y + s * 0.4);

        let mut stroke = Stroke::new(s / 12.0);
        stroke.join = Join::Round;
        stroke.start_cap = Cap::Round;
        stroke.end_cap = Cap::Round;
        ctx.set_stroke(stroke);
        ctx.set_paint(PLACEHOLDER_GLYPH.to_cpu());
        ctx.stroke_path(&rect_path(frame));

        let mut hills = BezPath::new();
        hills.move_to((frame.x0 + s * 0.1, frame.y1 - s * 0.1));
        hills.line_to((frame.x0 + s * 0.38, frame.y0 + s * 0.38));
        hills.line_to((frame.x0 + s * 0.58, frame.y1 - s * 0.28));
        hills.line_to((frame.x0 + s * 0.7, frame.y1 - s * 0.4));
        hills.line_to((frame.x1 - s * 0.1, frame.y1 - s * 0.1));
        hills.close_path();
        ctx.fill_path(&hills);

        let sun = Circle::new((frame.x1 - s * 0.25, frame.y0 + s * 0.22), s * 0.08);
        ctx.fill_path(&sun.to_path(0.1));
    });
}

#[cfg(test)]
#[path = "../../tests/unit/render/cell.rs"]
mod tests;
