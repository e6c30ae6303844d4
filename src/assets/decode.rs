use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{GridsheetError, GridsheetResult};

const MAX_SVG_DIM: u32 = 16_384;

/// Decoded raster in premultiplied RGBA8.
///
/// Owned so a cell can drop its pixels as soon as they have been drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Tightly packed premultiplied RGBA8 pixels.
    pub rgba8_premul: Vec<u8>,
}

impl DecodedImage {
    /// Natural size.
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Reject images that report a zero dimension or a truncated pixel buffer.
    pub fn ensure_complete(&self) -> GridsheetResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GridsheetError::validation(format!(
                "image has zero natural size {}x{}",
                self.width, self.height
            )));
        }
        if self.rgba8_premul.len() != self.size().rgba_len() {
            return Err(GridsheetError::validation("image pixel buffer is incomplete"));
        }
        Ok(())
    }

    /// Wrap as a `vello_cpu` image paint of the natural size.
    pub(crate) fn to_paint(&self) -> GridsheetResult<vello_cpu::Image> {
        let pixmap = pixmap_from_premul_bytes(&self.rgba8_premul, self.width, self.height)?;
        Ok(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        })
    }
}

/// Decode hints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOpts {
    /// Rasterize vector sources so their longer side is at least this many pixels.
    pub svg_long_side: Option<u32>,
}

/// Decode raster or SVG bytes; `locator` only serves to recognise `.svg` sources.
pub fn decode_any(locator: &str, bytes: &[u8], opts: DecodeOpts) -> GridsheetResult<DecodedImage> {
    if looks_like_svg(locator, bytes) {
        decode_svg(bytes, opts.svg_long_side)
    } else {
        decode_image(bytes)
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> GridsheetResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul,
    })
}

/// Parse and rasterize SVG bytes.
///
/// The raster keeps the document's aspect ratio and is scaled up so the longer side reaches
/// `long_side` when given.
pub fn decode_svg(bytes: &[u8], long_side: Option<u32>) -> GridsheetResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    let (width, height) = svg_raster_size(&tree, long_side)?;
    let rgba8_premul = rasterize_svg_to_premul_rgba8(&tree, width, height)?;
    Ok(DecodedImage {
        width,
        height,
        rgba8_premul,
    })
}

fn looks_like_svg(locator: &str, bytes: &[u8]) -> bool {
    let lower = locator.to_ascii_lowercase();
    if lower.ends_with(".svg") || lower.starts_with("data:image/svg") {
        return true;
    }
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

fn svg_raster_size(tree: &usvg::Tree, long_side: Option<u32>) -> GridsheetResult<(u32, u32)> {
    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(GridsheetError::validation("svg has invalid width/height"));
    }

    let longest = w.max(h);
    let scale = match long_side {
        Some(target) if (target as f32) > longest => target as f32 / longest,
        _ => 1.0,
    };
    let pw = ((w * scale).ceil() as u32).max(1);
    let ph = ((h * scale).ceil() as u32).max(1);
    if pw > MAX_SVG_DIM || ph > MAX_SVG_DIM {
        return Err(GridsheetError::validation(format!(
            "svg raster size too large: {pw}x{ph} (max {MAX_SVG_DIM}x{MAX_SVG_DIM})"
        )));
    }
    Ok((pw, ph))
}

fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> GridsheetResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| GridsheetError::render("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    // tiny-skia pixmaps are already premultiplied RGBA8.
    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.take())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> GridsheetResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| GridsheetError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| GridsheetError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(GridsheetError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
