use crate::assets::decode::unpremultiply_rgba8_in_place;
use crate::foundation::core::{PixelSize, Rect, Rgba8, rect_to_cpu};
use crate::foundation::error::{GridsheetError, GridsheetResult};

/// Finished sheet pixels in premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed premultiplied RGBA8.
    pub data: Vec<u8>,
}

impl SheetImage {
    /// Pixel size.
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        pixel_at(&self.data, self.size(), x, y)
    }

    /// Straight-alpha copy for encoders and viewers.
    pub fn to_rgba_image(&self) -> GridsheetResult<image::RgbaImage> {
        let mut raw = self.data.clone();
        unpremultiply_rgba8_in_place(&mut raw);
        image::RgbaImage::from_raw(self.width, self.height, raw)
            .ok_or_else(|| GridsheetError::render("sheet buffer does not match its size"))
    }
}

/// The drawing surface for one sheet.
///
/// One `Sheet` is reused across a batch run; [`Sheet::release`] returns its memory after each
/// sheet has been encoded.
#[derive(Debug, Default)]
pub struct Sheet {
    size: PixelSize,
    data: Vec<u8>,
}

impl Sheet {
    /// An empty, released sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `size` and fill with `background`.
    pub fn prepare(&mut self, size: PixelSize, background: Rgba8) -> GridsheetResult<()> {
        if size.is_empty() {
            return Err(GridsheetError::validation(format!(
                "sheet size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }
        let len = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| GridsheetError::validation("sheet size overflows memory"))?;

        let px = background.premul();
        self.data.clear();
        self.data.reserve_exact(len);
        for _ in 0..len / 4 {
            self.data.extend_from_slice(&px);
        }
        self.size = size;
        Ok(())
    }

    /// Current size; zero after [`Sheet::release`].
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Drop the pixel buffer.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.size = PixelSize::new(0, 0);
    }

    /// Return `true` when no pixel memory is held.
    pub fn is_released(&self) -> bool {
        self.data.capacity() == 0
    }

    /// Premultiplied RGBA8 pixels.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        pixel_at(&self.data, self.size, x, y)
    }

    /// Copy of the current pixels.
    pub fn snapshot(&self) -> SheetImage {
        SheetImage {
            width: self.size.width,
            height: self.size.height,
            data: self.data.clone(),
        }
    }

    /// Copy an opaque-replace tile at `(x, y)`, clipped to the sheet.
    pub(crate) fn blit(&mut self, x: u32, y: u32, tile: &vello_cpu::Pixmap) {
        let tw = u32::from(tile.width());
        let th = u32::from(tile.height());
        let src = tile.data_as_u8_slice();
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let cw = tw.min(self.size.width - x) as usize;
        let ch = th.min(self.size.height - y);
        let sheet_w = self.size.width as usize;
        for row in 0..ch {
            let s = (row as usize) * (tw as usize) * 4;
            let d = ((y + row) as usize * sheet_w + x as usize) * 4;
            self.data[d..d + cw * 4].copy_from_slice(&src[s..s + cw * 4]);
        }
    }
}

fn pixel_at(data: &[u8], size: PixelSize, x: u32, y: u32) -> Option<[u8; 4]> {
    if x >= size.width || y >= size.height {
        return None;
    }
    let i = ((y as usize) * (size.width as usize) + x as usize) * 4;
    data.get(i..i + 4).and_then(|p| p.try_into().ok())
}

/// Reusable cell-sized render target.
///
/// Each cell is rasterized on its own so the decoded image it paints can be dropped before the
/// next cell loads.
#[derive(Default)]
pub(crate) struct CellTile {
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
}

impl CellTile {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `f` on a cleared context of `size` and rasterize the result.
    pub(crate) fn render<F>(&mut self, size: PixelSize, f: F) -> GridsheetResult<&vello_cpu::Pixmap>
    where
        F: FnOnce(&mut vello_cpu::RenderContext) -> GridsheetResult<()>,
    {
        let (w, h) = tile_dims(size)?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        f(&mut ctx)?;
        ctx.flush();

        let pixmap = match self.pixmap.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        let pixmap = self.pixmap.insert(pixmap);
        ctx.render_to_pixmap(pixmap);
        self.ctx = Some(ctx);
        Ok(pixmap)
    }

    pub(crate) fn release(&mut self) {
        self.ctx = None;
        self.pixmap = None;
    }
}

pub(crate) fn tile_dims(size: PixelSize) -> GridsheetResult<(u16, u16)> {
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| GridsheetError::validation(format!("cell width {} exceeds u16", size.width)))?;
    let h: u16 = size.height.try_into().map_err(|_| {
        GridsheetError::validation(format!("cell height {} exceeds u16", size.height))
    })?;
    if w == 0 || h == 0 {
        return Err(GridsheetError::validation("cell size must be non-zero"));
    }
    Ok((w, h))
}

/// Run `f` inside a clip to `rect`, then reset transforms and blend so no state leaks.
pub(crate) fn with_clip<R>(
    ctx: &mut vello_cpu::RenderContext,
    rect: Rect,
    f: impl FnOnce(&mut vello_cpu::RenderContext) -> R,
) -> R {
    reset_state(ctx);
    let clip = rect_path(rect);
    ctx.push_clip_layer(&clip);
    let out = f(ctx);
    ctx.pop_layer();
    reset_state(ctx);
    out
}

pub(crate) fn reset_state(ctx: &mut vello_cpu::RenderContext) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
}

pub(crate) fn rect_path(rect: Rect) -> vello_cpu::kurbo::BezPath {
    use vello_cpu::kurbo::Shape as _;
    rect_to_cpu(rect).to_path(0.1)
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
