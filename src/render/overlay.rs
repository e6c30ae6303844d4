use image::imageops::{self, FilterType};

use crate::assets::decode::DecodedImage;
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::blend::{BlendMode, composite_rgba8_premul};
use crate::render::surface::Sheet;

/// Stretches one overlay image over a whole sheet and composites it with a blend mode.
pub(crate) struct OverlayCompositor {
    source: image::RgbaImage,
    blend: BlendMode,
    opacity: f32,
}

impl OverlayCompositor {
    pub(crate) fn new(image: DecodedImage, blend: BlendMode, opacity: f32) -> GridsheetResult<Self> {
        image.ensure_complete()?;
        // Filtering premultiplied channels keeps edges free of dark fringes.
        let source = image::RgbaImage::from_raw(image.width, image.height, image.rgba8_premul)
            .ok_or_else(|| GridsheetError::render("overlay buffer does not match its size"))?;
        Ok(Self {
            source,
            blend,
            opacity: opacity.clamp(0.0, 1.0),
        })
    }

    /// Composite over the full sheet.
    ///
    /// The stretched copy is as large as the sheet and is dropped before returning, so only the
    /// source image outlives a sheet.
    pub(crate) fn apply(&self, sheet: &mut Sheet) -> GridsheetResult<()> {
        if self.opacity <= 0.0 {
            return Ok(());
        }
        let size = sheet.size();
        if size.is_empty() {
            return Err(GridsheetError::render("overlay applied to an empty sheet"));
        }
        tracing::debug!(width = size.width, height = size.height, "scaling overlay");
        let scaled =
            imageops::resize(&self.source, size.width, size.height, FilterType::Triangle).into_raw();
        composite_rgba8_premul(sheet.data_mut(), &scaled, self.opacity, self.blend)
    }

    /// Pixel bytes held between sheets.
    #[cfg(test)]
    pub(crate) fn retained_bytes(&self) -> usize {
        self.source.as_raw().len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
