use std::io::Cursor;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::surface::Sheet;

/// Quality at which the lossless format is selected.
pub const LOSSLESS_QUALITY: u8 = 100;

/// Encoded image format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG.
    Jpeg,
}

impl ArtifactFormat {
    /// Format chosen for `quality`: PNG at 100, JPEG below.
    pub fn for_quality(quality: u8) -> Self {
        if quality >= LOSSLESS_QUALITY {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Encoded bytes of one sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedSheet {
    /// Container format of `bytes`.
    pub format: ArtifactFormat,
    /// Encoded image.
    pub bytes: Vec<u8>,
}

/// Turns a finished sheet into encoded bytes.
pub trait SheetEncoder {
    /// Encode `sheet` at `quality` (1..=100).
    fn encode(&mut self, sheet: &Sheet, quality: u8) -> GridsheetResult<EncodedSheet>;
}

/// PNG/JPEG encoder backed by the `image` crate.
///
/// JPEG has no alpha channel; translucent pixels are flattened over `matte`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageEncoder {
    /// Backdrop used when dropping alpha.
    pub matte: Rgba8,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self {
            matte: Rgba8::WHITE,
        }
    }
}

impl ImageEncoder {
    /// Encoder with a white matte.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SheetEncoder for ImageEncoder {
    fn encode(&mut self, sheet: &Sheet, quality: u8) -> GridsheetResult<EncodedSheet> {
        if !(1..=100).contains(&quality) {
            return Err(GridsheetError::validation(format!(
                "quality must be in 1..=100, got {quality}"
            )));
        }
        let size = sheet.size();
        if size.is_empty() {
            return Err(GridsheetError::render("cannot encode an empty sheet"));
        }

        let format = ArtifactFormat::for_quality(quality);
        let mut buffer = Vec::new();
        match format {
            ArtifactFormat::Png => {
                let img = sheet.snapshot().to_rgba_image()?;
                img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                    .context("encode sheet as PNG")?;
            }
            ArtifactFormat::Jpeg => {
                let rgb = flatten_premul_to_rgb(sheet.data(), self.matte);
                let img = image::RgbImage::from_raw(size.width, size.height, rgb)
                    .ok_or_else(|| GridsheetError::render("sheet buffer does not match its size"))?;
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
                img.write_with_encoder(encoder)
                    .context("encode sheet as JPEG")?;
            }
        }
        Ok(EncodedSheet {
            format,
            bytes: buffer,
        })
    }
}

/// Composite premultiplied pixels over an opaque matte and drop alpha.
fn flatten_premul_to_rgb(premul: &[u8], matte: Rgba8) -> Vec<u8> {
    let mut out = Vec::with_capacity(premul.len() / 4 * 3);
    let m = [matte.r, matte.g, matte.b];
    for px in premul.chunks_exact(4) {
        let inv = 255 - u16::from(px[3]);
        for c in 0..3 {
            let v = u16::from(px[c]) + (u16::from(m[c]) * inv + 127) / 255;
            out.push(v.min(255) as u8);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
