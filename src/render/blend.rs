use serde::{Deserialize, Serialize};

use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};

/// Separable blend modes available for the sheet overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Plain source-over.
    #[default]
    Normal,
    /// `s * d`
    Multiply,
    /// `s + d - s*d`
    Screen,
    /// Hard light with layers swapped.
    Overlay,
    /// `min(s, d)`
    Darken,
    /// `max(s, d)`
    Lighten,
    /// Brightens the backdrop toward the source.
    ColorDodge,
    /// Darkens the backdrop toward the source.
    ColorBurn,
    /// W3C soft light.
    SoftLight,
    /// Multiply or screen depending on the source.
    HardLight,
    /// `|d - s|`
    Difference,
    /// `d + s - 2*d*s`
    Exclusion,
}

impl BlendMode {
    /// Every mode, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::SoftLight,
        Self::HardLight,
        Self::Difference,
        Self::Exclusion,
    ];
}

/// Composite premultiplied `src` over premultiplied `dst` with `opacity` and `blend`.
///
/// Both buffers are tightly packed RGBA8 of equal length.
pub(crate) fn composite_rgba8_premul(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
    blend: BlendMode,
) -> GridsheetResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(GridsheetError::render(
            "composite expects equal-length rgba8 buffers",
        ));
    }

    // Dispatch once per call; each arm monomorphizes its own kernel.
    match blend {
        BlendMode::Normal => {
            over_in_place_opacity(dst, src, opacity);
            Ok(())
        }
        BlendMode::Multiply => blend_kernel(dst, src, opacity, |s, d| s * d),
        BlendMode::Screen => blend_kernel(dst, src, opacity, |s, d| s + d - s * d),
        BlendMode::Overlay => blend_kernel(dst, src, opacity, |s, d| hard_light(d, s)),
        BlendMode::Darken => blend_kernel(dst, src, opacity, f32::min),
        BlendMode::Lighten => blend_kernel(dst, src, opacity, f32::max),
        BlendMode::ColorDodge => blend_kernel(dst, src, opacity, |s, d| {
            if d <= 0.0 {
                0.0
            } else if s >= 1.0 {
                1.0
            } else {
                (d / (1.0 - s)).min(1.0)
            }
        }),
        BlendMode::ColorBurn => blend_kernel(dst, src, opacity, |s, d| {
            if d >= 1.0 {
                1.0
            } else if s <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - d) / s).min(1.0)
            }
        }),
        BlendMode::SoftLight => blend_kernel(dst, src, opacity, soft_light),
        BlendMode::HardLight => blend_kernel(dst, src, opacity, hard_light),
        BlendMode::Difference => blend_kernel(dst, src, opacity, |s, d| (d - s).abs()),
        BlendMode::Exclusion => blend_kernel(dst, src, opacity, |s, d| d + s - 2.0 * d * s),
    }
}

fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        2.0 * s * d
    } else {
        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
    }
}

fn soft_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        d - (1.0 - 2.0 * s) * d * (1.0 - d)
    } else {
        let g = if d <= 0.25 {
            ((16.0 * d - 12.0) * d + 4.0) * d
        } else {
            d.sqrt()
        };
        d + (2.0 * s - 1.0) * (g - d)
    }
}

fn over_in_place_opacity(dst: &mut [u8], src: &[u8], opacity: f32) {
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if op == 0 {
        return;
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = mul_div255_u8(u16::from(s[3]), op);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - u16::from(sa);
        d[3] = add_sat_u8(sa, mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let sc = mul_div255_u8(u16::from(s[c]), op);
            d[c] = add_sat_u8(sc, mul_div255_u8(u16::from(d[c]), inv));
        }
    }
}

#[inline(always)]
fn blend_kernel<F>(dst: &mut [u8], src: &[u8], opacity: f32, blend_fn: F) -> GridsheetResult<()>
where
    F: Fn(f32, f32) -> f32,
{
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return Ok(());
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        // Source-over with the blend applied to unpremultiplied channels:
        // out_a = sa + da*(1-sa)
        // out_p = sp*(1-da) + dp*(1-sa) + B(sc, dc)*sa*da
        let sa = (f32::from(s[3]) / 255.0) * opacity;
        if sa <= 0.0 {
            continue;
        }
        let da = f32::from(d[3]) / 255.0;

        for c in 0..3 {
            let sp = (f32::from(s[c]) / 255.0) * opacity;
            let dp = f32::from(d[c]) / 255.0;
            let sc = (sp / sa).clamp(0.0, 1.0);
            let dc = if da > 0.0 { (dp / da).clamp(0.0, 1.0) } else { 0.0 };
            let b = blend_fn(sc, dc).clamp(0.0, 1.0);
            let out = (sp * (1.0 - da) + dp * (1.0 - sa) + b * sa * da).clamp(0.0, 1.0);
            d[c] = to_u8(out);
        }
        d[3] = to_u8((sa + da * (1.0 - sa)).clamp(0.0, 1.0));
    }

    Ok(())
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
