use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::config::color::ColorDef;
use crate::config::mask::MaskIndexSet;
use crate::config::ratio::{MAX_SHEET_DIM, resolve_ratio};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::blend::BlendMode;

/// Read-only configuration snapshot for one render call.
///
/// The renderer only ever borrows it; nothing in the engine mutates a config mid-run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    /// `"custom"` or a decimal width/height ratio such as `"0.75"`.
    pub aspect_ratio: String,
    /// Custom cell width (custom ratio only). Defaults to 1000.
    pub custom_width: Option<u32>,
    /// Custom cell height (custom ratio only). Defaults to 1500.
    pub custom_height: Option<u32>,
    /// Base cell width for named ratios.
    pub cell_width: u32,
    /// Gap between cells in pixels.
    pub gap: u32,
    /// Sheet background, visible in gaps and behind placeholder tiles.
    pub background: ColorDef,
    /// Grid shape and numbering origin.
    pub grid: GridConfig,
    /// Sequence number style.
    pub numbering: NumberingStyle,
    /// Optional full-sheet watermark/texture.
    pub overlay: Option<OverlayConfig>,
    /// Encoder settings.
    pub export: ExportConfig,
    /// Redaction settings.
    pub redaction: RedactionConfig,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "custom".to_string(),
            custom_width: None,
            custom_height: None,
            cell_width: 1000,
            gap: 0,
            background: ColorDef::from_rgba8(Rgba8::WHITE),
            grid: GridConfig::default(),
            numbering: NumberingStyle::default(),
            overlay: None,
            export: ExportConfig::default(),
            redaction: RedactionConfig::default(),
        }
    }
}

impl SheetConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(s: &str) -> GridsheetResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| GridsheetError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: &Path) -> GridsheetResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parsed redaction targets.
    pub fn mask(&self) -> MaskIndexSet {
        MaskIndexSet::parse(&self.redaction.targets)
    }

    /// Check every pre-condition the renderer relies on.
    pub fn validate(&self) -> GridsheetResult<()> {
        resolve_ratio(self)?;

        let g = &self.grid;
        if g.cols == 0 || g.rows_per_sheet == 0 {
            return Err(GridsheetError::validation(
                "grid cols and rows_per_sheet must be >= 1",
            ));
        }
        if g.cols > MAX_SHEET_DIM {
            return Err(GridsheetError::validation(format!(
                "grid cols must be <= {MAX_SHEET_DIM}"
            )));
        }
        if self.aspect_ratio.trim() != "custom" && self.cell_width == 0 {
            return Err(GridsheetError::validation("cell_width must be >= 1"));
        }

        if !(1..=100).contains(&self.export.quality) {
            return Err(GridsheetError::validation(
                "export quality must be within 1..=100",
            ));
        }

        let n = &self.numbering;
        if n.enabled && (!n.size.is_finite() || n.size <= 0.0) {
            return Err(GridsheetError::validation(
                "numbering size must be finite and > 0",
            ));
        }

        if let Some(o) = &self.overlay
            && (!o.opacity.is_finite() || !(0.0..=1.0).contains(&o.opacity))
        {
            return Err(GridsheetError::validation(
                "overlay opacity must be within 0..=1",
            ));
        }

        let r = &self.redaction;
        if !r.line_width.is_finite() || r.line_width < 0.0 {
            return Err(GridsheetError::validation(
                "redaction line_width must be finite and >= 0",
            ));
        }
        if let Some(s) = &r.sticker {
            for (name, v) in [("size_pct", s.size_pct), ("x_pct", s.x_pct), ("y_pct", s.y_pct)] {
                if !v.is_finite() {
                    return Err(GridsheetError::validation(format!(
                        "sticker {name} must be finite"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Grid shape and numbering origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Columns per sheet.
    pub cols: u32,
    /// Maximum rows per sheet; a batch holds `cols * rows_per_sheet` images.
    pub rows_per_sheet: u32,
    /// Number shown on the first cell of the run.
    pub start_number: u32,
    /// How images are spread over the sheets.
    pub chunking: Chunking,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 3,
            rows_per_sheet: 3,
            start_number: 1,
            chunking: Chunking::Fixed,
        }
    }
}

/// Distribution of images over sheets. Both policies produce `ceil(n / (rows * cols))` sheets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chunking {
    /// Full sheets of `rows * cols`; only the last sheet may hold fewer images.
    #[default]
    Fixed,
    /// Sheet sizes differ by at most one, with the larger sheets last.
    Balanced,
}

/// Where the sequence number sits inside its cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelAnchor {
    /// Centered horizontally, near the bottom edge.
    #[default]
    BottomCenter,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
    /// Cell center.
    Center,
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
}

/// Sequence number style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumberingStyle {
    /// Draw numbers at all.
    pub enabled: bool,
    /// Font size in pixels.
    pub size: f32,
    /// CSS-style font weight (100..=900).
    pub weight: u16,
    /// Fill color.
    pub color: ColorDef,
    /// CSS-style family list, matched against installed fonts when `font_source` is unset.
    pub font_family: String,
    /// TTF/OTF file that supplies glyphs instead of a system font.
    pub font_source: Option<String>,
    /// Anchor position.
    pub position: LabelAnchor,
    /// Outline pass.
    pub stroke: StrokeStyle,
    /// Soft shadow under the fill pass.
    pub shadow: ShadowStyle,
}

impl Default for NumberingStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 48.0,
            weight: 700,
            color: ColorDef::from_rgba8(Rgba8::WHITE),
            font_family: "sans-serif".to_string(),
            font_source: None,
            position: LabelAnchor::BottomCenter,
            stroke: StrokeStyle::default(),
            shadow: ShadowStyle::default(),
        }
    }
}

/// Number outline settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrokeStyle {
    /// Draw the outline pass.
    pub enabled: bool,
    /// Outline color.
    pub color: ColorDef,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            color: ColorDef::from_rgba8(Rgba8::BLACK),
        }
    }
}

/// Number shadow settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowStyle {
    /// Draw the shadow.
    pub enabled: bool,
    /// Shadow color.
    pub color: ColorDef,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            color: ColorDef::from_rgba8(Rgba8::new(0, 0, 0, 204)),
        }
    }
}

/// Full-sheet watermark/texture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayConfig {
    /// Image locator (raster or `.svg`).
    pub source: String,
    /// Blend mode used for the single overlay draw.
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Overlay opacity in `0..=1`.
    #[serde(default = "default_overlay_opacity")]
    pub opacity: f32,
}

fn default_overlay_opacity() -> f32 {
    0.3
}

/// Encoder settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// 1..=100; 100 selects the lossless format.
    pub quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { quality: 92 }
    }
}

/// How a targeted cell is marked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedactionMode {
    /// Geometric line mark.
    #[default]
    Line,
    /// Sticker image; falls back to the line mark when no sticker is loaded.
    Sticker,
}

/// Line mark geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    /// Both diagonals.
    #[default]
    Cross,
    /// A single `/` diagonal.
    Slash,
}

/// Redaction settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedactionConfig {
    /// Whether normal-mode renders draw redaction marks.
    pub enabled: bool,
    /// Mark kind.
    pub mode: RedactionMode,
    /// Mask expression selecting global numbers (see [`MaskIndexSet`]).
    pub targets: String,
    /// Line geometry.
    pub line_style: LineStyle,
    /// Line color.
    pub line_color: ColorDef,
    /// Line width factor; the drawn width scales with the cell width.
    pub line_width: f64,
    /// Optional sticker.
    pub sticker: Option<StickerConfig>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RedactionMode::Line,
            targets: String::new(),
            line_style: LineStyle::Cross,
            line_color: ColorDef::from_rgba8(Rgba8::opaque(255, 0, 0)),
            line_width: 2.0,
            sticker: None,
        }
    }
}

/// Sticker placement, with percentages of the cell in `0..=100`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StickerConfig {
    /// Image locator (raster or `.svg`).
    pub source: String,
    /// Sticker width as a percentage of the cell width.
    #[serde(default = "default_sticker_size")]
    pub size_pct: f64,
    /// Horizontal center as a percentage of the cell width.
    #[serde(default = "default_sticker_center")]
    pub x_pct: f64,
    /// Vertical center as a percentage of the cell height.
    #[serde(default = "default_sticker_center")]
    pub y_pct: f64,
}

fn default_sticker_size() -> f64 {
    50.0
}

fn default_sticker_center() -> f64 {
    50.0
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
