use crate::config::model::SheetConfig;
use crate::foundation::core::{PixelSize, Rect};
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::foundation::math::ceil_div;

/// Largest sheet width the engine will lay out (`cols * cell_width <= MAX_SHEET_DIM`).
pub const MAX_SHEET_DIM: u32 = 8192;

/// Largest sheet side either encoder accepts (JPEG stores dimensions as `u16`).
pub const MAX_ENCODED_DIM: u32 = u16::MAX as u32;

const DEFAULT_CUSTOM_WIDTH: u32 = 1000;
const DEFAULT_CUSTOM_HEIGHT: u32 = 1500;

/// Width / height ratio of one cell.
///
/// Named ratios are decimal strings; `"custom"` divides the custom width by the custom height,
/// defaulting missing sides to 1000 and 1500.
pub fn resolve_ratio(cfg: &SheetConfig) -> GridsheetResult<f64> {
    let name = cfg.aspect_ratio.trim();
    let ratio = if name == "custom" {
        let w = cfg.custom_width.unwrap_or(DEFAULT_CUSTOM_WIDTH);
        let h = cfg.custom_height.unwrap_or(DEFAULT_CUSTOM_HEIGHT);
        if w == 0 || h == 0 {
            return Err(GridsheetError::validation(
                "custom width and height must be >= 1",
            ));
        }
        f64::from(w) / f64::from(h)
    } else {
        name.parse::<f64>().map_err(|_| {
            GridsheetError::validation(format!("aspect ratio '{name}' is not a decimal number"))
        })?
    };
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(GridsheetError::validation(
            "aspect ratio must be finite and > 0",
        ));
    }
    Ok(ratio)
}

/// Cell dimensions after applying the sheet width ceiling.
///
/// Only the width is capped; the height always follows from the capped width and the ratio.
pub fn cell_size(cfg: &SheetConfig) -> GridsheetResult<PixelSize> {
    let ratio = resolve_ratio(cfg)?;
    let cols = cfg.grid.cols.max(1);
    let base = if cfg.aspect_ratio.trim() == "custom" {
        cfg.custom_width.unwrap_or(DEFAULT_CUSTOM_WIDTH)
    } else {
        cfg.cell_width
    };
    let width = base.min(MAX_SHEET_DIM / cols).max(1);
    let height = ((f64::from(width) / ratio).round() as u32).max(1);
    Ok(PixelSize::new(width, height))
}

/// Geometry of one sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GridSpec {
    /// Rows on this sheet.
    pub rows: u32,
    /// Columns on this sheet.
    pub cols: u32,
    /// Cell width in pixels.
    pub cell_width: u32,
    /// Cell height in pixels.
    pub cell_height: u32,
    /// Gap between cells in pixels.
    pub gap: u32,
}

impl GridSpec {
    /// Grid for a sheet holding `count` images: `rows = ceil(count / cols)`.
    pub fn for_count(count: usize, cols: u32, cell: PixelSize, gap: u32) -> Self {
        let cols = cols.max(1);
        let rows = ceil_div(count, cols as usize).max(1) as u32;
        Self {
            rows,
            cols,
            cell_width: cell.width,
            cell_height: cell.height,
            gap,
        }
    }

    /// Sheet size: `cols*cellW + (cols-1)*gap` by `rows*cellH + (rows-1)*gap`.
    ///
    /// Saturates at `u32::MAX`; use [`GridSpec::checked_sheet_size`] before allocating.
    pub fn sheet_size(&self) -> PixelSize {
        self.checked_sheet_size()
            .unwrap_or(PixelSize::new(u32::MAX, u32::MAX))
    }

    /// Sheet size, or `None` when either side overflows `u32`.
    pub fn checked_sheet_size(&self) -> Option<PixelSize> {
        fn span(n: u32, cell: u32, gap: u32) -> Option<u32> {
            n.checked_mul(cell)?
                .checked_add(n.saturating_sub(1).checked_mul(gap)?)
        }
        Some(PixelSize::new(
            span(self.cols, self.cell_width, self.gap)?,
            span(self.rows, self.cell_height, self.gap)?,
        ))
    }

    /// Fail unless the sheet fits the encoders on both sides.
    pub fn check_encodable(&self) -> GridsheetResult<PixelSize> {
        match self.checked_sheet_size() {
            Some(size) if size.width <= MAX_ENCODED_DIM && size.height <= MAX_ENCODED_DIM => {
                Ok(size)
            }
            Some(size) => Err(GridsheetError::validation(format!(
                "sheet {}x{} exceeds the {MAX_ENCODED_DIM}px encoder limit; \
                 lower rows_per_sheet, cols or gap",
                size.width, size.height
            ))),
            None => Err(GridsheetError::validation(format!(
                "{}x{} grid of {}x{} cells with gap {} overflows the sheet size",
                self.cols, self.rows, self.cell_width, self.cell_height, self.gap
            ))),
        }
    }

    /// Cell size.
    pub fn cell(&self) -> PixelSize {
        PixelSize::new(self.cell_width, self.cell_height)
    }

    /// Top-left pixel of cell `index` in row-major order, or `None` if it overflows `u32`.
    pub fn cell_origin(&self, index: usize) -> Option<(u32, u32)> {
        let cols = self.cols.max(1) as usize;
        let col = u32::try_from(index % cols).ok()?;
        let row = u32::try_from(index / cols).ok()?;
        let x = col.checked_mul(self.cell_width.checked_add(self.gap)?)?;
        let y = row.checked_mul(self.cell_height.checked_add(self.gap)?)?;
        Some((x, y))
    }

    /// Sheet-space rectangle of cell `index`.
    pub fn cell_rect(&self, index: usize) -> Option<Rect> {
        let (x, y) = self.cell_origin(index)?;
        Some(Rect::new(
            f64::from(x),
            f64::from(y),
            f64::from(x) + f64::from(self.cell_width),
            f64::from(y) + f64::from(self.cell_height),
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/ratio.rs"]
mod tests;
