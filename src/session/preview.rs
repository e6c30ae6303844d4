use crate::assets::acquire::RetryPolicy;
use crate::assets::source::{ImageRef, ImageSource};
use crate::config::model::SheetConfig;
use crate::config::ratio::cell_size;
use crate::foundation::core::PixelSize;
use crate::foundation::error::GridsheetResult;
use crate::render::grid::{GridOutcome, GridRequest, RendererOpts, SheetRenderer};
use crate::render::surface::{Sheet, SheetImage};
use crate::session::pacing::{CancelToken, NoPacer};
use crate::session::plan::{BatchMode, BatchPlan};

/// Options for [`render_preview`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewOpts {
    /// Redaction handling, as for a full run.
    pub mode: BatchMode,
    /// Upper bound on the preview cell width; the height keeps the configured ratio.
    pub max_cell_width: u32,
    /// Image acquisition retry policy.
    pub retry: RetryPolicy,
}

impl PreviewOpts {
    /// Default preview cell width ceiling.
    pub const DEFAULT_MAX_CELL_WIDTH: u32 = 240;
}

impl Default for PreviewOpts {
    fn default() -> Self {
        Self {
            mode: BatchMode::Normal,
            max_cell_width: Self::DEFAULT_MAX_CELL_WIDTH,
            retry: RetryPolicy::NONE,
        }
    }
}

/// Shrink `cell` so its width is at most `max_width`, keeping the aspect ratio.
pub fn preview_cell(cell: PixelSize, max_width: u32) -> PixelSize {
    let max_width = max_width.max(1);
    if cell.width <= max_width {
        return cell;
    }
    let scale = f64::from(max_width) / f64::from(cell.width);
    let height = ((f64::from(cell.height) * scale).round() as u32).max(1);
    PixelSize::new(max_width, height)
}

/// Render the first sheet of a run at preview size, with numbering hidden.
///
/// Returns `Ok(None)` when `cancel` fired before the sheet was complete.
#[tracing::instrument(level = "debug", skip_all, fields(images = images.len()))]
pub fn render_preview(
    images: &[ImageRef],
    config: &SheetConfig,
    source: &dyn ImageSource,
    opts: PreviewOpts,
    cancel: &dyn CancelToken,
) -> GridsheetResult<Option<SheetImage>> {
    config.validate()?;
    let cell = preview_cell(cell_size(config)?, opts.max_cell_width);
    let plan = BatchPlan::with_cell(images, config, opts.mode, cell)?;
    let Some(first) = plan.batches().first() else {
        return Ok(None);
    };

    let pacer = NoPacer;
    let mut renderer = SheetRenderer::new(
        config,
        source,
        &pacer,
        opts.retry,
        RendererOpts {
            numbers: false,
            cell,
            sheet_width: first.grid.sheet_size().width,
        },
    )?;
    let mask = config.mask();
    let req = GridRequest {
        images: plan.batch_images(0),
        grid: first.grid,
        index_offset: first.range.start,
        start_number: config.grid.start_number,
        mask: &mask,
        redaction_active: plan.mode().redaction_active(config),
        hide_numbers: true,
    };

    let mut sheet = Sheet::new();
    match renderer.render_grid(&mut sheet, &req, cancel)? {
        GridOutcome::Completed { cells, broken } => {
            tracing::debug!(cells, broken, width = sheet.size().width, "preview rendered");
            Ok(Some(sheet.snapshot()))
        }
        GridOutcome::Cancelled { .. } => Ok(None),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/preview.rs"]
mod tests;
