use crate::assets::acquire::{Acquired, ImageAcquirer, RetryPolicy};
use crate::assets::decode::DecodeOpts;
use crate::assets::source::{ImageRef, ImageSource};
use crate::assets::text::{LabelFont, find_system_font};
use crate::config::mask::MaskIndexSet;
use crate::config::model::{RedactionMode, SheetConfig};
use crate::config::ratio::GridSpec;
use crate::foundation::core::{PixelSize, Rect};
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::annotate::Annotator;
use crate::render::cell::draw_cell;
use crate::render::overlay::OverlayCompositor;
use crate::render::surface::{CellTile, Sheet};
use crate::session::pacing::{CancelToken, Pacer};

/// Cells drawn between cooperative yields.
pub const YIELD_EVERY: usize = 10;

/// What to draw on one sheet.
#[derive(Clone, Copy, Debug)]
pub struct GridRequest<'r> {
    /// Images for this sheet, in cell order.
    pub images: &'r [ImageRef],
    /// Sheet geometry.
    pub grid: GridSpec,
    /// Position of `images[0]` in the full (possibly repacked) list.
    pub index_offset: usize,
    /// Number shown for position 0 of the full list.
    pub start_number: u32,
    /// Targeted global numbers.
    pub mask: &'r MaskIndexSet,
    /// Draw redaction marks on targeted cells.
    pub redaction_active: bool,
    /// Suppress sequence numbers.
    pub hide_numbers: bool,
}

impl GridRequest<'_> {
    /// Global number of cell `i`: `start_number + index_offset + i`.
    pub fn number_for(&self, i: usize) -> u32 {
        let pos = u32::try_from(self.index_offset.saturating_add(i)).unwrap_or(u32::MAX);
        self.start_number.saturating_add(pos)
    }
}

/// Result of drawing one sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridOutcome {
    /// Every cell and the overlay were drawn.
    Completed {
        /// Cells drawn.
        cells: usize,
        /// Cells that fell back to the placeholder.
        broken: usize,
    },
    /// Cancellation was observed; the sheet is partial and must not be encoded.
    Cancelled {
        /// Cells drawn before stopping.
        cells_drawn: usize,
    },
}

/// Renderer options that change which resources are loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOpts {
    /// Load the numbering font. Previews turn this off.
    pub numbers: bool,
    /// Cell size used to size vector stickers.
    pub cell: PixelSize,
    /// Sheet width used to size vector overlays.
    pub sheet_width: u32,
}

/// Draws sheets for one run, holding the resources loaded once per run.
pub struct SheetRenderer<'a> {
    config: &'a SheetConfig,
    acquirer: ImageAcquirer<'a>,
    pacer: &'a dyn Pacer,
    annotator: Annotator,
    overlay: Option<OverlayCompositor>,
    tile: CellTile,
}

impl<'a> SheetRenderer<'a> {
    /// Load the label font, sticker and overlay.
    ///
    /// Without `numbering.font_source` the font is resolved from installed system fonts. A missing
    /// or unreadable font is a pre-condition failure. Sticker and overlay failures are absorbed:
    /// the sticker falls back to line marks, the overlay is skipped.
    pub fn new(
        config: &'a SheetConfig,
        source: &'a dyn ImageSource,
        pacer: &'a dyn Pacer,
        retry: RetryPolicy,
        opts: RendererOpts,
    ) -> GridsheetResult<Self> {
        let acquirer = ImageAcquirer::new(source, pacer, retry);

        let font = if opts.numbers && config.numbering.enabled {
            Some(load_font(config, source)?)
        } else {
            None
        };

        let sticker = match (&config.redaction.mode, &config.redaction.sticker) {
            (RedactionMode::Sticker, Some(s)) => {
                let long_side = opts.cell.width.max(opts.cell.height);
                let hint = DecodeOpts {
                    svg_long_side: Some(long_side),
                };
                match acquirer.acquire_with(&s.source, hint) {
                    Acquired::Decoded(img) => Some(img),
                    Acquired::Broken { reason, .. } => {
                        tracing::warn!(source = %s.source, %reason, "sticker unavailable, using line marks");
                        None
                    }
                }
            }
            _ => None,
        };
        let annotator = Annotator::new(font, sticker.as_ref());
        drop(sticker);
        if config.redaction.mode == RedactionMode::Sticker && !annotator.has_sticker() {
            tracing::info!("redaction stickers unavailable, line marks will be drawn");
        }

        let overlay = match &config.overlay {
            Some(ov) => {
                let hint = DecodeOpts {
                    svg_long_side: Some(opts.sheet_width),
                };
                match acquirer.acquire_with(&ov.source, hint) {
                    Acquired::Decoded(img) => {
                        match OverlayCompositor::new(img, ov.blend_mode, ov.opacity) {
                            Ok(c) => Some(c),
                            Err(e) => {
                                tracing::warn!(source = %ov.source, error = %e, "overlay skipped");
                                None
                            }
                        }
                    }
                    Acquired::Broken { reason, .. } => {
                        tracing::warn!(source = %ov.source, %reason, "overlay unavailable, skipped");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            config,
            acquirer,
            pacer,
            annotator,
            overlay,
            tile: CellTile::new(),
        })
    }

    /// Return `true` when an overlay was loaded.
    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Draw one sheet into `sheet`, which is resized and cleared to the background first.
    ///
    /// Cancellation is polled before each cell and after each image load. Each decoded image is
    /// dropped as soon as its cell has been drawn.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(cells = req.images.len(), offset = req.index_offset)
    )]
    pub fn render_grid(
        &mut self,
        sheet: &mut Sheet,
        req: &GridRequest<'_>,
        cancel: &dyn CancelToken,
    ) -> GridsheetResult<GridOutcome> {
        let capacity = (req.grid.rows as usize).saturating_mul(req.grid.cols as usize);
        if req.images.len() > capacity {
            return Err(GridsheetError::validation(format!(
                "{} images do not fit a {}x{} grid",
                req.images.len(),
                req.grid.cols,
                req.grid.rows
            )));
        }

        let cfg = self.config;
        let background = cfg.background.to_rgba8();
        sheet.prepare(req.grid.check_encodable()?, background)?;

        let cell = req.grid.cell();
        let local = Rect::new(0.0, 0.0, f64::from(cell.width), f64::from(cell.height));
        let show_numbers = cfg.numbering.enabled && !req.hide_numbers;
        let mut broken = 0usize;

        for (i, image) in req.images.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(GridOutcome::Cancelled { cells_drawn: i });
            }
            let acquired = self.acquirer.acquire(&image.source);
            if cancel.is_cancelled() {
                return Ok(GridOutcome::Cancelled { cells_drawn: i });
            }
            if acquired.is_broken() {
                broken += 1;
            }

            let number = req.number_for(i);
            let redact = req.redaction_active && req.mask.contains(number);
            let Some((x, y)) = req.grid.cell_origin(i) else {
                return Err(GridsheetError::render(format!("cell {i} lies outside the sheet")));
            };
            let annotator = &mut self.annotator;
            let tile = self.tile.render(cell, |ctx| {
                ctx.set_paint(background.to_cpu());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    local.width(),
                    local.height(),
                ));
                draw_cell(ctx, local, &acquired);
                annotator.annotate(
                    ctx,
                    local,
                    show_numbers.then_some(number),
                    &cfg.numbering,
                    redact,
                    &cfg.redaction,
                );
                Ok(())
            })?;
            sheet.blit(x, y, tile);
            drop(acquired);

            if (i + 1) % YIELD_EVERY == 0 {
                self.pacer.yield_now();
            }
        }

        if let Some(overlay) = &self.overlay {
            overlay.apply(sheet)?;
        }

        Ok(GridOutcome::Completed {
            cells: req.images.len(),
            broken,
        })
    }

    /// Drop per-sheet scratch buffers.
    pub fn release_scratch(&mut self) {
        self.tile.release();
        self.annotator.release();
    }
}

fn load_font(config: &SheetConfig, source: &dyn ImageSource) -> GridsheetResult<LabelFont> {
    let style = &config.numbering;
    let font = match style.font_source.as_deref() {
        Some(path) => {
            let bytes = source.fetch(path).map_err(|e| {
                GridsheetError::validation(format!("numbering font '{path}' could not be read: {e}"))
            })?;
            LabelFont::from_bytes(bytes, &style.font_family).map_err(|e| {
                GridsheetError::validation(format!("numbering font '{path}' could not be loaded: {e}"))
            })?
        }
        None => {
            let face = find_system_font(&style.font_family, style.weight).ok_or_else(|| {
                GridsheetError::validation(format!(
                    "no installed font matches '{}'; set numbering.font_source",
                    style.font_family
                ))
            })?;
            LabelFont::from_system(face, &style.font_family)?
        }
    };
    tracing::debug!(stack = font.stack(), "numbering font loaded");
    Ok(font)
}

#[cfg(test)]
#[path = "../../tests/unit/render/grid.rs"]
mod tests;
