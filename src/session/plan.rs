use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::assets::source::ImageRef;
use crate::config::mask::MaskIndexSet;
use crate::config::model::{Chunking, SheetConfig};
use crate::config::ratio::{GridSpec, cell_size};
use crate::foundation::core::PixelSize;
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::foundation::math::ceil_div;
use crate::render::surface::tile_dims;

/// How a run treats the redaction mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchMode {
    /// Redaction marks drawn when `redaction.enabled` is set.
    #[default]
    Normal,
    /// Redaction marks always drawn on targeted cells.
    Apply,
    /// Targeted images removed, survivors renumbered contiguously, no marks drawn.
    Repack,
}

impl BatchMode {
    /// Whether targeted cells get a redaction mark in this mode.
    pub fn redaction_active(self, cfg: &SheetConfig) -> bool {
        match self {
            Self::Normal => cfg.redaction.enabled,
            Self::Apply => true,
            Self::Repack => false,
        }
    }
}

/// One planned sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedBatch {
    /// 0-based batch index.
    pub index: usize,
    /// Range into [`BatchPlan::images`].
    pub range: Range<usize>,
    /// Sheet geometry.
    pub grid: GridSpec,
    /// Number shown on the first cell.
    pub first_number: u32,
    /// Number shown on the last cell.
    pub last_number: u32,
}

impl PlannedBatch {
    /// Images on this sheet.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Always `false`; planned batches hold at least one image.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Number of sheets for `n` images at `rows * cols` per sheet.
pub fn total_batches(n: usize, rows: u32, cols: u32) -> usize {
    let per = (rows as usize).saturating_mul(cols as usize).max(1);
    ceil_div(n, per)
}

/// Image counts per sheet for `n` images at `per_sheet` capacity.
pub fn batch_sizes(n: usize, per_sheet: usize, chunking: Chunking) -> Vec<usize> {
    let per_sheet = per_sheet.max(1);
    let total = ceil_div(n, per_sheet);
    match chunking {
        Chunking::Fixed => (0..total)
            .map(|i| (n - i * per_sheet).min(per_sheet))
            .collect(),
        Chunking::Balanced => {
            if total == 0 {
                return Vec::new();
            }
            let base = n / total;
            let extra = n % total;
            (0..total)
                .map(|i| if i >= total - extra { base + 1 } else { base })
                .collect()
        }
    }
}

/// Drop images whose number (`start_number + position`) is in `mask`, keeping order.
pub fn repack(images: &[ImageRef], start_number: u32, mask: &MaskIndexSet) -> Vec<ImageRef> {
    images
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let pos = u32::try_from(*i).unwrap_or(u32::MAX);
            !mask.contains(start_number.saturating_add(pos))
        })
        .map(|(_, img)| img.clone())
        .collect()
}

/// The chunking of a run into sheets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchPlan {
    mode: BatchMode,
    images: Vec<ImageRef>,
    removed: usize,
    cell: PixelSize,
    per_sheet: usize,
    batches: Vec<PlannedBatch>,
}

impl BatchPlan {
    /// Plan a run over `images`.
    ///
    /// Fails before any work when the list is empty, the configuration is invalid, a repack
    /// removes every image, or a sheet would be too large to encode.
    pub fn new(images: &[ImageRef], cfg: &SheetConfig, mode: BatchMode) -> GridsheetResult<Self> {
        cfg.validate()?;
        let cell = cell_size(cfg)?;
        Self::with_cell(images, cfg, mode, cell)
    }

    /// Plan with an explicit cell size (previews shrink cells).
    pub fn with_cell(
        images: &[ImageRef],
        cfg: &SheetConfig,
        mode: BatchMode,
        cell: PixelSize,
    ) -> GridsheetResult<Self> {
        if images.is_empty() {
            return Err(GridsheetError::validation("no images to lay out"));
        }
        tile_dims(cell)?;

        let (images, removed) = match mode {
            BatchMode::Repack => {
                let kept = repack(images, cfg.grid.start_number, &cfg.mask());
                let removed = images.len() - kept.len();
                if kept.is_empty() {
                    return Err(GridsheetError::validation(
                        "repack removed every image; nothing to render",
                    ));
                }
                (kept, removed)
            }
            BatchMode::Normal | BatchMode::Apply => (images.to_vec(), 0),
        };

        let cols = cfg.grid.cols.max(1);
        let rows = cfg.grid.rows_per_sheet.max(1);
        let per_sheet = (rows as usize).saturating_mul(cols as usize);
        let sizes = batch_sizes(images.len(), per_sheet, cfg.grid.chunking);

        let mut start = 0usize;
        let batches: Vec<PlannedBatch> = sizes
            .into_iter()
            .enumerate()
            .map(|(index, len)| {
                let end = start + len;
                let range = start..end;
                start = end;
                let number = |pos: usize| {
                    cfg.grid
                        .start_number
                        .saturating_add(u32::try_from(pos).unwrap_or(u32::MAX))
                };
                PlannedBatch {
                    index,
                    grid: GridSpec::for_count(len, cols, cell, cfg.gap),
                    first_number: number(range.start),
                    last_number: number(end - 1),
                    range,
                }
            })
            .collect();

        for batch in &batches {
            batch.grid.check_encodable().map_err(|e| match e {
                GridsheetError::Validation(msg) => {
                    GridsheetError::validation(format!("batch {}: {msg}", batch.index))
                }
                other => other,
            })?;
        }

        Ok(Self {
            mode,
            images,
            removed,
            cell,
            per_sheet,
            batches,
        })
    }

    /// Mode the plan was built for.
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Images in render order (after repacking).
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    /// Images removed by repacking.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Cell size.
    pub fn cell(&self) -> PixelSize {
        self.cell
    }

    /// Capacity of a full sheet.
    pub fn per_sheet(&self) -> usize {
        self.per_sheet
    }

    /// Sheet count.
    pub fn total_batches(&self) -> usize {
        self.batches.len()
    }

    /// Planned sheets in order.
    pub fn batches(&self) -> &[PlannedBatch] {
        &self.batches
    }

    /// Images on batch `index`.
    pub fn batch_images(&self, index: usize) -> &[ImageRef] {
        self.batches
            .get(index)
            .map(|b| &self.images[b.range.clone()])
            .unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/plan.rs"]
mod tests;
