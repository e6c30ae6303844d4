use crate::assets::acquire::RetryPolicy;
use crate::assets::source::{ImageRef, ImageSource};
use crate::config::mask::MaskIndexSet;
use crate::config::model::SheetConfig;
use crate::encode::encoder::{ArtifactFormat, ImageEncoder, SheetEncoder};
use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::render::grid::{GridOutcome, GridRequest, RendererOpts, SheetRenderer};
use crate::render::surface::Sheet;
use crate::session::pacing::{CancelToken, NeverCancel, NoPacer, Pacer, ThreadPacer};
use crate::session::plan::{BatchMode, BatchPlan};

static NEVER: NeverCancel = NeverCancel;
static THREAD_PACER: ThreadPacer = ThreadPacer {
    settle: ThreadPacer::DEFAULT_SETTLE,
};
static NO_PACER: NoPacer = NoPacer;

/// One encoded sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// 0-based batch index.
    pub batch: usize,
    /// Container format.
    pub format: ArtifactFormat,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Sheet width in pixels.
    pub width: u32,
    /// Sheet height in pixels.
    pub height: u32,
    /// Images drawn on the sheet.
    pub image_count: usize,
    /// Cells that showed the broken-image placeholder.
    pub broken_count: usize,
    /// Number on the first cell.
    pub first_number: u32,
    /// Number on the last cell.
    pub last_number: u32,
}

impl Artifact {
    /// Encoded size in bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Conventional file name, e.g. `sheet-001.jpg`.
    pub fn file_name(&self) -> String {
        format!("sheet-{:03}.{}", self.batch + 1, self.format.extension())
    }
}

/// Options for a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOpts {
    /// Redaction handling.
    pub mode: BatchMode,
    /// Image acquisition retry policy.
    pub retry: RetryPolicy,
}

impl Default for BatchOpts {
    fn default() -> Self {
        Self {
            mode: BatchMode::Normal,
            retry: RetryPolicy::default(),
        }
    }
}

/// Summary of a run that ended without an encode failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    /// Artifacts in batch order.
    pub artifacts: Vec<Artifact>,
    /// Sheets the plan called for.
    pub total_batches: usize,
    /// The run stopped on cancellation.
    pub cancelled: bool,
}

/// A run aborted by an encode failure; sheets completed before it are preserved.
#[derive(Debug)]
pub struct BatchAbort {
    /// Artifacts produced before the failure.
    pub artifacts: Vec<Artifact>,
    /// The batch-fatal error.
    pub error: GridsheetError,
}

impl std::fmt::Display for BatchAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (after {} artifact(s))",
            self.error,
            self.artifacts.len()
        )
    }
}

impl std::error::Error for BatchAbort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Running,
    Done,
    Cancelled,
    Failed,
}

/// Lazy, finite, non-restartable sequence of artifacts for one run.
///
/// Each call to [`Iterator::next`] renders and encodes at most one sheet. Cancellation is polled
/// at batch start, around every image load and before encoding; a cancelled run yields no partial
/// sheet. After an encode failure the iterator is exhausted.
pub struct BatchRun<'a> {
    config: &'a SheetConfig,
    plan: BatchPlan,
    mask: MaskIndexSet,
    renderer: SheetRenderer<'a>,
    encoder: Box<dyn SheetEncoder + 'a>,
    cancel: &'a dyn CancelToken,
    pacer: &'a dyn Pacer,
    sheet: Sheet,
    next_batch: usize,
    completed: usize,
    state: RunState,
}

impl<'a> BatchRun<'a> {
    /// Validate and plan a run; nothing is rendered until the first `next()`.
    ///
    /// Uses a [`ThreadPacer`], an [`ImageEncoder`] matting over the sheet background and no
    /// cancellation unless overridden.
    pub fn new(
        images: &[ImageRef],
        config: &'a SheetConfig,
        source: &'a dyn ImageSource,
        opts: BatchOpts,
    ) -> GridsheetResult<Self> {
        Self::with_pacer(images, config, source, opts, &THREAD_PACER)
    }

    /// [`BatchRun::new`] with an explicit pacer.
    pub fn with_pacer(
        images: &[ImageRef],
        config: &'a SheetConfig,
        source: &'a dyn ImageSource,
        opts: BatchOpts,
        pacer: &'a dyn Pacer,
    ) -> GridsheetResult<Self> {
        let plan = BatchPlan::new(images, config, opts.mode)?;
        let sheet_width = plan
            .batches()
            .first()
            .map(|b| b.grid.sheet_size().width)
            .unwrap_or(0);
        let renderer = SheetRenderer::new(
            config,
            source,
            pacer,
            opts.retry,
            RendererOpts {
                numbers: true,
                cell: plan.cell(),
                sheet_width,
            },
        )?;
        tracing::debug!(
            images = plan.images().len(),
            removed = plan.removed(),
            batches = plan.total_batches(),
            mode = ?opts.mode,
            "batch run planned"
        );
        Ok(Self {
            config,
            mask: config.mask(),
            plan,
            renderer,
            encoder: Box::new(ImageEncoder {
                matte: config.background.to_rgba8(),
            }),
            cancel: &NEVER,
            pacer,
            sheet: Sheet::new(),
            next_batch: 0,
            completed: 0,
            state: RunState::Running,
        })
    }

    /// Poll `cancel` at every cancellation point.
    pub fn with_cancel(mut self, cancel: &'a dyn CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the encoder.
    pub fn with_encoder(mut self, encoder: impl SheetEncoder + 'a) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// The plan driving this run.
    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// Sheets the plan calls for.
    pub fn total_batches(&self) -> usize {
        self.plan.total_batches()
    }

    /// Sheets encoded so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Return `true` once cancellation stopped the run.
    pub fn was_cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }

    /// Drain the run.
    pub fn finish(mut self) -> Result<BatchReport, BatchAbort> {
        let mut artifacts = Vec::new();
        for item in self.by_ref() {
            match item {
                Ok(a) => artifacts.push(a),
                Err(error) => return Err(BatchAbort { artifacts, error }),
            }
        }
        Ok(BatchReport {
            artifacts,
            total_batches: self.plan.total_batches(),
            cancelled: self.was_cancelled(),
        })
    }

    fn stop(&mut self, state: RunState) {
        self.sheet.release();
        self.renderer.release_scratch();
        self.state = state;
        match state {
            RunState::Cancelled => tracing::info!(
                completed = self.completed,
                total = self.plan.total_batches(),
                "batch run cancelled"
            ),
            RunState::Done => tracing::info!(completed = self.completed, "batch run complete"),
            RunState::Running | RunState::Failed => {}
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn render_next(&mut self, index: usize) -> Option<GridsheetResult<Artifact>> {
        if index > 0 {
            self.pacer.settle();
        }
        if self.cancel.is_cancelled() {
            self.stop(RunState::Cancelled);
            return None;
        }

        let batch = self.plan.batches()[index].clone();
        let req = GridRequest {
            images: self.plan.batch_images(index),
            grid: batch.grid,
            index_offset: batch.range.start,
            start_number: self.config.grid.start_number,
            mask: &self.mask,
            redaction_active: self.plan.mode().redaction_active(self.config),
            hide_numbers: false,
        };
        let outcome = match self.renderer.render_grid(&mut self.sheet, &req, self.cancel) {
            Ok(o) => o,
            Err(e) => {
                self.stop(RunState::Failed);
                return Some(Err(e));
            }
        };
        let broken = match outcome {
            GridOutcome::Completed { broken, .. } => broken,
            GridOutcome::Cancelled { .. } => {
                self.stop(RunState::Cancelled);
                return None;
            }
        };
        if self.cancel.is_cancelled() {
            self.stop(RunState::Cancelled);
            return None;
        }

        let size = self.sheet.size();
        let encoded = self.encoder.encode(&self.sheet, self.config.export.quality);
        self.sheet.release();
        let encoded = match encoded {
            Ok(e) => e,
            Err(e) => {
                let error = GridsheetError::Encode {
                    batch: index,
                    completed: self.completed,
                    reason: e.to_string(),
                };
                tracing::error!(batch = index, completed = self.completed, error = %e, "sheet encoding failed");
                self.stop(RunState::Failed);
                return Some(Err(error));
            }
        };

        self.completed += 1;
        let artifact = Artifact {
            batch: index,
            format: encoded.format,
            bytes: encoded.bytes,
            width: size.width,
            height: size.height,
            image_count: batch.len(),
            broken_count: broken,
            first_number: batch.first_number,
            last_number: batch.last_number,
        };
        tracing::debug!(
            batch = index,
            width = artifact.width,
            height = artifact.height,
            cells = artifact.image_count,
            broken = artifact.broken_count,
            bytes = artifact.byte_size(),
            "sheet encoded"
        );
        Some(Ok(artifact))
    }
}

impl Iterator for BatchRun<'_> {
    type Item = GridsheetResult<Artifact>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != RunState::Running {
            return None;
        }
        let index = self.next_batch;
        if index >= self.plan.total_batches() {
            self.stop(RunState::Done);
            return None;
        }
        self.next_batch += 1;
        self.render_next(index)
    }
}

/// Run every batch synchronously with no yields or settle pauses, for callers without an event
/// loop to yield to. Retry delays from `opts.retry` are still waited.
pub fn run_batch(
    images: &[ImageRef],
    config: &SheetConfig,
    source: &dyn ImageSource,
    opts: BatchOpts,
    cancel: &dyn CancelToken,
) -> GridsheetResult<Result<BatchReport, BatchAbort>> {
    let run = BatchRun::with_pacer(images, config, source, opts, &NO_PACER)?.with_cancel(cancel);
    Ok(run.finish())
}

#[cfg(test)]
#[path = "../../tests/unit/session/scheduler.rs"]
mod tests;
