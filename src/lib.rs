//! gridsheet composes large sets of images into fixed-grid contact sheets.
//!
//! Each sheet ("batch") lays images out in cover-fit cells, annotates every cell with a sequence
//! number and an optional redaction mark (line or sticker), composites one global overlay with a
//! blend mode, and encodes the result to PNG or JPEG depending on the requested quality.
//!
//! # Pipeline overview
//!
//! 1. **Plan**: `images + SheetConfig -> BatchPlan` (chunking, optional repack of masked images)
//! 2. **Acquire**: every cell loads its image through an [`ImageSource`] with bounded retry; an
//!    image that stays broken becomes a placeholder tile instead of an error
//! 3. **Render**: cells are rasterized on the CPU (`vello_cpu`) and blitted into a [`Sheet`]
//! 4. **Encode**: the sheet becomes an [`Artifact`]; the next sheet starts from a released buffer
//!
//! [`BatchRun`] drives steps 2 to 4 lazily, one sheet per `next()`, polling a [`CancelToken`] and
//! pausing through a [`Pacer`] between units of work.
//!
//! The key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Bounded memory**: at most one sheet and one decoded image are alive at a time.
//! - **Per-image failures are absorbed**: only pre-conditions and encoder failures surface as
//!   [`GridsheetError`].
//! - **Premultiplied RGBA8** in every surface; [`SheetImage::to_rgba_image`] converts at the edge.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod config;
mod encode;
mod foundation;
mod render;
mod session;
mod store;

pub use assets::acquire::{Acquired, ImageAcquirer, RetryPolicy};
pub use assets::decode::{DecodeOpts, DecodedImage, decode_any, decode_image, decode_svg};
pub use assets::source::{
    FsImageSource, ImageRef, ImageSource, MemoryImageSource, normalize_rel_path,
};
pub use config::color::ColorDef;
pub use config::mask::MaskIndexSet;
pub use config::model::{
    Chunking, ExportConfig, GridConfig, LabelAnchor, LineStyle, NumberingStyle, OverlayConfig,
    RedactionConfig, RedactionMode, ShadowStyle, SheetConfig, StickerConfig, StrokeStyle,
};
pub use config::ratio::{GridSpec, MAX_ENCODED_DIM, MAX_SHEET_DIM, cell_size, resolve_ratio};
pub use encode::encoder::{
    ArtifactFormat, EncodedSheet, ImageEncoder, LOSSLESS_QUALITY, SheetEncoder,
};
pub use foundation::core::{PixelSize, Point, Rect, Rgba8};
pub use foundation::error::{GridsheetError, GridsheetResult};
pub use render::annotate::{
    LABEL_MARGIN, LabelPlacement, TextAlign, label_placement, mark_line_width, mark_segments,
    sticker_rect,
};
pub use render::blend::BlendMode;
pub use render::cell::cover_fit;
pub use render::grid::{GridOutcome, GridRequest, RendererOpts, SheetRenderer, YIELD_EVERY};
pub use render::surface::{Sheet, SheetImage};
pub use session::pacing::{CancelFlag, CancelToken, NeverCancel, NoPacer, Pacer, ThreadPacer};
pub use session::plan::{
    BatchMode, BatchPlan, PlannedBatch, batch_sizes, repack, total_batches,
};
pub use session::preview::{PreviewOpts, preview_cell, render_preview};
pub use session::scheduler::{
    Artifact, BatchAbort, BatchOpts, BatchReport, BatchRun, run_batch,
};
pub use store::json_file::JsonFileStore;
pub use store::memory::MemoryStore;
pub use store::object::{Keyed, ObjectStore, StoredImage};
