use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sha2::Digest as _;

#[derive(Parser, Debug)]
#[command(name = "gridsheet", version)]
struct Cli {
    /// Log verbosity on stderr (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every sheet and write the artifacts plus a manifest.
    Render(RenderArgs),
    /// Render the first sheet at preview size as a PNG.
    Preview(PreviewArgs),
    /// Print the batch plan as JSON without rendering.
    Plan(PlanArgs),
    /// Print the canonical form of a mask expression.
    Mask(MaskArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Sheet configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Text file listing one image locator per line (blank lines and `#` comments skipped).
    #[arg(long)]
    list: Option<PathBuf>,

    /// Directory image locators are resolved against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Redaction handling.
    #[arg(long, value_enum, default_value_t = ModeChoice::Normal)]
    mode: ModeChoice,

    /// Image locators, appended after `--list`.
    images: Vec<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory for `sheet-NNN.*` files and `manifest.json`.
    #[arg(long)]
    out: PathBuf,

    /// Extra load attempts per image.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Delay between load attempts, in milliseconds.
    #[arg(long, default_value_t = 200)]
    retry_delay_ms: u64,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Preview cell width ceiling in pixels.
    #[arg(long, default_value_t = gridsheet::PreviewOpts::DEFAULT_MAX_CELL_WIDTH)]
    max_cell_width: u32,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Parser, Debug)]
struct MaskArgs {
    /// Mask expression, e.g. "1, 3-5".
    expr: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Normal,
    Apply,
    Repack,
}

impl From<ModeChoice> for gridsheet::BatchMode {
    fn from(m: ModeChoice) -> Self {
        match m {
            ModeChoice::Normal => gridsheet::BatchMode::Normal,
            ModeChoice::Apply => gridsheet::BatchMode::Apply,
            ModeChoice::Repack => gridsheet::BatchMode::Repack,
        }
    }
}

#[derive(Serialize)]
struct Manifest {
    total_batches: usize,
    cancelled: bool,
    error: Option<String>,
    artifacts: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestEntry {
    file: String,
    batch: usize,
    format: gridsheet::ArtifactFormat,
    width: u32,
    height: u32,
    image_count: usize,
    broken_count: usize,
    first_number: u32,
    last_number: u32,
    bytes: usize,
    sha256: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Mask(args) => cmd_mask(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct Inputs {
    config: gridsheet::SheetConfig,
    images: Vec<gridsheet::ImageRef>,
    source: gridsheet::FsImageSource,
}

fn load_inputs(args: &InputArgs) -> anyhow::Result<Inputs> {
    let config = gridsheet::SheetConfig::from_path(&args.config)?;

    let mut locators = Vec::new();
    if let Some(list) = &args.list {
        let text = std::fs::read_to_string(list)
            .with_context(|| format!("read image list '{}'", list.display()))?;
        locators.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_owned),
        );
    }
    locators.extend(args.images.iter().cloned());

    let root = match &args.root {
        Some(r) => r.clone(),
        None => args
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };
    let source = gridsheet::FsImageSource::new(root).allow_absolute(true);

    Ok(Inputs {
        config,
        images: gridsheet::ImageRef::list(locators),
        source,
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input)?;
    let opts = gridsheet::BatchOpts {
        mode: args.input.mode.into(),
        retry: gridsheet::RetryPolicy {
            retries: args.retries,
            delay: Duration::from_millis(args.retry_delay_ms),
        },
    };
    let mut run = gridsheet::BatchRun::new(&inputs.images, &inputs.config, &inputs.source, opts)?;
    let total = run.total_batches();
    eprintln!("rendering {} image(s) into {total} sheet(s)", run.plan().images().len());

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    // Each sheet is written as soon as it is encoded; only its manifest entry is kept.
    let mut entries = Vec::with_capacity(total);
    let mut error = None;
    for item in run.by_ref() {
        let artifact = match item {
            Ok(artifact) => artifact,
            Err(e) => {
                error = Some(e);
                break;
            }
        };
        let file = artifact.file_name();
        let path = args.out.join(&file);
        std::fs::write(&path, &artifact.bytes)
            .with_context(|| format!("write sheet '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = artifact.byte_size(), "sheet written");
        entries.push(ManifestEntry {
            file,
            batch: artifact.batch,
            format: artifact.format,
            width: artifact.width,
            height: artifact.height,
            image_count: artifact.image_count,
            broken_count: artifact.broken_count,
            first_number: artifact.first_number,
            last_number: artifact.last_number,
            bytes: artifact.byte_size(),
            sha256: sha256_hex(&artifact.bytes),
        });
    }
    let written = entries.len();

    let manifest = Manifest {
        total_batches: total,
        cancelled: run.was_cancelled(),
        error: error.as_ref().map(|e| e.to_string()),
        artifacts: entries,
    };
    let manifest_path = args.out.join("manifest.json");
    let json = serde_json::to_vec_pretty(&manifest).context("serialize manifest")?;
    std::fs::write(&manifest_path, json)
        .with_context(|| format!("write manifest '{}'", manifest_path.display()))?;

    if let Some(e) = error {
        return Err(e).context(format!(
            "{written} of {total} sheet(s) written before the failure"
        ));
    }
    eprintln!("wrote {written} sheet(s) to {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input)?;
    let opts = gridsheet::PreviewOpts {
        mode: args.input.mode.into(),
        max_cell_width: args.max_cell_width,
        ..gridsheet::PreviewOpts::default()
    };
    let image = gridsheet::render_preview(
        &inputs.images,
        &inputs.config,
        &inputs.source,
        opts,
        &gridsheet::NeverCancel,
    )?
    .context("preview was cancelled")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image
        .to_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input)?;
    let plan = gridsheet::BatchPlan::new(&inputs.images, &inputs.config, args.input.mode.into())?;
    let json = serde_json::to_string_pretty(&plan).context("serialize plan")?;
    println!("{json}");
    Ok(())
}

fn cmd_mask(args: MaskArgs) -> anyhow::Result<()> {
    let mask = gridsheet::MaskIndexSet::parse(&args.expr);
    println!("{}", mask.to_expression());
    println!("{}", mask.len());
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
