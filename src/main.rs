use clap::Parser;
use datestamp::batch::{self, CancelToken, JobOutcome, JobResult};
use datestamp::config::{self, StampConfig};
use datestamp::fit::HeightPolicy;
use datestamp::font::{self, FaceSource, FontError};
use datestamp::output::{self, BatchStats};
use datestamp::pipeline::{self, StampSettings, Watermarker};
use datestamp::scan::{self, Plan};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit status after an interrupted directory run.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "datestamp")]
#[command(version)]
#[command(about = "Stamp capture dates onto photographs")]
#[command(long_about = "\
Stamp capture dates onto photographs

The date comes from EXIF DateTimeOriginal, then EXIF DateTime, then the file's
modification time. It is drawn bottom-right in white with a dark outline, at
the largest size that fits --width-percent of the image width.

  datestamp IMG_0042.jpg                 -> IMG_0042_watermarked.jpg
  datestamp photos/ -r -o stamped/       -> stamped/<same subdirectories>/...

JPEG stays JPEG and PNG stays PNG. Existing files are never overwritten;
a numeric suffix (_1, _2, ...) is added instead.

Settings can also live in a config file. Run 'datestamp --gen-config' to
print a documented one. Set RUST_LOG=debug for diagnostics.")]
struct Cli {
    /// Photo or directory of photos
    #[arg(required_unless_present = "gen_config")]
    input: Option<PathBuf>,

    /// Output file, or directory (existing, or ending in a path separator)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Margin as a percentage of the shorter image side
    #[arg(long, value_name = "PCT")]
    margin: Option<f32>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Font file, or a bare file name looked up in the system font directories
    #[arg(long, value_name = "PATH|NAME")]
    font: Option<String>,

    /// Width of the date block as a percentage of the image width
    #[arg(long, value_name = "PCT")]
    width_percent: Option<u32>,

    /// Name outputs after the capture date when writing into a directory
    #[arg(long)]
    rename_to_date: bool,

    /// Parallel workers (default: one per CPU core)
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Config file (default: <config dir>/datestamp/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JPEG quality, 1-100
    #[arg(long, value_name = "Q")]
    quality: Option<u32>,

    /// Keep the width-fitting size even when the text is taller than allowed
    #[arg(long)]
    accept_overflow: bool,

    /// Print a stock config.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

impl Cli {
    /// Layer command-line flags over the loaded config.
    fn apply(&self, config: &mut StampConfig) {
        if let Some(margin) = self.margin {
            config.text.margin_percent = margin;
        }
        if let Some(width) = self.width_percent {
            config.text.width_percent = width;
        }
        if let Some(font) = &self.font {
            config.text.font = Some(font.clone());
        }
        if self.accept_overflow {
            config.text.height_policy = HeightPolicy::AcceptOverflow;
        }
        if let Some(quality) = self.quality {
            config.output.quality = quality;
        }
        if self.rename_to_date {
            config.output.rename_to_date = true;
        }
        if let Some(jobs) = self.jobs {
            config.processing.max_processes = Some(jobs);
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }
    let input = cli.input.clone().ok_or("missing input path")?;

    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let plan = scan::plan(&input, cli.recursive)?;
    let single = matches!(plan, Plan::Single(_));
    let font = load_face_source(config.text.font.as_deref(), single)?;

    let cancel = CancelToken::new();
    install_signal_handlers(&cancel)?;

    let target = pipeline::output_target(cli.output.as_deref());
    let settings: Arc<StampSettings> = Arc::new(config.stamp_settings());
    let jobs = pipeline::requests_for(&plan, &target, settings, font);

    match &plan {
        Plan::Single(source) => Ok(run_single(source, jobs, cancel)),
        Plan::Tree { root, .. } => {
            let workers = config::effective_threads(&config.processing);
            Ok(run_tree(root, jobs, workers, cancel))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the configured font.
///
/// A bad font aborts a single-file run; a directory run continues with the
/// built-in face.
fn load_face_source(
    arg: Option<&str>,
    strict: bool,
) -> Result<Option<Arc<dyn FaceSource>>, FontError> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    let path = font::resolve_font_path(arg);
    match font::load_font(&path) {
        Ok(font) => {
            debug!(path = %path.display(), "loaded font");
            Ok(Some(Arc::new(font) as Arc<dyn FaceSource>))
        }
        Err(e) if strict => Err(e),
        Err(e) => {
            warn!(error = %e, "falling back to the built-in face");
            Ok(None)
        }
    }
}

/// First SIGINT/SIGTERM cancels the run, a second one exits immediately.
fn install_signal_handlers(cancel: &CancelToken) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::flag;

        let cancelled = cancel.flag();
        for signal in [SIGINT, SIGTERM] {
            // Must be registered before the flag setter.
            flag::register_conditional_shutdown(signal, 1, Arc::clone(&cancelled))?;
            flag::register(signal, Arc::clone(&cancelled))?;
        }
    }
    #[cfg(not(unix))]
    let _ = cancel;
    Ok(())
}

fn run_single(
    source: &Path,
    jobs: Vec<pipeline::WatermarkRequest>,
    cancel: CancelToken,
) -> ExitCode {
    let mut batch = batch::run(jobs, Watermarker, 1, cancel);
    let result = batch.next().unwrap_or_else(|| JobResult {
        source: source.to_path_buf(),
        outcome: JobOutcome::Cancelled,
    });
    batch.finish();

    output::print_result(&result);
    match result.outcome {
        JobOutcome::Written(_) => ExitCode::SUCCESS,
        JobOutcome::Failed(_) | JobOutcome::Cancelled => ExitCode::FAILURE,
    }
}

fn run_tree(
    root: &Path,
    jobs: Vec<pipeline::WatermarkRequest>,
    workers: usize,
    cancel: CancelToken,
) -> ExitCode {
    let planned = jobs.len();
    output::print_start(planned, root, workers);

    let mut batch = batch::run(jobs, Watermarker, workers, cancel.clone());
    let mut stats = BatchStats::default();
    for result in batch.by_ref() {
        stats.record(&result.outcome);
        output::print_result(&result);
    }
    let summary = batch.finish();
    debug!(dispatched = summary.dispatched, planned, "batch finished");
    output::print_summary(&stats, planned);

    if cancel.is_cancelled() {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::SUCCESS
    }
}
