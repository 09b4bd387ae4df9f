use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lightshare::GridPreset;
use lightshare::capture::{ImageSequenceSource, Nv21FileSource};
use lightshare::config::{CropRegion, ShareConfig};
use lightshare::display::PngSurface;
use lightshare::error::{classify, HasRecoverySuggestion, HasSeverity};
use lightshare::processing::{FileSink, JsonSink, TextSink};
use lightshare::session::{ReceiveSession, SendSession};
use tracing_subscriber::EnvFilter;

/// Move bytes from one screen to another device's camera as a grid of coloured cells.
#[derive(Parser, Debug)]
#[command(name = "lightshare")]
#[command(about = "Send bytes through a screen and a camera as a colour grid")]
#[command(long_about = "Encode bytes into a black/red/green/blue cell grid, render it as an image,
and decode grids back from photos or raw NV21 camera frames.")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a payload as a grid image
    Encode(EncodeArgs),
    /// Decode payloads from photos or camera frames of a grid
    Decode(DecodeArgs),
    /// Write the random placeholder grids shown while nothing is being sent
    Idle(IdleArgs),
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Cells per side
    #[arg(short = 'n', long, default_value_t = 16)]
    grid_size: u32,

    /// Named grid density, overrides --grid-size
    #[arg(short, long, value_enum)]
    preset: Option<GridPreset>,
}

impl GridArgs {
    fn grid_size(&self) -> u32 {
        self.preset
            .map_or(self.grid_size, |preset| preset.size().dimension())
    }
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Text to send
    #[arg(short, long, default_value = "Hello", conflicts_with = "input")]
    text: String,

    /// Send the contents of a file instead of text
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output image
    #[arg(short, long, default_value = "grid.png")]
    output: String,

    #[command(flatten)]
    grid: GridArgs,

    /// Image width in pixels
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 512)]
    height: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// `Received: <text>` lines
    Text,
    /// One JSON object per frame, payload in base64
    Json,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Image files, or one raw NV21 file with --nv21
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Treat the input as raw NV21 frames of this size, e.g. 640x480
    #[arg(long, value_parser = parse_dimensions)]
    nv21: Option<(u32, u32)>,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also write the latest payload bytes to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sampling radius around each cell centre
    #[arg(short, long, default_value_t = 1)]
    radius: u32,

    /// Region of each frame holding the grid: x,y,width,height
    #[arg(long)]
    crop: Option<CropRegion>,

    /// Only report payloads that differ from the previous frame
    #[arg(long)]
    only_changes: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,
}

#[derive(Args, Debug)]
struct IdleArgs {
    /// Output path; `{}` is replaced by the frame number
    #[arg(short, long, default_value = "noise-{}.png")]
    output: String,

    /// Number of grids to write
    #[arg(short, long, default_value_t = 10)]
    frames: u64,

    /// Milliseconds between grids
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    #[command(flatten)]
    grid: GridArgs,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Encode(args) => encode(args).await,
        Command::Decode(args) => decode(args).await,
        Command::Idle(args) => idle(args).await,
    };
    if let Err(e) = &result {
        report_failure(e);
    }
    result
}

/// Log the failing error's class and print its recovery hint, if it carries one.
fn report_failure(error: &anyhow::Error) {
    let Some(share) = classify::find(error) else {
        return;
    };
    tracing::error!(
        category = share.category(),
        severity = ?share.severity(),
        fatal = classify::is_fatal(share),
        "{}",
        share
    );
    if let Some(hint) = share.recovery_suggestion() {
        eprintln!("hint: {}", hint);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn encode(args: EncodeArgs) -> Result<()> {
    let config = ShareConfig {
        grid_size: args.grid.grid_size(),
        viewport_width: args.width,
        viewport_height: args.height,
        ..ShareConfig::default()
    };
    config.validate()?;

    let payload = match &args.input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => args.text.into_bytes(),
    };

    let surface = PngSurface::new(&args.output, config.viewport());
    let path = surface.next_path();
    let session = SendSession::new(surface, &config)?;
    session.set_payload(&payload).await?;

    println!("{}", path.display());
    Ok(())
}

async fn decode(args: DecodeArgs) -> Result<()> {
    let config = ShareConfig {
        grid_size: args.grid.grid_size(),
        sample_radius: args.radius,
        only_changes: args.only_changes,
        crop: args.crop,
        ..ShareConfig::default()
    };

    let mut builder = ReceiveSession::builder().with_config(&config)?;
    builder = match args.nv21 {
        Some((width, height)) => {
            let [path] = args.files.as_slice() else {
                anyhow::bail!("--nv21 takes exactly one input file");
            };
            builder.with_source(Nv21FileSource::new(path, width, height))
        }
        None => builder.with_source(ImageSequenceSource::new(args.files)),
    };
    builder = match args.format {
        OutputFormat::Text => builder.with_sink(TextSink::stdout()),
        OutputFormat::Json => builder.with_sink(JsonSink::stdout()),
    };
    if let Some(output) = args.output {
        builder = builder.with_sink(FileSink::new(output));
    }
    if let Some(max) = args.max_frames {
        builder = builder.max_frames(max);
    }

    let report = builder.build()?.run().await?;
    if report.frames_decoded == 0 {
        anyhow::bail!("no frames decoded");
    }
    Ok(())
}

async fn idle(args: IdleArgs) -> Result<()> {
    let config = ShareConfig {
        grid_size: args.grid.grid_size(),
        idle_interval_ms: args.interval_ms,
        viewport_width: args.width,
        viewport_height: args.height,
        ..ShareConfig::default()
    };
    config.validate()?;

    let surface = PngSurface::new(&args.output, config.viewport());
    let session = SendSession::new(surface, &config)?;
    let written = session.spawn_idle(Some(args.frames)).await??;

    println!("wrote {} idle grids", written);
    Ok(())
}

/// Parse `WIDTHxHEIGHT`.
fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let height = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    Ok((width, height))
}
