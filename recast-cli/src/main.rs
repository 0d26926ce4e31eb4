//! recast CLI - remux a container or transcode its first video stream.

use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use recast_codecs::EncoderConfig;
use recast_containers::{create_output, open_input};
use recast_core::format::{CodecId, TrackType};
use recast_core::frame::PixelFormat;
use recast_core::timestamp::TimeBase;
use recast_pipeline::{select_stream, Driver, PipelineError, RunStats};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Remux a container, or transcode its first video stream.
#[derive(Parser, Debug)]
#[command(name = "recast", version, about)]
struct Args {
    /// Input file.
    input: PathBuf,

    /// Output file.
    output: PathBuf,

    /// Copy the stream without re-encoding.
    #[arg(short = 'c', long)]
    copy: bool,

    /// Video codec for the output.
    #[arg(long, default_value = "rawvideo")]
    video_codec: String,

    /// Pixel format for the output (defaults to the input's).
    #[arg(long)]
    pixel_format: Option<String>,

    /// Output width (defaults to the input's).
    #[arg(long)]
    width: Option<u32>,

    /// Output height (defaults to the input's).
    #[arg(long)]
    height: Option<u32>,

    /// Output frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Overwrite the output file if it exists.
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the encoder configuration, filling gaps from the input stream.
fn encoder_config(args: &Args, demuxer: &dyn recast_containers::Demuxer) -> Result<EncoderConfig, PipelineError> {
    let codec = CodecId::from_name(&args.video_codec)
        .ok_or_else(|| PipelineError::InvalidConfig(format!("unknown codec '{}'", args.video_codec)))?;

    let index = select_stream(demuxer, TrackType::Video)?;
    let info = demuxer
        .stream_info(index)
        .ok_or(PipelineError::StreamNotFound(index))?;
    let video = info
        .video
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidConfig("input stream has no video parameters".into()))?;

    let pixel_format = match &args.pixel_format {
        Some(name) => PixelFormat::from_name(name).ok_or_else(|| {
            PipelineError::InvalidConfig(format!("unknown pixel format '{name}'"))
        })?,
        None => video.pixel_format.unwrap_or(PixelFormat::Yuv420p),
    };
    let width = args.width.unwrap_or(video.width);
    let height = args.height.unwrap_or(video.height);
    if args.fps == 0 {
        return Err(PipelineError::InvalidConfig("fps must be positive".into()));
    }

    Ok(EncoderConfig::new(codec, width, height, pixel_format)
        .with_time_base(TimeBase::new(1, args.fps as i64)))
}

fn run(args: &Args) -> Result<RunStats, PipelineError> {
    let demuxer = open_input(&args.input)?;
    let muxer = create_output(&args.output)?;
    let config = if args.copy {
        None
    } else {
        Some(encoder_config(args, demuxer.as_ref())?)
    };
    debug!(
        input = %args.input.display(),
        output = %args.output.display(),
        copy = args.copy,
        "pipeline configured"
    );

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    let progress_bar = bar.clone();

    let driver = Driver::new(demuxer, muxer).with_progress(Box::new(move |stats| {
        progress_bar.set_message(format!(
            "{} packets in, {} out",
            stats.packets_read, stats.packets_written
        ));
    }));

    let result = match config {
        Some(config) => driver.transcode(config),
        None => driver.remux(),
    };
    bar.finish_and_clear();
    result
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            std::process::exit(0);
        }
        Err(e) => {
            eprint!("{e}");
            std::process::exit(1);
        }
    };

    init_logging(args.verbose);

    if !args.input.exists() {
        eprintln!(
            "{} input file not found: {}",
            style("error:").red().bold(),
            args.input.display()
        );
        std::process::exit(1);
    }
    if args.output.exists() && !args.overwrite {
        eprintln!(
            "{} output file already exists: {} (use -y to overwrite)",
            style("error:").red().bold(),
            args.output.display()
        );
        std::process::exit(1);
    }

    match run(&args) {
        Ok(stats) => {
            println!(
                "{} {} packets read, {} written, {} frames decoded, {} encoded",
                style("done:").green().bold(),
                stats.packets_read,
                stats.packets_written,
                stats.frames_decoded,
                stats.frames_encoded
            );
        }
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            std::process::exit(1);
        }
    }
}
