use std::{sync::Arc, time::Duration};

#[cfg(feature = "ffmpeg")]
use std::{path::PathBuf, sync::Mutex};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use serde_json::json;
use reframe::{EvenlySpaced, FrameSelector, RandomizedWithinBucket, plan_reduction};

#[cfg(feature = "ffmpeg")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "ffmpeg")]
use reframe::{
    ContainerFormat, FfmpegLogLevel, OutputLocation, ProgressCallback, ProgressInfo,
    TranscodeOptions, VideoCodec, VideoSettings,
};

const CLI_AFTER_HELP: &str = "Examples:\n  reframe plan --original-fps 30 --target-fps 10 --duration 2\n  reframe plan --original-fps 60 --target-fps 24 --duration 5 --strategy random --seed 7 --json\n  reframe transcode input.mp4 --fps 12 --out output.mp4 --progress\n  reframe completions zsh > _reframe";

#[derive(Debug, Parser)]
#[command(
    name = "reframe",
    version,
    about = "Reduce the frame rate of videos by dropping frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print which source frames a reduction keeps.
    #[command(
        about = "Print the retain plan for a frame-rate reduction",
        after_help = "Examples:\n  reframe plan --original-fps 30 --target-fps 10 --duration 2\n  reframe plan --original-fps 30 --target-fps 10 --duration 2 --strategy random --json"
    )]
    Plan {
        /// Source frame rate.
        #[arg(long)]
        original_fps: f64,
        /// Desired frame rate.
        #[arg(long)]
        target_fps: f64,
        /// Source duration in seconds.
        #[arg(long)]
        duration: f64,
        /// Selection strategy: even | random.
        #[arg(long, default_value = "even")]
        strategy: String,
        /// Seed for the random strategy.
        #[arg(long)]
        seed: Option<u64>,
        /// Output the plan as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Re-time a video file.
    #[cfg(feature = "ffmpeg")]
    #[command(
        about = "Reduce a video's frame rate",
        after_help = "Examples:\n  reframe transcode input.mp4 --fps 10\n  reframe transcode input.mov --fps 15 --out slow.mov --container mov --codec hevc --no-audio"
    )]
    Transcode {
        /// Input media path.
        input: PathBuf,
        /// Output file. Defaults to a generated name in the temp directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Target frame rate. Omit to keep every frame.
        #[arg(long)]
        fps: Option<f64>,
        /// Selection strategy: even | random.
        #[arg(long, default_value = "even")]
        strategy: String,
        /// Seed for the random strategy.
        #[arg(long)]
        seed: Option<u64>,
        /// Video codec: h264 | hevc | mpeg4.
        #[arg(long, default_value = "h264")]
        codec: String,
        /// Output container: mp4 | mov | m4v. Guessed from --out when omitted.
        #[arg(long)]
        container: Option<String>,
        /// Drop the audio track.
        #[arg(long)]
        no_audio: bool,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
        /// Allow overwriting an existing output file.
        #[arg(long)]
        overwrite: bool,
        /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_strategy(
    value: &str,
    seed: Option<u64>,
) -> Result<Arc<dyn FrameSelector>, Box<dyn std::error::Error>> {
    match value.to_ascii_lowercase().as_str() {
        "even" | "evenly-spaced" => {
            if seed.is_some() {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "--seed has no effect with the even strategy".yellow()
                );
            }
            Ok(Arc::new(EvenlySpaced))
        }
        "random" | "randomized" => Ok(Arc::new(match seed {
            Some(seed) => RandomizedWithinBucket::with_seed(seed),
            None => RandomizedWithinBucket::new(),
        })),
        other => Err(format!("unsupported --strategy: {other} (even|random)").into()),
    }
}

#[cfg(feature = "ffmpeg")]
fn resolve_container(
    container: Option<&str>,
    out: Option<&PathBuf>,
) -> Result<ContainerFormat, Box<dyn std::error::Error>> {
    if let Some(name) = container {
        return ContainerFormat::from_extension(name)
            .ok_or_else(|| format!("unsupported --container: {name}").into());
    }
    Ok(out
        .and_then(|path| path.extension())
        .and_then(|extension| extension.to_str())
        .and_then(ContainerFormat::from_extension)
        .unwrap_or_default())
}

#[cfg(feature = "ffmpeg")]
struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

#[cfg(feature = "ffmpeg")]
impl TerminalProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish(&self) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                bar.finish_with_message("done");
            }
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(info.total.unwrap_or(0));
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        });
        bar.set_position(info.current);
        if let Some(timestamp) = info.current_timestamp {
            bar.set_message(format!("{:.1}s", timestamp.as_secs_f64()));
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Plan {
            original_fps,
            target_fps,
            duration,
            strategy,
            seed,
            json,
        } => {
            let source_duration = parse_duration(duration)?;
            let selector = parse_strategy(&strategy, seed)?;
            let plan = plan_reduction(
                selector.as_ref(),
                original_fps,
                Some(target_fps),
                source_duration,
            )?;

            if json {
                let payload = json!({
                    "strategy": selector.name(),
                    "original_fps": original_fps,
                    "target_fps": target_fps,
                    "duration_seconds": duration,
                    "passthrough": plan.is_passthrough(),
                    "retained": plan.len(),
                    "indices": plan.indices(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if plan.is_passthrough() {
                println!("Passthrough: every frame is kept");
            } else {
                println!("Strategy: {}", selector.name());
                println!("Retained: {} frame(s)", plan.len());
                let indices: Vec<String> = plan.indices().iter().map(u64::to_string).collect();
                println!("Indices: {}", indices.join(" "));
            }
        }
        #[cfg(feature = "ffmpeg")]
        Commands::Transcode {
            input,
            out,
            fps,
            strategy,
            seed,
            codec,
            container,
            no_audio,
            progress,
            overwrite,
            log_level,
        } => {
            if let Some(level) = &log_level {
                let parsed = FfmpegLogLevel::from_name(level)
                    .ok_or(format!("unsupported --log-level: {level}"))?;
                reframe::set_ffmpeg_log_level(parsed);
            }

            let codec = VideoCodec::from_name(&codec).ok_or(format!("unsupported --codec: {codec}"))?;
            let container = resolve_container(container.as_deref(), out.as_ref())?;

            let mut options = TranscodeOptions::new()
                .with_selector(parse_strategy(&strategy, seed)?)
                .with_container(container)
                .with_video_settings(VideoSettings::default().codec(codec))
                .with_audio(!no_audio)
                .with_overwrite(overwrite);
            if let Some(fps) = fps {
                options = options.with_target_frame_rate(fps);
            }
            if let Some(path) = out {
                if path.exists() && overwrite {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("overwriting {}", path.display()).yellow()
                    );
                }
                options = options.with_output(OutputLocation::Explicit(path));
            }

            let terminal = progress.then(|| Arc::new(TerminalProgress::new()));
            if let Some(terminal) = &terminal {
                options = options
                    .with_progress(Arc::clone(terminal) as Arc<dyn ProgressCallback>)
                    .with_batch_size(10);
            }

            let output = reframe::transcode(&input, options)?;
            if let Some(terminal) = terminal {
                terminal.finish();
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Wrote {}", output.display()).green()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "reframe", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn parse_duration(seconds: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("--duration must be a non-negative number of seconds, got {seconds}"))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
