//! FFmpeg backend entry points.
//!
//! [`transcode`] is the one-call path: it opens the source with
//! [`FfmpegReader`], builds an [`FfmpegWriter`](crate::FfmpegWriter) for the
//! resolved output, and runs a [`TranscodeJob`].
//!
//! FFmpeg also prints its own diagnostics to stderr, independently of the
//! `log` facade used by this crate. [`set_ffmpeg_log_level`] tunes that
//! output.
//!
//! # Example
//!
//! ```no_run
//! use reframe::{FfmpegLogLevel, TranscodeOptions};
//!
//! reframe::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let output = reframe::transcode(
//!     "input.mp4",
//!     TranscodeOptions::new().with_target_frame_rate(10.0),
//! )?;
//! println!("wrote {}", output.display());
//! # Ok::<(), reframe::ReframeError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::util::log::Level;

use crate::config::TranscodeOptions;
use crate::error::ReframeError;
use crate::job::TranscodeJob;
use crate::reader::FfmpegReader;

/// Re-time the video at `input` and return the path of the written file.
///
/// # Errors
///
/// Any error from [`FfmpegReader::open`] or [`TranscodeJob::run`].
pub fn transcode<P: AsRef<Path>>(
    input: P,
    options: TranscodeOptions,
) -> Result<PathBuf, ReframeError> {
    let reader = FfmpegReader::open(input)?;
    let make_writer = reader.writer_factory();
    TranscodeJob::new(reader, options).run(make_writer)
}

/// FFmpeg's own log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output.
    Quiet,
    /// Only conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings. FFmpeg's default.
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    /// Parse a level name as accepted by the `--log-level` CLI flag.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quiet" => Some(FfmpegLogLevel::Quiet),
            "panic" => Some(FfmpegLogLevel::Panic),
            "fatal" => Some(FfmpegLogLevel::Fatal),
            "error" => Some(FfmpegLogLevel::Error),
            "warning" | "warn" => Some(FfmpegLogLevel::Warning),
            "info" => Some(FfmpegLogLevel::Info),
            "verbose" => Some(FfmpegLogLevel::Verbose),
            "debug" => Some(FfmpegLogLevel::Debug),
            "trace" => Some(FfmpegLogLevel::Trace),
            _ => None,
        }
    }

    fn to_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn from_level(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Set FFmpeg's stderr verbosity. Does not affect the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("Setting FFmpeg log level to {level:?}");
    ffmpeg_next::util::log::set_level(level.to_level());
}

/// FFmpeg's current stderr verbosity, if it maps to a known level.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from_level)
}
