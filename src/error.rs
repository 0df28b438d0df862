//! Error types for the `reframe` crate.
//!
//! This module defines [`ReframeError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context to
//! diagnose a failed job: output paths, sink failure reasons, and upstream
//! error messages.

use std::{io::Error as IoError, path::PathBuf};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

use crate::track::TrackKind;

/// The unified error type for all `reframe` operations.
///
/// A transcode job either succeeds completely or fails with one of these
/// variants. None of them are retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReframeError {
    /// The source does not contain a video track.
    #[error("No video track found in source")]
    NoVideoTrack,

    /// The destination directory does not exist or cannot be written.
    #[error("Invalid output directory {path}: {reason}")]
    InvalidOutputDirectory {
        /// Directory that was rejected.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The explicit output file already exists and overwriting is disabled.
    #[error("Output file already exists: {0}")]
    OutputExists(PathBuf),

    /// The explicit output path resolves to the source file.
    #[error("Output {0} is the source file")]
    OutputIsSource(PathBuf),

    /// The destination reported a failure while writing or finalizing.
    ///
    /// The reason is the destination's own message, unmodified.
    #[error("Sink failure: {0}")]
    SinkFailure(String),

    /// The reader or writer for a job could not be constructed.
    #[error("Failed to open {path}: {reason}")]
    SourceOpenFailure {
        /// Path of the source or destination being opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A frame rate was zero, negative, or not finite.
    #[error("Invalid frame rate: {0} (must be a positive, finite number)")]
    InvalidFrameRate(f64),

    /// A duration was negative or not finite.
    #[error("Invalid duration: {0} seconds")]
    InvalidDuration(f64),

    /// A pump worker thread panicked before signalling completion.
    #[error("The {0} pump panicked")]
    PumpPanicked(TrackKind),

    /// The task running an async job was cancelled or panicked.
    #[error("Transcode task aborted: {0}")]
    JobAborted(String),

    /// An I/O error occurred while preparing the output location.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for ReframeError {
    fn from(error: FfmpegError) -> Self {
        ReframeError::FfmpegError(error.to_string())
    }
}
