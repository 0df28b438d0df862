//! # reframe
//!
//! Re-time a video to a lower frame rate by dropping frames, while the audio
//! track is carried over untouched.
//!
//! A [`TranscodeJob`] pulls frames from a [`MediaReader`] and pushes the ones
//! it keeps into a [`MediaWriter`]. Which frames survive is decided up front
//! by a pluggable [`FrameSelector`]; the video and audio tracks are then
//! pumped concurrently, each on its own worker thread, honouring the
//! writer's backpressure.
//!
//! ## Quick Start
//!
//! ### Plan a reduction
//!
//! ```
//! use std::time::Duration;
//!
//! use reframe::{EvenlySpaced, plan_reduction};
//!
//! let plan = plan_reduction(&EvenlySpaced, 30.0, Some(10.0), Duration::from_secs(2))?;
//! assert_eq!(plan.len(), 20);
//! assert_eq!(&plan.indices()[..3], &[0, 3, 6]);
//! # Ok::<(), reframe::ReframeError>(())
//! ```
//!
//! ### Transcode a file
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # fn example() -> Result<(), reframe::ReframeError> {
//! use std::sync::Arc;
//!
//! use reframe::{OutputLocation, RandomizedWithinBucket, TranscodeOptions};
//!
//! let options = TranscodeOptions::new()
//!     .with_target_frame_rate(12.0)
//!     .with_selector(Arc::new(RandomizedWithinBucket::new()))
//!     .with_output(OutputLocation::Explicit("clip-12fps.mp4".into()));
//!
//! let output = reframe::transcode("clip.mp4", options)?;
//! println!("wrote {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Frame-rate reduction**: evenly spaced or randomized-within-bucket
//!   selection, or any custom [`FrameSelector`]
//! - **Backpressure-aware pumps**: a pump blocks on its sink's
//!   [`ReadySignal`] instead of buffering or polling
//! - **Concurrent tracks**: video and audio pumps run in parallel and the job
//!   completes only after both have finished
//! - **Output management**: explicit paths with overwrite control, or
//!   generated names in a temporary directory
//! - **Progress reporting**: batched [`ProgressCallback`] updates from the
//!   video pump
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | FFmpeg-backed [`FfmpegReader`] / [`FfmpegWriter`] and the [`transcode`] helper |
//! | `async` | [`TranscodeJob::run_async`] via Tokio's blocking pool |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed on
//! your system. The core crate has no native dependencies.

pub mod config;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod job;
pub mod metadata;
pub mod output;
pub mod progress;
pub mod pump;
#[cfg(feature = "ffmpeg")]
pub mod reader;
pub mod selection;
pub mod settings;
#[cfg(feature = "async")]
pub mod stream;
pub mod track;
#[cfg(feature = "ffmpeg")]
pub mod writer;

pub use config::TranscodeOptions;
pub use error::ReframeError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level, transcode};
pub use job::{MediaReader, MediaWriter, TranscodeJob, WriterContext};
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use output::OutputLocation;
pub use progress::{ProgressCallback, ProgressInfo};
pub use pump::{Admission, PumpReport, PumpState, pump_audio, pump_video};
#[cfg(feature = "ffmpeg")]
pub use reader::{
    AudioPacket, AudioTrackParameters, DecodedFrame, FfmpegAudioStream, FfmpegReader,
    FfmpegVideoStream,
};
pub use selection::{
    EvenlySpaced, FrameCounts, FrameSelector, RandomizedWithinBucket, RetainPlan, plan_reduction,
};
pub use settings::{ContainerFormat, VideoCodec, VideoSettings};
#[cfg(feature = "async")]
pub use stream::TranscodeFuture;
pub use track::{FrameSink, FrameStream, ReadySignal, SinkStatus, Timestamped, TrackKind};
#[cfg(feature = "ffmpeg")]
pub use writer::{FfmpegAudioInput, FfmpegVideoInput, FfmpegWriter};
