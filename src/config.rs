//! Transcode job configuration.
//!
//! [`TranscodeOptions`] is a builder that threads the frame-rate target,
//! selection strategy, progress callback, output location, and encoder
//! settings through a [`TranscodeJob`](crate::TranscodeJob).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use reframe::{
//!     ContainerFormat, OutputLocation, RandomizedWithinBucket, TranscodeOptions,
//!     VideoCodec, VideoSettings,
//! };
//!
//! let options = TranscodeOptions::new()
//!     .with_target_frame_rate(12.0)
//!     .with_selector(Arc::new(RandomizedWithinBucket::with_seed(7)))
//!     .with_output(OutputLocation::Explicit("out.mov".into()))
//!     .with_container(ContainerFormat::Mov)
//!     .with_video_settings(VideoSettings::default().codec(VideoCodec::H265));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::output::OutputLocation;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::selection::{EvenlySpaced, FrameSelector};
use crate::settings::{ContainerFormat, VideoSettings};

/// Configuration for a transcode job.
///
/// A default-constructed value keeps the source frame rate, writes an MP4
/// into the system temporary directory, and includes audio.
#[derive(Clone)]
pub struct TranscodeOptions {
    /// Output frame rate. `None` keeps every source frame.
    pub(crate) target_frame_rate: Option<f64>,
    /// Frame-rate reduction strategy.
    pub(crate) selector: Arc<dyn FrameSelector>,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N video frames).
    pub(crate) batch_size: u64,
    /// Where the output is written.
    pub(crate) output: OutputLocation,
    /// Replace an existing explicit output file.
    pub(crate) overwrite: bool,
    /// Output container.
    pub(crate) container: ContainerFormat,
    /// Video encoder settings.
    pub(crate) video: VideoSettings,
    /// Pump the audio track when the source has one.
    pub(crate) include_audio: bool,
}

impl Debug for TranscodeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TranscodeOptions")
            .field("target_frame_rate", &self.target_frame_rate)
            .field("selector", &self.selector.name())
            .field("batch_size", &self.batch_size)
            .field("output", &self.output)
            .field("overwrite", &self.overwrite)
            .field("container", &self.container)
            .field("video", &self.video)
            .field("include_audio", &self.include_audio)
            .finish_non_exhaustive()
    }
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            target_frame_rate: None,
            selector: Arc::new(EvenlySpaced),
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            output: OutputLocation::default(),
            overwrite: true,
            container: ContainerFormat::default(),
            video: VideoSettings::default(),
            include_audio: true,
        }
    }

    /// Reduce the video to this frame rate.
    ///
    /// Rates at or above the source rate leave the video untouched.
    #[must_use]
    pub fn with_target_frame_rate(mut self, fps: f64) -> Self {
        self.target_frame_rate = Some(fps);
        self
    }

    /// Choose the frame-rate reduction strategy.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn FrameSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the output location.
    #[must_use]
    pub fn with_output(mut self, output: OutputLocation) -> Self {
        self.output = output;
        self
    }

    /// Control whether an existing explicit output file is replaced.
    /// Defaults to `true`.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the output container.
    #[must_use]
    pub fn with_container(mut self, container: ContainerFormat) -> Self {
        self.container = container;
        self
    }

    /// Set the video encoder settings.
    #[must_use]
    pub fn with_video_settings(mut self, settings: VideoSettings) -> Self {
        self.video = settings;
        self
    }

    /// Control whether the audio track is carried over. Defaults to `true`.
    #[must_use]
    pub fn with_audio(mut self, include: bool) -> Self {
        self.include_audio = include;
        self
    }

    /// The configured target frame rate.
    pub fn target_frame_rate(&self) -> Option<f64> {
        self.target_frame_rate
    }

    /// The configured output container.
    pub fn container(&self) -> ContainerFormat {
        self.container
    }

    /// The configured video settings.
    pub fn video_settings(&self) -> &VideoSettings {
        &self.video
    }

    /// Whether audio will be pumped.
    pub fn includes_audio(&self) -> bool {
        self.include_audio
    }
}
