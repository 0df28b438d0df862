//! Source track inspection.
//!
//! A [`MediaReader`](crate::MediaReader) describes its source with a
//! [`MediaMetadata`]. Jobs use it to fail fast on sources without video, to
//! plan the frame-rate reduction, and to estimate progress totals.

use std::time::Duration;

/// What a source contains.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct MediaMetadata {
    /// The video track, if present.
    pub video: Option<VideoMetadata>,
    /// The audio track, if present.
    pub audio: Option<AudioMetadata>,
    /// Duration of the source.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl MediaMetadata {
    /// Metadata for a source with a video track only.
    pub fn video_only(video: VideoMetadata, duration: Duration) -> Self {
        Self {
            video: Some(video),
            audio: None,
            duration,
            format: String::new(),
        }
    }

    /// Attach an audio track.
    pub fn with_audio(mut self, audio: AudioMetadata) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Whether the source has a video track.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// Whether the source has an audio track.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Estimated number of video frames, `floor(fps * duration)`.
    pub fn estimated_frame_count(&self) -> Option<u64> {
        self.video
            .as_ref()
            .map(|video| (video.frames_per_second * self.duration.as_secs_f64()).floor() as u64)
    }
}

/// A video track.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal frame rate.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

impl VideoMetadata {
    /// A video track with the given geometry and rate.
    pub fn new(width: u32, height: u32, frames_per_second: f64) -> Self {
        Self {
            width,
            height,
            frames_per_second,
            codec: String::new(),
        }
    }
}

/// An audio track.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct AudioMetadata {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Codec name (e.g. `"aac"`).
    pub codec: String,
}

impl AudioMetadata {
    /// An audio track with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            codec: String::new(),
        }
    }
}
