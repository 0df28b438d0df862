//! Output codec and container settings.
//!
//! [`VideoSettings`] describes how the destination writer should encode the
//! retained video frames, and [`ContainerFormat`] which container it should
//! produce. Writers consume them either directly or as a flat key/value
//! dictionary via [`VideoSettings::to_dictionary`].

use std::collections::BTreeMap;

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::codec::Id;

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC. The default.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2.
    Mpeg4,
}

impl VideoCodec {
    /// Short codec name as used in encoder dictionaries.
    pub fn name(self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "hevc",
            VideoCodec::Mpeg4 => "mpeg4",
        }
    }

    /// Parse a codec name or common alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "h264" | "avc" | "x264" => Some(VideoCodec::H264),
            "h265" | "hevc" | "x265" => Some(VideoCodec::H265),
            "mpeg4" | "mp4v" => Some(VideoCodec::Mpeg4),
            _ => None,
        }
    }

    #[cfg(feature = "ffmpeg")]
    pub(crate) fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerFormat {
    /// MPEG-4 Part 14. The default.
    #[default]
    Mp4,
    /// QuickTime movie.
    Mov,
    /// Apple's MPEG-4 variant.
    M4v,
}

impl ContainerFormat {
    /// File extension used for generated output names.
    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::M4v => "m4v",
        }
    }

    /// FFmpeg muxer name for this container.
    pub fn muxer_name(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::M4v => "ipod",
        }
    }

    /// Guess the container from a path's extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mp4" => Some(ContainerFormat::Mp4),
            "mov" | "qt" => Some(ContainerFormat::Mov),
            "m4v" => Some(ContainerFormat::M4v),
            _ => None,
        }
    }
}

/// Encoder settings for the video track.
///
/// Unset fields fall back to the source's values (resolution) or to the
/// encoder's defaults (bitrate, keyframe interval).
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    /// Codec to encode with. Default is H.264.
    pub codec: VideoCodec,
    /// Output width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Output height. `None` keeps the source height.
    pub height: Option<u32>,
    /// Target bitrate in bits per second. Overrides `crf` when set.
    pub bitrate: Option<usize>,
    /// Constant Rate Factor (0-51, lower is better). Default: 23.
    pub crf: Option<u32>,
    /// Maximum distance between keyframes, in frames.
    pub keyframe_interval: Option<u32>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            width: None,
            height: None,
            bitrate: None,
            crf: Some(23),
            keyframe_interval: None,
        }
    }
}

impl VideoSettings {
    /// Set the codec.
    #[must_use]
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the output resolution.
    #[must_use]
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the target bitrate in bits per second.
    #[must_use]
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Set the CRF quality value.
    #[must_use]
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the keyframe interval in frames.
    #[must_use]
    pub fn keyframe_interval(mut self, frames: u32) -> Self {
        self.keyframe_interval = Some(frames);
        self
    }

    /// Resolve output dimensions against the source size.
    ///
    /// When only one dimension is set the other keeps the source aspect
    /// ratio, rounded down to an even number as most encoders require.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if source_width > 0 => {
                let h = (source_height as f64 * w as f64 / source_width as f64) as u32;
                (w, (h & !1).max(2))
            }
            (None, Some(h)) if source_height > 0 => {
                let w = (source_width as f64 * h as f64 / source_height as f64) as u32;
                ((w & !1).max(2), h)
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }

    /// Render the settings as encoder options.
    ///
    /// `frame_rate` is the output frame rate the writer should advertise.
    /// `crf` is omitted when a bitrate is set.
    pub fn to_dictionary(
        &self,
        source_width: u32,
        source_height: u32,
        frame_rate: f64,
    ) -> BTreeMap<&'static str, String> {
        let (width, height) = self.resolve_dimensions(source_width, source_height);
        let mut dictionary = BTreeMap::new();
        dictionary.insert("codec", self.codec.name().to_string());
        dictionary.insert("width", width.to_string());
        dictionary.insert("height", height.to_string());
        dictionary.insert("frame_rate", format!("{frame_rate}"));

        match (self.bitrate, self.crf) {
            (Some(bitrate), _) => {
                dictionary.insert("bitrate", bitrate.to_string());
            }
            (None, Some(crf)) => {
                dictionary.insert("crf", crf.to_string());
            }
            (None, None) => {}
        }

        if let Some(interval) = self.keyframe_interval {
            dictionary.insert("g", interval.to_string());
        }

        dictionary
    }
}
