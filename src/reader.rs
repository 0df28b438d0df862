//! FFmpeg-backed source reader.
//!
//! [`FfmpegReader`] opens a media file, inspects its best video and audio
//! streams, and opens a fresh demuxer for each track so the two pumps never
//! contend over one input context. Video is decoded into raw frames; audio
//! packets are passed through untouched for stream copy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{Parameters, context::Context as CodecContext},
    decoder::Video as VideoDecoder,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
    util::mathematics::{Rescale, rescale::TIME_BASE},
};

use crate::error::ReframeError;
use crate::job::{MediaReader, WriterContext};
use crate::metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
use crate::track::{FrameStream, Timestamped};
use crate::writer::FfmpegWriter;

/// Reads a media file through FFmpeg.
pub struct FfmpegReader {
    path: PathBuf,
    metadata: MediaMetadata,
    start_micros: i64,
    video_stream_index: Option<usize>,
    audio_track: Option<AudioTrackParameters>,
}

/// Codec parameters of the source audio track, needed to stream-copy it.
#[derive(Clone)]
pub struct AudioTrackParameters {
    pub(crate) stream_index: usize,
    pub(crate) parameters: Parameters,
    pub(crate) time_base: Rational,
}

impl FfmpegReader {
    /// Open a media file and inspect its tracks.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::SourceOpenFailure`] if FFmpeg cannot open or
    /// probe the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReframeError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening source {}", path.display());

        let open_failure = |reason: String| ReframeError::SourceOpenFailure {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_failure(format!("FFmpeg initialisation failed: {error}")))?;
        let input = ffmpeg_next::format::input(&path).map_err(|error| open_failure(error.to_string()))?;

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let start_micros = start_offset_micros(input.start_time());

        let mut video_stream_index = None;
        let mut video = None;
        if let Some(stream) = input.streams().best(Type::Video) {
            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| open_failure(format!("video decoder: {error}")))?;

            let frames_per_second = [stream.avg_frame_rate(), stream.rate()]
                .into_iter()
                .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
                .map_or(0.0, |rate| rate.numerator() as f64 / rate.denominator() as f64);

            video_stream_index = Some(stream.index());
            video = Some(VideoMetadata {
                width: decoder.width(),
                height: decoder.height(),
                frames_per_second,
                codec: stream.parameters().id().name().to_string(),
            });
        }

        let mut audio_track = None;
        let mut audio = None;
        if let Some(stream) = input.streams().best(Type::Audio) {
            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().audio())
                .map_err(|error| open_failure(format!("audio decoder: {error}")))?;

            audio = Some(AudioMetadata {
                sample_rate: decoder.rate(),
                channels: decoder.channels(),
                codec: stream.parameters().id().name().to_string(),
            });
            audio_track = Some(AudioTrackParameters {
                stream_index: stream.index(),
                // Cloning detaches the parameters from the probing context.
                parameters: stream.parameters().clone(),
                time_base: stream.time_base(),
            });
        }

        let metadata = MediaMetadata {
            video,
            audio,
            duration,
            format: input.format().name().to_string(),
        };
        log::debug!("Source metadata: {metadata:?}");

        Ok(Self {
            path,
            metadata,
            start_micros,
            video_stream_index,
            audio_track,
        })
    }

    /// Path of the opened file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A writer factory that stream-copies this source's audio track.
    ///
    /// Take the factory before moving the reader into a
    /// [`TranscodeJob`](crate::TranscodeJob).
    pub fn writer_factory(
        &self,
    ) -> impl FnOnce(&WriterContext<'_>) -> Result<FfmpegWriter, ReframeError> + Send + 'static
    {
        let audio = self.audio_track.clone();
        move |context| FfmpegWriter::create(context, audio)
    }

    fn reopen(&self) -> Result<Input, ReframeError> {
        ffmpeg_next::format::input(&self.path).map_err(|error| ReframeError::SourceOpenFailure {
            path: self.path.clone(),
            reason: error.to_string(),
        })
    }
}

impl MediaReader for FfmpegReader {
    type Video = FfmpegVideoStream;
    type Audio = FfmpegAudioStream;

    fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    fn source_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn video_stream(&mut self) -> Result<FfmpegVideoStream, ReframeError> {
        let stream_index = self.video_stream_index.ok_or(ReframeError::NoVideoTrack)?;
        let input = self.reopen()?;
        let (time_base, decoder) = {
            let stream = input.stream(stream_index).ok_or(ReframeError::NoVideoTrack)?;
            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?;
            (stream.time_base(), decoder)
        };

        Ok(FfmpegVideoStream {
            input,
            decoder,
            stream_index,
            time_base,
            start: Duration::from_micros(self.start_micros as u64),
            eof_sent: false,
            done: false,
        })
    }

    fn audio_stream(&mut self) -> Result<FfmpegAudioStream, ReframeError> {
        let track = self.audio_track.as_ref().ok_or_else(|| ReframeError::SourceOpenFailure {
            path: self.path.clone(),
            reason: "source has no audio track".to_string(),
        })?;

        Ok(FfmpegAudioStream {
            input: self.reopen()?,
            stream_index: track.stream_index,
            time_base: track.time_base,
            start_ticks: self.start_micros.rescale(TIME_BASE, track.time_base),
        })
    }
}

/// A decoded video frame and its presentation timestamp.
pub struct DecodedFrame {
    pub(crate) frame: VideoFrame,
    pub(crate) timestamp: Duration,
}

impl DecodedFrame {
    /// The raw FFmpeg frame.
    pub fn frame(&self) -> &VideoFrame {
        &self.frame
    }
}

impl Timestamped for DecodedFrame {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// The decoded video track of an [`FfmpegReader`].
pub struct FfmpegVideoStream {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    time_base: Rational,
    start: Duration,
    eof_sent: bool,
    done: bool,
}

impl FrameStream for FfmpegVideoStream {
    type Frame = DecodedFrame;

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, ReframeError> {
        if self.done {
            return Ok(None);
        }

        loop {
            let mut decoded = VideoFrame::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
                let timestamp = pts_to_duration(pts, self.time_base).saturating_sub(self.start);
                return Ok(Some(DecodedFrame {
                    frame: decoded,
                    timestamp,
                }));
            }

            if self.eof_sent {
                self.done = true;
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                }
            }
        }
    }

    fn close(&mut self) {
        self.done = true;
    }
}

/// A compressed audio packet, copied to the output as-is.
pub struct AudioPacket {
    pub(crate) packet: Packet,
    pub(crate) time_base: Rational,
    pub(crate) timestamp: Duration,
}

impl Timestamped for AudioPacket {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// The audio track of an [`FfmpegReader`].
pub struct FfmpegAudioStream {
    input: Input,
    stream_index: usize,
    time_base: Rational,
    start_ticks: i64,
}

impl FrameStream for FfmpegAudioStream {
    type Frame = AudioPacket;

    fn next_frame(&mut self) -> Result<Option<AudioPacket>, ReframeError> {
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.stream_index => {
                    // Keep audio on the same clock as the rebased video.
                    packet.set_pts(packet.pts().map(|pts| pts - self.start_ticks));
                    packet.set_dts(packet.dts().map(|dts| dts - self.start_ticks));
                    let timestamp = pts_to_duration(packet.pts().unwrap_or(0), self.time_base);
                    return Ok(Some(AudioPacket {
                        packet,
                        time_base: self.time_base,
                        timestamp,
                    }));
                }
                Ok(()) => {}
                Err(FfmpegError::Eof) => return Ok(None),
                Err(error) => return Err(error.into()),
            }
        }
    }
}

/// Container start time in microseconds. Unset (`AV_NOPTS_VALUE`) and
/// negative starts count as zero.
fn start_offset_micros(start_time: i64) -> i64 {
    start_time.max(0)
}

/// Convert a stream timestamp to a [`Duration`]. Negative values clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    if pts <= 0 || time_base.denominator() == 0 {
        return Duration::ZERO;
    }
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::from_secs_f64(seconds)
}
