//! FFmpeg-backed destination writer.
//!
//! [`FfmpegWriter`] owns one muxer shared by two inputs: the video input
//! encodes retained frames according to the job's
//! [`VideoSettings`](crate::VideoSettings), and the audio input copies the
//! source's audio packets without re-encoding. Both inputs write through the
//! same mutex-guarded output context, so each pump can run on its own thread.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ffmpeg_next::{
    Dictionary, Error as FfmpegError, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    encoder::video::Encoder as VideoEncoder,
    ffi,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    picture,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::ReframeError;
use crate::job::{MediaWriter, WriterContext};
use crate::reader::{AudioPacket, AudioTrackParameters, DecodedFrame};
use crate::track::{FrameSink, SinkStatus};

/// Time base the video encoder works in.
const ENCODER_TIME_BASE: (i32, i32) = (1, 90_000);

type SharedStatus = Arc<Mutex<SinkStatus>>;

/// Pixel format and size converter, built on the first frame that needs it.
struct Scaler(ScalingContext);

// SAFETY: a Scaler is owned by one FfmpegVideoInput, which is moved onto the
// video pump thread and used only there. The context is never shared.
unsafe impl Send for Scaler {}

/// Writes a container file through FFmpeg.
pub struct FfmpegWriter {
    path: PathBuf,
    output: Arc<Mutex<Output>>,
    status: SharedStatus,
    video: Option<FfmpegVideoInput>,
    audio: Option<FfmpegAudioInput>,
}

impl FfmpegWriter {
    /// Build the writer for a job.
    ///
    /// Adds the encoded video stream and, when `audio` is given and the job
    /// includes audio, a stream-copied audio stream, then writes the
    /// container header.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::SourceOpenFailure`] if the output cannot be created.
    /// - [`ReframeError::SinkFailure`] if the encoder is unavailable or
    ///   cannot be configured.
    pub fn create(
        context: &WriterContext<'_>,
        audio: Option<AudioTrackParameters>,
    ) -> Result<Self, ReframeError> {
        let path = context.path;
        let source = context
            .metadata
            .video
            .as_ref()
            .ok_or(ReframeError::NoVideoTrack)?;
        let settings = context.options.video_settings();
        let (width, height) = settings.resolve_dimensions(source.width, source.height);
        let encoder_time_base = Rational::new(ENCODER_TIME_BASE.0, ENCODER_TIME_BASE.1);

        log::info!(
            "Writing {} ({:?}, {width}x{height} @ {:.3} fps)",
            path.display(),
            settings.codec,
            context.output_frame_rate,
        );
        log::debug!(
            "Encoder settings: {:?}",
            settings.to_dictionary(source.width, source.height, context.output_frame_rate)
        );

        let mut output = ffmpeg_next::format::output_as(path, context.options.container().muxer_name())
            .map_err(|error| ReframeError::SourceOpenFailure {
                path: path.to_path_buf(),
                reason: format!("cannot create output: {error}"),
            })?;
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec_id = settings.codec.to_codec_id();
        let codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| ReframeError::SinkFailure(format!("codec {codec_id:?} not available")))?;

        let (video_stream_index, encoder) = {
            let mut stream = output
                .add_stream(codec)
                .map_err(|error| ReframeError::SinkFailure(format!("cannot add video stream: {error}")))?;

            let mut encoder = CodecContext::from_parameters(stream.parameters())?
                .encoder()
                .video()?;
            encoder.set_width(width);
            encoder.set_height(height);
            encoder.set_format(Pixel::YUV420P);
            encoder.set_time_base(encoder_time_base);
            encoder.set_frame_rate(Some(Rational::new(
                (context.output_frame_rate * 1000.0).round() as i32,
                1000,
            )));
            if let Some(bitrate) = settings.bitrate {
                encoder.set_bit_rate(bitrate);
            }
            if let Some(interval) = settings.keyframe_interval {
                encoder.set_gop(interval);
            }
            if needs_global_header {
                unsafe {
                    (*encoder.as_mut_ptr()).flags |=
                        ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
                }
            }

            let mut encoder_options = Dictionary::new();
            if settings.bitrate.is_none() {
                if let Some(crf) = settings.crf {
                    encoder_options.set("crf", &crf.to_string());
                }
            }

            let encoder = encoder
                .open_as_with(codec, encoder_options)
                .map_err(|error| ReframeError::SinkFailure(format!("cannot open encoder: {error}")))?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
            (stream.index(), encoder)
        };

        let audio = audio.filter(|_| context.include_audio);
        let audio_stream_index = match &audio {
            Some(track) => {
                let mut stream = output.add_stream(ffmpeg_next::encoder::find(Id::None))?;
                stream.set_parameters(track.parameters.clone());
                // Let the muxer pick its own codec tag.
                unsafe {
                    (*stream.parameters().as_mut_ptr()).codec_tag = 0;
                }
                Some(stream.index())
            }
            None => None,
        };

        output
            .write_header()
            .map_err(|error| ReframeError::SinkFailure(format!("cannot write header: {error}")))?;

        let stream_time_base = |index: usize| {
            output
                .stream(index)
                .map(|stream| stream.time_base())
                .ok_or_else(|| ReframeError::SinkFailure(format!("output stream {index} missing")))
        };
        let video_time_base = stream_time_base(video_stream_index)?;
        let audio_time_base = audio_stream_index.map(stream_time_base).transpose()?;

        let output = Arc::new(Mutex::new(output));
        let status = SharedStatus::default();

        let video = FfmpegVideoInput {
            output: Arc::clone(&output),
            status: Arc::clone(&status),
            encoder,
            scaler: None,
            stream_index: video_stream_index,
            encoder_time_base,
            output_time_base: video_time_base,
            width,
            height,
            last_pts: None,
        };

        let audio = match (audio, audio_stream_index, audio_time_base) {
            (Some(track), Some(stream_index), Some(output_time_base)) => Some(FfmpegAudioInput {
                output: Arc::clone(&output),
                status: Arc::clone(&status),
                stream_index,
                input_time_base: track.time_base,
                output_time_base,
            }),
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            output,
            status,
            video: Some(video),
            audio,
        })
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaWriter for FfmpegWriter {
    type Video = FfmpegVideoInput;
    type Audio = FfmpegAudioInput;

    fn video_input(&mut self) -> Result<FfmpegVideoInput, ReframeError> {
        self.video
            .take()
            .ok_or_else(|| ReframeError::SinkFailure("video input already taken".to_string()))
    }

    fn audio_input(&mut self) -> Result<FfmpegAudioInput, ReframeError> {
        self.audio
            .take()
            .ok_or_else(|| ReframeError::SinkFailure("writer has no audio input".to_string()))
    }

    fn finish(&mut self) -> Result<(), ReframeError> {
        if let SinkStatus::Failed(reason) = self.status() {
            return Err(ReframeError::SinkFailure(reason));
        }

        let result = lock(&self.output).write_trailer();
        match result {
            Ok(()) => {
                set_status(&self.status, SinkStatus::Completed);
                Ok(())
            }
            Err(error) => {
                let reason = format!("cannot write trailer: {error}");
                set_status(&self.status, SinkStatus::Failed(reason.clone()));
                Err(ReframeError::SinkFailure(reason))
            }
        }
    }

    fn status(&self) -> SinkStatus {
        lock(&self.status).clone()
    }
}

/// Encodes retained video frames into the shared muxer.
pub struct FfmpegVideoInput {
    output: Arc<Mutex<Output>>,
    status: SharedStatus,
    encoder: VideoEncoder,
    scaler: Option<Scaler>,
    stream_index: usize,
    encoder_time_base: Rational,
    output_time_base: Rational,
    width: u32,
    height: u32,
    last_pts: Option<i64>,
}

impl FfmpegVideoInput {
    fn encode(&mut self, decoded: DecodedFrame) -> Result<(), ReframeError> {
        let DecodedFrame { frame, timestamp } = decoded;

        let needs_scaling = frame.format() != Pixel::YUV420P
            || frame.width() != self.width
            || frame.height() != self.height;
        let mut frame = if needs_scaling {
            if self.scaler.is_none() {
                self.scaler = Some(Scaler(ScalingContext::get(
                    frame.format(),
                    frame.width(),
                    frame.height(),
                    Pixel::YUV420P,
                    self.width,
                    self.height,
                    ScalingFlags::BILINEAR,
                )?));
            }
            let mut scaled = VideoFrame::empty();
            if let Some(Scaler(scaler)) = self.scaler.as_mut() {
                scaler.run(&frame, &mut scaled)?;
            }
            scaled
        } else {
            frame
        };

        let ticks = self.encoder_time_base.denominator() as f64
            / self.encoder_time_base.numerator().max(1) as f64;
        let mut pts = (timestamp.as_secs_f64() * ticks).round() as i64;
        if let Some(last) = self.last_pts {
            pts = pts.max(last + 1);
        }
        self.last_pts = Some(pts);

        frame.set_pts(Some(pts));
        frame.set_kind(picture::Type::None);
        self.encoder.send_frame(&frame)?;
        self.drain()
    }

    fn drain(&mut self) -> Result<(), ReframeError> {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    packet.set_stream(self.stream_index);
                    packet.rescale_ts(self.encoder_time_base, self.output_time_base);
                    packet.write_interleaved(&mut lock(&self.output))?;
                }
                Err(FfmpegError::Other { errno }) if errno == ffi::EAGAIN => return Ok(()),
                Err(FfmpegError::Eof) => return Ok(()),
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn flush(&mut self) -> Result<(), ReframeError> {
        self.encoder.send_eof()?;
        self.drain()
    }
}

impl FrameSink for FfmpegVideoInput {
    type Frame = DecodedFrame;

    fn is_ready_for_more(&self) -> bool {
        lock(&self.status).clone() == SinkStatus::Writing
    }

    fn wait_until_ready(&self) {}

    fn append(&mut self, frame: DecodedFrame) -> bool {
        match self.encode(frame) {
            Ok(()) => true,
            Err(error) => {
                set_status(&self.status, SinkStatus::Failed(error.to_string()));
                false
            }
        }
    }

    fn mark_finished(&mut self) {
        if let Err(error) = self.flush() {
            set_status(&self.status, SinkStatus::Failed(error.to_string()));
        }
    }

    fn status(&self) -> SinkStatus {
        lock(&self.status).clone()
    }
}

/// Copies source audio packets into the shared muxer.
pub struct FfmpegAudioInput {
    output: Arc<Mutex<Output>>,
    status: SharedStatus,
    stream_index: usize,
    input_time_base: Rational,
    output_time_base: Rational,
}

impl FrameSink for FfmpegAudioInput {
    type Frame = AudioPacket;

    fn is_ready_for_more(&self) -> bool {
        lock(&self.status).clone() == SinkStatus::Writing
    }

    fn wait_until_ready(&self) {}

    fn append(&mut self, frame: AudioPacket) -> bool {
        let AudioPacket {
            mut packet,
            time_base,
            ..
        } = frame;
        debug_assert_eq!(time_base, self.input_time_base);

        packet.set_stream(self.stream_index);
        packet.rescale_ts(self.input_time_base, self.output_time_base);
        packet.set_position(-1);

        match packet.write_interleaved(&mut lock(&self.output)) {
            Ok(()) => true,
            Err(error) => {
                set_status(
                    &self.status,
                    SinkStatus::Failed(format!("write audio packet failed: {error}")),
                );
                false
            }
        }
    }

    fn mark_finished(&mut self) {}

    fn status(&self) -> SinkStatus {
        lock(&self.status).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_status(status: &SharedStatus, value: SinkStatus) {
    let mut guard = lock(status);
    // The first failure wins.
    if !matches!(*guard, SinkStatus::Failed(_)) {
        *guard = value;
    }
}
