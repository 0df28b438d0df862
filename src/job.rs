//! Transcode jobs: one reader, one writer, two pumps.
//!
//! A [`TranscodeJob`] owns its [`MediaReader`] and the writer it builds, so
//! concurrent jobs never share state. Running a job:
//!
//! 1. fails with [`ReframeError::NoVideoTrack`] if the source has no video,
//! 2. resolves the output location,
//! 3. plans the frame-rate reduction,
//! 4. opens the source streams and builds the writer,
//! 5. runs the video and audio pumps on their own worker threads and waits
//!    for both to signal completion,
//! 6. finalizes the writer and returns the output path.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # fn example() -> Result<(), reframe::ReframeError> {
//! use reframe::{FfmpegReader, TranscodeJob, TranscodeOptions};
//!
//! let reader = FfmpegReader::open("input.mp4")?;
//! let make_writer = reader.writer_factory();
//! let options = TranscodeOptions::new().with_target_frame_rate(10.0);
//! let output = TranscodeJob::new(reader, options).run(make_writer)?;
//! println!("wrote {}", output.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::config::TranscodeOptions;
use crate::error::ReframeError;
use crate::metadata::MediaMetadata;
use crate::output;
use crate::progress::ProgressTracker;
use crate::pump::{self, PumpReport};
use crate::selection::{RetainPlan, plan_reduction};
use crate::track::{FrameSink, FrameStream, SinkStatus, TrackKind};

/// The source side of a job.
pub trait MediaReader {
    /// Decoded video track.
    type Video: FrameStream;
    /// Audio track.
    type Audio: FrameStream;

    /// What the source contains.
    fn metadata(&self) -> &MediaMetadata;

    /// The file this source reads from, if it has one. A job never writes
    /// its output over this path.
    fn source_path(&self) -> Option<&Path> {
        None
    }

    /// Open the video track for reading.
    ///
    /// # Errors
    ///
    /// Backends report [`ReframeError::SourceOpenFailure`] or their own
    /// error if the track cannot be read.
    fn video_stream(&mut self) -> Result<Self::Video, ReframeError>;

    /// Open the audio track for reading. Only called when
    /// [`MediaMetadata::has_audio`] is `true`.
    ///
    /// # Errors
    ///
    /// Same as [`video_stream`](MediaReader::video_stream).
    fn audio_stream(&mut self) -> Result<Self::Audio, ReframeError>;
}

/// The destination side of a job.
pub trait MediaWriter {
    /// Input accepting retained video frames.
    type Video: FrameSink;
    /// Input accepting audio frames.
    type Audio: FrameSink;

    /// Take the video input. Called once per job.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn video_input(&mut self) -> Result<Self::Video, ReframeError>;

    /// Take the audio input. Called once per job, only when audio is pumped.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn audio_input(&mut self) -> Result<Self::Audio, ReframeError>;

    /// Finalize the output once every input has been marked finished.
    ///
    /// # Errors
    ///
    /// [`ReframeError::SinkFailure`] with the writer's own reason.
    fn finish(&mut self) -> Result<(), ReframeError>;

    /// Current writer status.
    fn status(&self) -> SinkStatus;
}

/// Everything a writer factory needs to build the destination.
#[derive(Debug)]
pub struct WriterContext<'a> {
    /// Resolved output file.
    pub path: &'a Path,
    /// Source description.
    pub metadata: &'a MediaMetadata,
    /// Job options, including video settings and container.
    pub options: &'a TranscodeOptions,
    /// The video retain plan.
    pub plan: &'a RetainPlan,
    /// Frame rate of the produced video.
    pub output_frame_rate: f64,
    /// Whether the audio input will be requested.
    pub include_audio: bool,
}

/// A single transcode run.
///
/// Create with [`TranscodeJob::new`], then call [`run`](TranscodeJob::run)
/// with a writer factory. The job is consumed by running it.
#[derive(Debug)]
pub struct TranscodeJob<R> {
    reader: R,
    options: TranscodeOptions,
}

impl<R: MediaReader> TranscodeJob<R> {
    /// Create a job reading from `reader`.
    pub fn new(reader: R, options: TranscodeOptions) -> Self {
        Self { reader, options }
    }

    /// The source description.
    pub fn metadata(&self) -> &MediaMetadata {
        self.reader.metadata()
    }

    /// The job options.
    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    /// Compute the video retain plan without running the job.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::NoVideoTrack`] if the source has no video.
    /// - [`ReframeError::InvalidFrameRate`] for unusable rates.
    pub fn plan(&self) -> Result<RetainPlan, ReframeError> {
        let metadata = self.reader.metadata();
        let video = metadata.video.as_ref().ok_or(ReframeError::NoVideoTrack)?;
        plan_reduction(
            self.options.selector.as_ref(),
            video.frames_per_second,
            self.options.target_frame_rate,
            metadata.duration,
        )
    }

    /// Run the job to completion and return the output path.
    ///
    /// `make_writer` is called once, after the output location is resolved
    /// and the source streams are open.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::NoVideoTrack`] before anything is opened.
    /// - [`ReframeError::InvalidOutputDirectory`], [`ReframeError::OutputExists`]
    ///   or [`ReframeError::OutputIsSource`] before any stream or writer is
    ///   opened.
    /// - [`ReframeError::SinkFailure`] if the writer fails; the partial output
    ///   is left in place.
    /// - Any error from the reader, the writer factory, or a pump.
    pub fn run<W, F>(self, make_writer: F) -> Result<PathBuf, ReframeError>
    where
        W: MediaWriter,
        W::Video: FrameSink<Frame = <R::Video as FrameStream>::Frame>,
        W::Audio: FrameSink<Frame = <R::Audio as FrameStream>::Frame>,
        F: FnOnce(&WriterContext<'_>) -> Result<W, ReframeError>,
    {
        let TranscodeJob {
            mut reader,
            options,
        } = self;

        let metadata = reader.metadata().clone();
        let video = metadata.video.as_ref().ok_or(ReframeError::NoVideoTrack)?;

        let path = options.output.resolve(options.container, options.overwrite)?;
        if let Some(source) = reader.source_path() {
            if output::is_same_file(source, &path) {
                return Err(ReframeError::OutputIsSource(path));
            }
        }
        log::info!(
            "Transcoding to {} (target_fps={:?}, selector={})",
            path.display(),
            options.target_frame_rate,
            options.selector.name(),
        );

        let plan = plan_reduction(
            options.selector.as_ref(),
            video.frames_per_second,
            options.target_frame_rate,
            metadata.duration,
        )?;
        let output_frame_rate = options
            .target_frame_rate
            .map_or(video.frames_per_second, |target| {
                target.min(video.frames_per_second)
            });
        let include_audio = options.include_audio && metadata.has_audio();

        let video_source = reader.video_stream()?;
        let audio_source = if include_audio {
            Some(reader.audio_stream()?)
        } else {
            None
        };

        let mut writer = make_writer(&WriterContext {
            path: &path,
            metadata: &metadata,
            options: &options,
            plan: &plan,
            output_frame_rate,
            include_audio,
        })?;
        let video_sink = writer.video_input()?;
        let audio_sink = if include_audio {
            Some(writer.audio_input()?)
        } else {
            None
        };

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            metadata.estimated_frame_count(),
            options.batch_size,
        );

        let reports = pump_tracks(
            (video_source, video_sink),
            audio_source.zip(audio_sink),
            &plan,
            &mut tracker,
        );

        let result = reports.and_then(|reports| {
            for report in &reports {
                log::debug!("{report:?}");
            }
            finalize(&mut writer)
        });

        match result {
            Ok(()) => {
                log::info!("Finished writing {}", path.display());
                Ok(path)
            }
            Err(error) => {
                if path.exists() {
                    log::warn!("Job failed; leaving partial output at {}", path.display());
                }
                Err(error)
            }
        }
    }

    /// Run the job and hand the outcome to `completion`.
    pub fn run_with_completion<W, F, C>(self, make_writer: F, completion: C)
    where
        W: MediaWriter,
        W::Video: FrameSink<Frame = <R::Video as FrameStream>::Frame>,
        W::Audio: FrameSink<Frame = <R::Audio as FrameStream>::Frame>,
        F: FnOnce(&WriterContext<'_>) -> Result<W, ReframeError>,
        C: FnOnce(Result<PathBuf, ReframeError>),
    {
        completion(self.run(make_writer));
    }
}

/// Run both pumps on dedicated threads and wait for one done signal per pump.
fn pump_tracks<VS, VK, AS, AK>(
    video: (VS, VK),
    audio: Option<(AS, AK)>,
    plan: &RetainPlan,
    tracker: &mut ProgressTracker,
) -> Result<Vec<PumpReport>, ReframeError>
where
    VS: FrameStream,
    VK: FrameSink<Frame = VS::Frame>,
    AS: FrameStream,
    AK: FrameSink<Frame = AS::Frame>,
{
    let (done_sender, done_receiver) = mpsc::channel();
    let pumps = if audio.is_some() { 2 } else { 1 };

    thread::scope(|scope| {
        let (mut video_source, mut video_sink) = video;
        let video_done = done_sender.clone();
        let video_handle = thread::Builder::new()
            .name("reframe-video".to_string())
            .spawn_scoped(scope, move || {
                let result = pump::pump_video(
                    &mut video_source,
                    &mut video_sink,
                    plan,
                    |timestamp| tracker.advance(timestamp),
                    || log::debug!("video pump done"),
                );
                tracker.finish();
                let _ = video_done.send((TrackKind::Video, result));
            })?;

        let audio_handle = match audio {
            Some((mut audio_source, mut audio_sink)) => {
                let audio_done = done_sender.clone();
                let passthrough = RetainPlan::passthrough();
                Some(
                    thread::Builder::new()
                        .name("reframe-audio".to_string())
                        .spawn_scoped(scope, move || {
                            let result = pump::pump_audio(
                                &mut audio_source,
                                &mut audio_sink,
                                &passthrough,
                                || log::debug!("audio pump done"),
                            );
                            let _ = audio_done.send((TrackKind::Audio, result));
                        })?,
                )
            }
            None => None,
        };
        drop(done_sender);

        let mut reports = Vec::with_capacity(pumps);
        let mut first_error = None;
        for _ in 0..pumps {
            // A closed channel means a worker died without signalling.
            let Ok((track, result)) = done_receiver.recv() else {
                break;
            };
            match result {
                Ok(report) => reports.push(report),
                Err(error) => {
                    log::error!("{track} pump failed: {error}");
                    first_error.get_or_insert(error);
                }
            }
        }

        if video_handle.join().is_err() {
            first_error.get_or_insert(ReframeError::PumpPanicked(TrackKind::Video));
        }
        if let Some(handle) = audio_handle {
            if handle.join().is_err() {
                first_error.get_or_insert(ReframeError::PumpPanicked(TrackKind::Audio));
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(reports),
        }
    })
}

fn finalize<W: MediaWriter>(writer: &mut W) -> Result<(), ReframeError> {
    writer.finish()?;
    match writer.status() {
        SinkStatus::Failed(reason) => Err(ReframeError::SinkFailure(reason)),
        _ => Ok(()),
    }
}
