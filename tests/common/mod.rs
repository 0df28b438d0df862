//! In-memory readers, writers, streams, and sinks shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reframe::{
    FrameSink, FrameStream, MediaMetadata, MediaReader, MediaWriter, ReadySignal, ReframeError,
    SinkStatus, Timestamped, WriterContext,
};

/// Audio packets per second produced by [`MemoryReader`].
pub const AUDIO_PACKET_RATE: f64 = 50.0;

// ── Frames and streams ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TestFrame {
    pub index: u64,
    pub timestamp: Duration,
}

impl Timestamped for TestFrame {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

pub fn frames_at(count: u64, fps: f64) -> Vec<TestFrame> {
    (0..count)
        .map(|index| TestFrame {
            index,
            timestamp: Duration::from_secs_f64(index as f64 / fps),
        })
        .collect()
}

pub struct VecStream {
    frames: VecDeque<TestFrame>,
    fail_at: Option<u64>,
    pulled: u64,
    closed: Arc<AtomicBool>,
}

impl VecStream {
    pub fn new(frames: Vec<TestFrame>) -> Self {
        Self {
            frames: frames.into(),
            fail_at: None,
            pulled: 0,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_rate(count: u64, fps: f64) -> Self {
        Self::new(frames_at(count, fps))
    }

    /// Fail with a decode error when asked for frame `index`.
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameStream for VecStream {
    type Frame = TestFrame;

    fn next_frame(&mut self) -> Result<Option<TestFrame>, ReframeError> {
        if self.fail_at == Some(self.pulled) {
            return Err(ReframeError::SourceOpenFailure {
                path: PathBuf::from("memory"),
                reason: format!("corrupt frame {}", self.pulled),
            });
        }
        self.pulled += 1;
        Ok(self.frames.pop_front())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ── Sinks ──────────────────────────────────────────────────────────

/// What a [`RecordingSink`] saw, readable after the sink is gone.
#[derive(Debug, Default)]
pub struct SinkLog {
    received: Mutex<Vec<u64>>,
    finished: AtomicBool,
    waits: AtomicUsize,
}

impl SinkLog {
    pub fn received(&self) -> Vec<u64> {
        self.received.lock().unwrap().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

pub struct RecordingSink {
    log: Arc<SinkLog>,
    ready: Arc<ReadySignal>,
    status: Arc<Mutex<SinkStatus>>,
    reject_at: Option<usize>,
    one_at_a_time: bool,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<SinkLog>) {
        let log = Arc::new(SinkLog::default());
        let sink = Self {
            log: Arc::clone(&log),
            ready: Arc::new(ReadySignal::default()),
            status: Arc::new(Mutex::new(SinkStatus::Writing)),
            reject_at: None,
            one_at_a_time: false,
        };
        (sink, log)
    }

    /// Share readiness with a test-controlled signal.
    pub fn with_ready(mut self, ready: Arc<ReadySignal>) -> Self {
        self.ready = ready;
        self
    }

    /// Share status with a writer or the test.
    pub fn with_status(mut self, status: Arc<Mutex<SinkStatus>>) -> Self {
        self.status = status;
        self
    }

    /// Fail the `n`th append (zero-based) with a "disk full" status.
    pub fn rejecting_at(mut self, n: usize) -> Self {
        self.reject_at = Some(n);
        self
    }

    /// Drop readiness after every append until someone sets it again.
    pub fn one_at_a_time(mut self) -> Self {
        self.one_at_a_time = true;
        self
    }
}

impl FrameSink for RecordingSink {
    type Frame = TestFrame;

    fn is_ready_for_more(&self) -> bool {
        self.ready.is_ready() && *self.status.lock().unwrap() == SinkStatus::Writing
    }

    fn wait_until_ready(&self) {
        self.log.waits.fetch_add(1, Ordering::SeqCst);
        self.ready.wait();
    }

    fn append(&mut self, frame: TestFrame) -> bool {
        let mut received = self.log.received.lock().unwrap();
        if self.reject_at == Some(received.len()) {
            *self.status.lock().unwrap() = SinkStatus::Failed("disk full".to_string());
            return false;
        }
        received.push(frame.index);
        if self.one_at_a_time {
            self.ready.set_ready(false);
        }
        true
    }

    fn mark_finished(&mut self) {
        self.log.finished.store(true, Ordering::SeqCst);
    }

    fn status(&self) -> SinkStatus {
        self.status.lock().unwrap().clone()
    }
}

// ── Reader ─────────────────────────────────────────────────────────

pub struct MemoryReader {
    metadata: MediaMetadata,
    fail_video_at: Option<u64>,
    source: Option<PathBuf>,
}

impl MemoryReader {
    pub fn new(metadata: MediaMetadata) -> Self {
        Self {
            metadata,
            fail_video_at: None,
            source: None,
        }
    }

    /// Pretend the frames come from `path`.
    pub fn reading_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn failing_video_at(mut self, index: u64) -> Self {
        self.fail_video_at = Some(index);
        self
    }
}

impl MediaReader for MemoryReader {
    type Video = VecStream;
    type Audio = VecStream;

    fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn video_stream(&mut self) -> Result<VecStream, ReframeError> {
        let video = self.metadata.video.as_ref().ok_or(ReframeError::NoVideoTrack)?;
        let count = self.metadata.estimated_frame_count().unwrap_or(0);
        let stream = VecStream::with_rate(count, video.frames_per_second);
        Ok(match self.fail_video_at {
            Some(index) => stream.failing_at(index),
            None => stream,
        })
    }

    fn audio_stream(&mut self) -> Result<VecStream, ReframeError> {
        let count = (self.metadata.duration.as_secs_f64() * AUDIO_PACKET_RATE).floor() as u64;
        Ok(VecStream::with_rate(count, AUDIO_PACKET_RATE))
    }
}

// ── Writer ─────────────────────────────────────────────────────────

/// How a [`MemoryWriter`] should misbehave.
#[derive(Debug, Clone, Default)]
pub struct WriterScript {
    pub reject_video_at: Option<usize>,
    pub finish_failure: Option<String>,
}

/// What the writer factory and writer observed.
#[derive(Debug, Default)]
pub struct WriterProbe {
    pub video: Arc<SinkLog>,
    pub audio: Arc<SinkLog>,
    context: Mutex<Option<SeenContext>>,
    audio_requested: AtomicBool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeenContext {
    pub path: PathBuf,
    pub output_frame_rate: f64,
    pub include_audio: bool,
    pub retained: usize,
}

impl WriterProbe {
    pub fn context(&self) -> Option<SeenContext> {
        self.context.lock().unwrap().clone()
    }

    pub fn was_created(&self) -> bool {
        self.context().is_some()
    }

    pub fn audio_requested(&self) -> bool {
        self.audio_requested.load(Ordering::SeqCst)
    }
}

pub struct MemoryWriter {
    path: PathBuf,
    video: Option<RecordingSink>,
    audio: Option<RecordingSink>,
    status: Arc<Mutex<SinkStatus>>,
    finish_failure: Option<String>,
    probe: Arc<WriterProbe>,
}

impl MemoryWriter {
    /// A writer factory recording into a fresh probe.
    pub fn factory(
        script: WriterScript,
    ) -> (
        impl FnOnce(&WriterContext<'_>) -> Result<MemoryWriter, ReframeError> + Send + 'static,
        Arc<WriterProbe>,
    ) {
        let (video, video_log) = RecordingSink::new();
        let (audio, audio_log) = RecordingSink::new();
        let probe = Arc::new(WriterProbe {
            video: video_log,
            audio: audio_log,
            ..WriterProbe::default()
        });

        let seen = Arc::clone(&probe);
        let factory = move |context: &WriterContext<'_>| -> Result<MemoryWriter, ReframeError> {
            *seen.context.lock().unwrap() = Some(SeenContext {
                path: context.path.to_path_buf(),
                output_frame_rate: context.output_frame_rate,
                include_audio: context.include_audio,
                retained: context.plan.len(),
            });

            let status = Arc::new(Mutex::new(SinkStatus::Writing));
            let mut video = video.with_status(Arc::clone(&status));
            if let Some(n) = script.reject_video_at {
                video = video.rejecting_at(n);
            }
            Ok(MemoryWriter {
                path: context.path.to_path_buf(),
                video: Some(video),
                audio: Some(audio.with_status(Arc::clone(&status))),
                status,
                finish_failure: script.finish_failure,
                probe: seen,
            })
        };

        (factory, probe)
    }
}

impl MediaWriter for MemoryWriter {
    type Video = RecordingSink;
    type Audio = RecordingSink;

    fn video_input(&mut self) -> Result<RecordingSink, ReframeError> {
        self.video
            .take()
            .ok_or_else(|| ReframeError::SinkFailure("video input taken twice".to_string()))
    }

    fn audio_input(&mut self) -> Result<RecordingSink, ReframeError> {
        self.probe.audio_requested.store(true, Ordering::SeqCst);
        self.audio
            .take()
            .ok_or_else(|| ReframeError::SinkFailure("audio input taken twice".to_string()))
    }

    fn finish(&mut self) -> Result<(), ReframeError> {
        let mut status = self.status.lock().unwrap();
        match &self.finish_failure {
            Some(reason) => *status = SinkStatus::Failed(reason.clone()),
            None => {
                std::fs::write(&self.path, b"reframed")?;
                *status = SinkStatus::Completed;
            }
        }
        Ok(())
    }

    fn status(&self) -> SinkStatus {
        self.status.lock().unwrap().clone()
    }
}
