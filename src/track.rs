//! Per-track source and destination capabilities.
//!
//! A transcode job moves frames from a [`FrameStream`] (one decoded track of
//! the source) into a [`FrameSink`] (one input of the destination writer).
//! Both are implemented by a media backend: the FFmpeg backend when the
//! `ffmpeg` feature is enabled, or any user type.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::error::ReframeError;

/// Which track of the media a stream or sink carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// The video track.
    Video,
    /// The audio track.
    Audio,
}

impl Display for TrackKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TrackKind::Video => f.write_str("video"),
            TrackKind::Audio => f.write_str("audio"),
        }
    }
}

/// A sample that carries a presentation timestamp.
pub trait Timestamped {
    /// Presentation timestamp relative to the start of the source.
    fn timestamp(&self) -> Duration;
}

/// The decoded output of one source track.
///
/// Frames are produced in arrival order. `Ok(None)` means the track is
/// exhausted.
pub trait FrameStream: Send {
    /// The sample type this stream produces.
    type Frame: Timestamped + Send;

    /// Pull the next frame, or `None` once the track has no more frames.
    ///
    /// # Errors
    ///
    /// Backends return their own read or decode failure.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, ReframeError>;

    /// Release the stream's resources. Called once the pump is done with it.
    fn close(&mut self) {}
}

/// Destination state reported by a [`FrameSink`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SinkStatus {
    /// Accepting input.
    #[default]
    Writing,
    /// Finalized successfully.
    Completed,
    /// The destination failed; the reason is reported verbatim.
    Failed(String),
}

/// One input of a destination writer.
///
/// Sinks exert backpressure through [`is_ready_for_more`](FrameSink::is_ready_for_more).
/// A pump that finds its sink not ready parks in
/// [`wait_until_ready`](FrameSink::wait_until_ready) until the sink signals
/// readiness again, typically through a [`ReadySignal`].
pub trait FrameSink: Send {
    /// The sample type this sink accepts.
    type Frame: Send;

    /// Whether the sink can take another frame right now.
    fn is_ready_for_more(&self) -> bool;

    /// Block until the sink signals that it may be ready again.
    ///
    /// Sinks that are always ready may return immediately.
    fn wait_until_ready(&self);

    /// Append a frame. Returns `false` if the sink rejected it.
    fn append(&mut self, frame: Self::Frame) -> bool;

    /// Signal that no more frames will be appended.
    fn mark_finished(&mut self);

    /// Current destination status.
    fn status(&self) -> SinkStatus;
}

/// A readiness flag with blocking wait, for [`FrameSink`] implementations.
///
/// The consumer side of a sink calls [`set_ready`](ReadySignal::set_ready)
/// when it has room again; the pump blocks in [`wait`](ReadySignal::wait)
/// instead of polling on a timer.
#[derive(Debug)]
pub struct ReadySignal {
    ready: Mutex<bool>,
    changed: Condvar,
}

impl ReadySignal {
    /// Create a signal in the given state.
    pub fn new(ready: bool) -> Self {
        Self {
            ready: Mutex::new(ready),
            changed: Condvar::new(),
        }
    }

    /// Current readiness.
    pub fn is_ready(&self) -> bool {
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update readiness and wake any waiting pump.
    pub fn set_ready(&self, ready: bool) {
        let mut guard = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = ready;
        self.changed.notify_all();
    }

    /// Block until the signal is ready.
    pub fn wait(&self) {
        let guard = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        let _ready = self
            .changed
            .wait_while(guard, |ready| !*ready)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new(true)
    }
}
