//! Demand-driven pumps moving frames from a source track into a sink.
//!
//! A pump repeatedly waits for its [`FrameSink`] to be ready, pulls the next
//! frame from its [`FrameStream`], and either forwards or releases it
//! according to a [`RetainPlan`]. Backpressure only ever delays the pump;
//! frames are dropped by the plan alone.
//!
//! [`pump_video`] reports each frame's timestamp for progress tracking;
//! [`pump_audio`] does not.

use std::time::Duration;

use crate::error::ReframeError;
use crate::selection::RetainPlan;
use crate::track::{FrameSink, FrameStream, SinkStatus, Timestamped, TrackKind};

/// Whether a pulled frame goes to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Append the frame to the sink.
    Forward,
    /// Release the frame.
    Drop,
}

/// Per-track selection state.
///
/// `counter` is the number of frames seen so far, `selection_cursor` the
/// position in the retain list. Both only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpState {
    counter: u64,
    selection_cursor: usize,
}

impl PumpState {
    /// Fresh state for a new pump.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the fate of the next frame and advance the state.
    ///
    /// With a passthrough plan every frame is forwarded. Otherwise a frame is
    /// forwarded when its ordinal equals the retain index under the cursor;
    /// once the cursor has run past the list every frame is dropped.
    pub fn admit(&mut self, plan: &RetainPlan) -> Admission {
        let retain = plan.indices();
        let admission = if retain.is_empty() {
            Admission::Forward
        } else if retain.get(self.selection_cursor) == Some(&self.counter) {
            self.selection_cursor += 1;
            Admission::Forward
        } else {
            Admission::Drop
        };
        self.counter += 1;
        admission
    }

    /// Number of frames seen.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Position in the retain list.
    pub fn selection_cursor(&self) -> usize {
        self.selection_cursor
    }

    /// Whether every retained frame has already been forwarded.
    pub fn is_exhausted(&self, plan: &RetainPlan) -> bool {
        !plan.is_passthrough() && self.selection_cursor >= plan.len()
    }
}

/// Summary of one finished pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// Track this pump carried.
    pub track: TrackKind,
    /// Frames pulled from the source.
    pub pulled: u64,
    /// Frames appended to the sink.
    pub forwarded: u64,
    /// Frames released by the retain plan.
    pub dropped: u64,
    /// Timestamp of the last frame pulled.
    pub last_timestamp: Option<Duration>,
}

impl PumpReport {
    fn new(track: TrackKind) -> Self {
        Self {
            track,
            pulled: 0,
            forwarded: 0,
            dropped: 0,
            last_timestamp: None,
        }
    }
}

/// Pump the video track.
///
/// `on_progress` receives the timestamp of every pulled frame, forwarded or
/// not. `on_done` runs after the sink has been marked finished.
///
/// # Errors
///
/// - The source's own error if pulling a frame fails.
/// - [`ReframeError::SinkFailure`] if the sink rejects a frame or reports a
///   failed status while the pump is waiting on it.
pub fn pump_video<S, K, P, D>(
    source: &mut S,
    sink: &mut K,
    plan: &RetainPlan,
    on_progress: P,
    on_done: D,
) -> Result<PumpReport, ReframeError>
where
    S: FrameStream,
    K: FrameSink<Frame = S::Frame>,
    P: FnMut(Duration),
    D: FnOnce(),
{
    run(TrackKind::Video, source, sink, plan, on_progress, on_done)
}

/// Pump the audio track.
///
/// Identical to [`pump_video`] without progress reporting. Jobs currently
/// always pass a passthrough plan here.
///
/// # Errors
///
/// Same as [`pump_video`].
pub fn pump_audio<S, K, D>(
    source: &mut S,
    sink: &mut K,
    plan: &RetainPlan,
    on_done: D,
) -> Result<PumpReport, ReframeError>
where
    S: FrameStream,
    K: FrameSink<Frame = S::Frame>,
    D: FnOnce(),
{
    run(TrackKind::Audio, source, sink, plan, |_| {}, on_done)
}

fn run<S, K, P, D>(
    track: TrackKind,
    source: &mut S,
    sink: &mut K,
    plan: &RetainPlan,
    on_progress: P,
    on_done: D,
) -> Result<PumpReport, ReframeError>
where
    S: FrameStream,
    K: FrameSink<Frame = S::Frame>,
    P: FnMut(Duration),
    D: FnOnce(),
{
    log::debug!(
        "Starting {track} pump ({})",
        if plan.is_passthrough() {
            "passthrough".to_string()
        } else {
            format!("{} retained", plan.len())
        }
    );

    let result = drain(track, source, sink, plan, on_progress);
    source.close();

    let report = result?;
    log::debug!(
        "{track} pump finished: pulled={} forwarded={} dropped={}",
        report.pulled,
        report.forwarded,
        report.dropped,
    );
    on_done();
    Ok(report)
}

fn drain<S, K, P>(
    track: TrackKind,
    source: &mut S,
    sink: &mut K,
    plan: &RetainPlan,
    mut on_progress: P,
) -> Result<PumpReport, ReframeError>
where
    S: FrameStream,
    K: FrameSink<Frame = S::Frame>,
    P: FnMut(Duration),
{
    let mut state = PumpState::new();
    let mut report = PumpReport::new(track);

    loop {
        while !sink.is_ready_for_more() {
            if let SinkStatus::Failed(reason) = sink.status() {
                return Err(ReframeError::SinkFailure(reason));
            }
            sink.wait_until_ready();
        }

        let Some(frame) = source.next_frame()? else {
            sink.mark_finished();
            return Ok(report);
        };

        let timestamp = frame.timestamp();
        on_progress(timestamp);
        report.pulled += 1;
        report.last_timestamp = Some(timestamp);

        match state.admit(plan) {
            Admission::Forward => {
                if !sink.append(frame) {
                    return Err(rejected(sink));
                }
                report.forwarded += 1;
            }
            Admission::Drop => {
                drop(frame);
                report.dropped += 1;
                log::trace!(
                    "Dropped {track} frame {} at {:?}",
                    state.counter() - 1,
                    timestamp
                );
            }
        }
    }
}

fn rejected<K: FrameSink>(sink: &K) -> ReframeError {
    match sink.status() {
        SinkStatus::Failed(reason) => ReframeError::SinkFailure(reason),
        _ => ReframeError::SinkFailure("sink rejected appended frame".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_forwards_everything() {
        let plan = RetainPlan::passthrough();
        let mut state = PumpState::new();
        for _ in 0..5 {
            assert_eq!(state.admit(&plan), Admission::Forward);
        }
        assert!(!state.is_exhausted(&plan));
    }

    #[test]
    fn cursor_follows_retain_list() {
        let plan = RetainPlan::from_indices(vec![0, 3, 6]);
        let mut state = PumpState::new();
        let admitted: Vec<bool> = (0..10)
            .map(|_| state.admit(&plan) == Admission::Forward)
            .collect();

        assert_eq!(
            admitted,
            vec![true, false, false, true, false, false, true, false, false, false]
        );
        assert_eq!(state.counter(), 10);
        assert_eq!(state.selection_cursor(), 3);
        assert!(state.is_exhausted(&plan));
    }
}
