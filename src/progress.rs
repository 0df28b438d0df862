//! Progress reporting for transcode jobs.
//!
//! The video pump reports the timestamp of every frame it pulls. A job turns
//! those reports into [`ProgressInfo`] snapshots and hands them to the
//! [`ProgressCallback`] configured on its
//! [`TranscodeOptions`](crate::TranscodeOptions), every
//! [`batch_size`](crate::TranscodeOptions::with_batch_size) frames.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use reframe::{ProgressCallback, ProgressInfo, TranscodeOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% complete");
//!         }
//!     }
//! }
//!
//! let options = TranscodeOptions::new()
//!     .with_target_frame_rate(15.0)
//!     .with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of job progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Video frames pulled from the source so far.
    pub current: u64,
    /// Estimated number of source video frames, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 to 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the pump started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Timestamp of the most recent frame.
    pub current_timestamp: Option<Duration>,
}

/// Receives progress updates while a job runs.
///
/// Callbacks are invoked from the video pump's worker thread, hence the
/// [`Send`] and [`Sync`] bounds. They observe the job but cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once more when the pump ends.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
    last_timestamp: Option<Duration>,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
            last_timestamp: None,
        }
    }

    /// Record one pulled frame and fire the callback when the batch fills.
    pub(crate) fn advance(&mut self, timestamp: Duration) {
        self.current += 1;
        self.items_since_last_report += 1;
        self.last_timestamp = Some(timestamp);

        if self.items_since_last_report >= self.batch_size {
            self.report();
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| ((self.current as f32 / t as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: self.last_timestamp,
        };

        self.callback.on_progress(&info);
    }
}
