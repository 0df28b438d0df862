//! Async transcode jobs.
//!
//! [`TranscodeJob::run_async`] moves the job onto Tokio's blocking pool via
//! `tokio::task::spawn_blocking` and returns a [`TranscodeFuture`]. The
//! pumps still run on their own worker threads; the future only resolves
//! once both have finished and the writer is finalized.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), reframe::ReframeError> {
//! use reframe::{FfmpegReader, TranscodeJob, TranscodeOptions};
//!
//! let reader = FfmpegReader::open("input.mp4")?;
//! let make_writer = reader.writer_factory();
//! let options = TranscodeOptions::new().with_target_frame_rate(10.0);
//! let output = TranscodeJob::new(reader, options)
//!     .run_async(make_writer)
//!     .await?;
//! println!("wrote {}", output.display());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::ReframeError;
use crate::job::{MediaReader, MediaWriter, TranscodeJob, WriterContext};
use crate::track::{FrameSink, FrameStream};

/// A future that resolves to the output path of a transcode job.
///
/// Dropping the future does not stop the job; the blocking task runs to
/// completion and its result is discarded.
pub struct TranscodeFuture {
    handle: JoinHandle<Result<PathBuf, ReframeError>>,
}

impl Future for TranscodeFuture {
    type Output = Result<PathBuf, ReframeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|error| Err(ReframeError::JobAborted(error.to_string()))))
    }
}

impl<R> TranscodeJob<R>
where
    R: MediaReader + Send + 'static,
{
    /// Run the job on Tokio's blocking pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run_async<W, F>(self, make_writer: F) -> TranscodeFuture
    where
        W: MediaWriter,
        W::Video: FrameSink<Frame = <R::Video as FrameStream>::Frame>,
        W::Audio: FrameSink<Frame = <R::Audio as FrameStream>::Frame>,
        F: FnOnce(&WriterContext<'_>) -> Result<W, ReframeError> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(move || self.run(make_writer));
        TranscodeFuture { handle }
    }
}
