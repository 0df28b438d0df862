//! Frame selection for frame-rate reduction.
//!
//! A [`FrameSelector`] decides which source frames survive when a video is
//! re-timed to a lower frame rate. Given the original rate, the target rate,
//! and the duration, it returns the zero-based indices (in arrival order) of
//! the frames to keep; every other frame is dropped by the pump.
//!
//! Two strategies ship with the crate:
//!
//! - [`EvenlySpaced`]: deterministic, keeps `floor(original * i / target)`.
//!   This is the default.
//! - [`RandomizedWithinBucket`]: splits the source into `target` buckets and
//!   keeps one random frame per bucket. The first frame is always kept.
//!
//! Any type implementing [`FrameSelector`] can be plugged into
//! [`TranscodeOptions::with_selector`](crate::TranscodeOptions::with_selector).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use reframe::{EvenlySpaced, FrameSelector};
//!
//! let indices = EvenlySpaced.select(30.0, 10.0, Duration::from_secs(2))?;
//! assert_eq!(indices.len(), 20);
//! assert_eq!(&indices[..4], &[0, 3, 6, 9]);
//! # Ok::<(), reframe::ReframeError>(())
//! ```

use std::fmt::Debug;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ReframeError;

/// Source and target frame counts for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounts {
    /// `floor(original_fps * duration)`.
    pub original: u64,
    /// `floor(duration * target_fps)`.
    pub target: u64,
}

impl FrameCounts {
    /// Compute the frame counts for a reduction.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::InvalidFrameRate`] if either rate is not a positive,
    ///   finite number.
    /// - [`ReframeError::InvalidDuration`] if `duration_seconds` is negative
    ///   or not finite.
    pub fn from_secs_f64(
        original_fps: f64,
        target_fps: f64,
        duration_seconds: f64,
    ) -> Result<Self, ReframeError> {
        validate_frame_rate(original_fps)?;
        validate_frame_rate(target_fps)?;
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(ReframeError::InvalidDuration(duration_seconds));
        }

        Ok(Self {
            original: (original_fps * duration_seconds).floor() as u64,
            target: (duration_seconds * target_fps).floor() as u64,
        })
    }

    /// Same as [`from_secs_f64`](FrameCounts::from_secs_f64) for a [`Duration`].
    pub fn new(
        original_fps: f64,
        target_fps: f64,
        duration: Duration,
    ) -> Result<Self, ReframeError> {
        Self::from_secs_f64(original_fps, target_fps, duration.as_secs_f64())
    }
}

/// A frame-rate reduction strategy.
///
/// Implementations only provide [`select_indices`](FrameSelector::select_indices);
/// precondition checks and the "no reduction" short-circuit live in the
/// provided [`select`](FrameSelector::select).
pub trait FrameSelector: Debug + Send + Sync {
    /// Pick `counts.target` source indices out of `counts.original` frames.
    ///
    /// The result must have exactly `counts.target` entries.
    fn select_indices(&self, counts: FrameCounts) -> Vec<u64>;

    /// Short name used in logs and the CLI.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Select the frames to retain when going from `original_fps` to
    /// `target_fps` over `duration`.
    ///
    /// Returns an empty list when `target_fps >= original_fps`: there is
    /// nothing to drop and callers must pass every frame through.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::InvalidFrameRate`] if either rate is not a
    /// positive, finite number.
    fn select(
        &self,
        original_fps: f64,
        target_fps: f64,
        duration: Duration,
    ) -> Result<Vec<u64>, ReframeError> {
        let counts = FrameCounts::new(original_fps, target_fps, duration)?;
        if target_fps >= original_fps {
            return Ok(Vec::new());
        }
        Ok(self.select_indices(counts))
    }
}

/// Keeps frames at evenly spaced source positions.
///
/// Output `i` is `floor(original * i / target)`. Deterministic and strictly
/// increasing whenever `target <= original`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvenlySpaced;

impl FrameSelector for EvenlySpaced {
    fn select_indices(&self, counts: FrameCounts) -> Vec<u64> {
        let FrameCounts { original, target } = counts;
        (0..target)
            .map(|i| floor_ratio(original, i, target))
            .collect()
    }

    fn name(&self) -> &'static str {
        "even"
    }
}

/// Keeps one randomly chosen frame per bucket.
///
/// The source is partitioned with boundaries
/// `ceil(original * (i + 1) / target)`. Every bucket after the first
/// contributes one index drawn uniformly from
/// `[previous_boundary, boundary)`. Slot 0 is always index `0`, so the very
/// first frame is never dropped; bucket 0 itself is never sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomizedWithinBucket {
    seed: Option<u64>,
}

impl RandomizedWithinBucket {
    /// Create a selector seeded from the operating system's entropy source.
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Create a selector that produces the same picks on every run.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl FrameSelector for RandomizedWithinBucket {
    fn select_indices(&self, counts: FrameCounts) -> Vec<u64> {
        let FrameCounts { original, target } = counts;
        let mut frames = vec![0_u64; target as usize];
        if target <= 1 {
            return frames;
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut previous = ceil_ratio(original, 1, target);
        for i in 1..target {
            let boundary = ceil_ratio(original, i + 1, target);
            frames[i as usize] = if previous < boundary {
                rng.gen_range(previous..boundary)
            } else {
                // Only reachable when target exceeds original.
                previous.min(original.saturating_sub(1))
            };
            previous = boundary;
        }

        frames
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// The retain list handed to a pump.
///
/// An empty plan means "no reduction": the pump forwards every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainPlan {
    indices: Vec<u64>,
}

impl RetainPlan {
    /// A plan that forwards every frame.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Build a plan from selector output.
    ///
    /// Indices are sorted and deduplicated so that strategies returning
    /// unordered picks still produce a usable plan.
    pub fn from_indices(mut indices: Vec<u64>) -> Self {
        let before = indices.len();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() != before {
            log::debug!(
                "Dropped {} duplicate retain indices",
                before - indices.len()
            );
        }
        Self { indices }
    }

    /// Whether this plan forwards every frame.
    pub fn is_passthrough(&self) -> bool {
        self.indices.is_empty()
    }

    /// The retained source indices, strictly increasing.
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// Number of frames the plan retains (zero for passthrough).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Same as [`is_passthrough`](RetainPlan::is_passthrough).
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Compute the retain plan for a video track.
///
/// `target_fps` of `None` (or one at or above the source rate) yields a
/// passthrough plan without invoking the selector.
///
/// # Errors
///
/// Returns [`ReframeError::InvalidFrameRate`] if a rate is not a positive,
/// finite number.
pub fn plan_reduction(
    selector: &dyn FrameSelector,
    original_fps: f64,
    target_fps: Option<f64>,
    duration: Duration,
) -> Result<RetainPlan, ReframeError> {
    let Some(target_fps) = target_fps else {
        return Ok(RetainPlan::passthrough());
    };
    validate_frame_rate(original_fps)?;
    validate_frame_rate(target_fps)?;

    if target_fps >= original_fps {
        log::debug!(
            "Target rate {target_fps} >= source rate {original_fps}; keeping every frame"
        );
        return Ok(RetainPlan::passthrough());
    }

    let indices = selector.select(original_fps, target_fps, duration)?;
    log::debug!(
        "Planned {} retained frames ({} selector, {original_fps} -> {target_fps} fps over {:?})",
        indices.len(),
        selector.name(),
        duration,
    );
    Ok(RetainPlan::from_indices(indices))
}

fn validate_frame_rate(fps: f64) -> Result<(), ReframeError> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(ReframeError::InvalidFrameRate(fps))
    }
}

/// `floor(a * b / c)` without intermediate overflow.
fn floor_ratio(a: u64, b: u64, c: u64) -> u64 {
    ((a as u128 * b as u128) / c as u128) as u64
}

/// `ceil(a * b / c)` without intermediate overflow.
fn ceil_ratio(a: u64, b: u64, c: u64) -> u64 {
    let product = a as u128 * b as u128;
    product.div_ceil(c as u128) as u64
}
