//! Feature normalization for assembled minibatches.
//!
//! Each feature channel (axis 1 of the feature tensor) gets its own scalar
//! [`Normalizer`]. Statistics are gathered in a fitting pass over a batch
//! iterator and then applied through the [`BatchPreProcessor`] hook.
//!
//! ```text
//! Normalizer (trait)
//!     ├── ZScoreNormalizer     normalized = (x - mean) / std
//!     └── MinMaxNormalizer     normalized = (x - min) / (max - min)
//!
//! ChannelNormalizer<N>         one N per feature channel, mask-aware
//!     ├── FeatureStandardizer  = ChannelNormalizer<ZScoreNormalizer>
//!     └── FeatureMinMaxScaler  = ChannelNormalizer<MinMaxNormalizer>
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sequence_batcher::prelude::*;
//!
//! let mut standardizer = FeatureStandardizer::standard(batcher.feature_width()?);
//! standardizer.fit(&mut batcher)?;   // full pass, then resets the batcher
//!
//! batcher.set_pre_processor(Box::new(standardizer));
//! ```

use ndarray::Axis;
use tracing::{debug, warn};

use crate::batcher::MiniBatchIterator;
use crate::error::Result;
use crate::minibatch::MiniBatch;

use super::BatchPreProcessor;

/// Scalar normalization strategy.
///
/// Implementers provide methods to:
/// 1. Update internal state with new data
/// 2. Normalize a single value
/// 3. Reset state
pub trait Normalizer {
    /// Update normalizer state with a new value.
    fn update(&mut self, value: f64);

    /// Normalize a single value.
    fn normalize(&self, value: f64) -> f64;

    /// Reset normalizer state.
    fn reset(&mut self);

    /// Check if normalizer has enough data to normalize.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Z-score normalization with running statistics.
///
/// Uses Welford's online algorithm for numerical stability.
///
/// # Example
///
/// ```
/// use sequence_batcher::preprocessing::{Normalizer, ZScoreNormalizer};
///
/// let mut normalizer = ZScoreNormalizer::new();
/// for value in &[10.0, 20.0, 30.0, 40.0, 50.0] {
///     normalizer.update(*value);
/// }
///
/// // mean = 30, std ≈ 14.14
/// assert!((normalizer.normalize(50.0) - 1.414).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct ZScoreNormalizer {
    mean: f64,
    m2: f64,
    count: u64,
    /// Floor for the standard deviation (constant channels)
    min_std: f64,
}

impl ZScoreNormalizer {
    pub fn new() -> Self {
        Self {
            mean: 0.0,
            m2: 0.0,
            count: 0,
            min_std: 1e-8,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation (1.0 until two samples were seen).
    pub fn std(&self) -> f64 {
        if self.count < 2 {
            return 1.0;
        }
        (self.m2 / (self.count as f64)).sqrt().max(self.min_std)
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for ZScoreNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for ZScoreNormalizer {
    fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (value - self.mean) / self.std()
    }

    fn reset(&mut self) {
        self.mean = 0.0;
        self.m2 = 0.0;
        self.count = 0;
    }

    fn is_ready(&self) -> bool {
        self.count >= 2
    }
}

/// Min-max normalization to `[0, 1]` or `[-1, 1]`.
///
/// Bounds are either fixed up front ([`MinMaxNormalizer::with_bounds`]) or
/// learned from the values passed to [`Normalizer::update`]. Values outside
/// the bounds are clamped.
///
/// # Example
///
/// ```
/// use sequence_batcher::preprocessing::{MinMaxNormalizer, Normalizer};
///
/// let normalizer = MinMaxNormalizer::with_bounds(0.0, 100.0, false);
///
/// assert_eq!(normalizer.normalize(0.0), 0.0);
/// assert_eq!(normalizer.normalize(50.0), 0.5);
/// assert_eq!(normalizer.normalize(150.0), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct MinMaxNormalizer {
    min: f64,
    max: f64,
    symmetric: bool, // If true, normalize to [-1, 1], else [0, 1]
}

impl MinMaxNormalizer {
    /// Normalizer whose bounds are learned from data.
    pub fn new(symmetric: bool) -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            symmetric,
        }
    }

    /// Normalizer with fixed bounds.
    ///
    /// # Panics
    ///
    /// Panics if `max <= min`.
    pub fn with_bounds(min: f64, max: f64, symmetric: bool) -> Self {
        assert!(max > min, "max must be greater than min");
        Self { min, max, symmetric }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Default for MinMaxNormalizer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Normalizer for MinMaxNormalizer {
    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn normalize(&self, value: f64) -> f64 {
        // Constant or unseen channel maps to the range midpoint
        if !(self.max > self.min) {
            return if self.symmetric { 0.0 } else { 0.5 };
        }

        let clamped = value.clamp(self.min, self.max);
        let normalized = (clamped - self.min) / (self.max - self.min);

        if self.symmetric {
            2.0 * normalized - 1.0
        } else {
            normalized
        }
    }

    fn reset(&mut self) {
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    fn is_ready(&self) -> bool {
        self.max >= self.min
    }
}

// =============================================================================
// Per-Channel Normalizer
// =============================================================================

/// One normalizer per feature channel, applied to minibatch feature tensors.
///
/// Padded positions (feature mask `0.0`) neither contribute to statistics nor
/// get rewritten, so padding stays exactly zero.
#[derive(Debug, Clone)]
pub struct ChannelNormalizer<N> {
    channels: Vec<N>,
}

/// Per-feature z-score standardization.
pub type FeatureStandardizer = ChannelNormalizer<ZScoreNormalizer>;

/// Per-feature min-max scaling.
pub type FeatureMinMaxScaler = ChannelNormalizer<MinMaxNormalizer>;

impl<N: Normalizer> ChannelNormalizer<N> {
    /// Build `feature_width` channel normalizers with `make`.
    pub fn from_fn(feature_width: usize, make: impl Fn() -> N) -> Self {
        Self {
            channels: (0..feature_width).map(|_| make()).collect(),
        }
    }

    pub fn feature_width(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&N> {
        self.channels.get(index)
    }

    /// Whether every channel has enough data to normalize.
    pub fn is_ready(&self) -> bool {
        self.channels.iter().all(Normalizer::is_ready)
    }

    /// Update channel statistics from the valid positions of one batch.
    pub fn fit_batch(&mut self, batch: &MiniBatch) {
        if !self.width_matches(batch) {
            return;
        }

        for (i, example) in batch.features.axis_iter(Axis(0)).enumerate() {
            for (channel, series) in self.channels.iter_mut().zip(example.axis_iter(Axis(0))) {
                for (t, &value) in series.iter().enumerate() {
                    if batch.is_feature_valid(i, t) {
                        channel.update(value);
                    }
                }
            }
        }
    }

    /// Fit from every remaining batch of `iter`, then reset it.
    pub fn fit<I: MiniBatchIterator + ?Sized>(&mut self, iter: &mut I) -> Result<()> {
        let mut batches = 0usize;
        while iter.has_next() {
            let batch = iter.next_batch()?;
            self.fit_batch(&batch);
            batches += 1;
        }
        iter.reset();

        debug!(
            batches,
            channels = self.channels.len(),
            "fitted feature normalizer"
        );
        Ok(())
    }

    /// Reset every channel.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    fn width_matches(&self, batch: &MiniBatch) -> bool {
        if batch.feature_width() != self.channels.len() {
            warn!(
                expected = self.channels.len(),
                actual = batch.feature_width(),
                "feature width mismatch, batch left unnormalized"
            );
            return false;
        }
        true
    }
}

impl FeatureStandardizer {
    /// Standardizer with unfitted z-score channels.
    pub fn standard(feature_width: usize) -> Self {
        Self::from_fn(feature_width, ZScoreNormalizer::new)
    }
}

impl FeatureMinMaxScaler {
    /// Scaler with unfitted min-max channels.
    pub fn min_max(feature_width: usize, symmetric: bool) -> Self {
        Self::from_fn(feature_width, || MinMaxNormalizer::new(symmetric))
    }
}

impl<N: Normalizer> BatchPreProcessor for ChannelNormalizer<N> {
    fn pre_process(&mut self, batch: &mut MiniBatch) {
        if !self.width_matches(batch) {
            return;
        }

        let MiniBatch {
            features,
            features_mask,
            ..
        } = batch;

        for (i, mut example) in features.axis_iter_mut(Axis(0)).enumerate() {
            for (channel, mut series) in self.channels.iter().zip(example.axis_iter_mut(Axis(0))) {
                for (t, value) in series.iter_mut().enumerate() {
                    let valid = features_mask.as_ref().map_or(true, |m| m[[i, t]] != 0.0);
                    if valid {
                        *value = channel.normalize(*value);
                    }
                }
            }
        }
    }
}
