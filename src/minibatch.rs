//! The minibatch output unit.

use std::ops::Range;

use ndarray::{s, Array2, Array3, Axis};

/// Fixed-shape tensors for one minibatch.
///
/// | Field | Shape |
/// |-------|-------|
/// | `features` | `[batch, feature_width, time]` |
/// | `labels` | `[batch, label_width, time]` |
/// | `features_mask` | `[batch, time]` |
/// | `labels_mask` | `[batch, time]` |
///
/// A mask entry is `1.0` where the position holds real data and `0.0` where
/// it is padding. A `None` mask means every position is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    pub features: Array3<f64>,
    pub labels: Array3<f64>,
    pub features_mask: Option<Array2<f64>>,
    pub labels_mask: Option<Array2<f64>>,
}

impl MiniBatch {
    pub fn new(
        features: Array3<f64>,
        labels: Array3<f64>,
        features_mask: Option<Array2<f64>>,
        labels_mask: Option<Array2<f64>>,
    ) -> Self {
        Self {
            features,
            labels,
            features_mask,
            labels_mask,
        }
    }

    /// Number of examples in the batch.
    #[inline]
    pub fn num_examples(&self) -> usize {
        self.features.len_of(Axis(0))
    }

    #[inline]
    pub fn feature_width(&self) -> usize {
        self.features.len_of(Axis(1))
    }

    #[inline]
    pub fn label_width(&self) -> usize {
        self.labels.len_of(Axis(1))
    }

    /// Length of the shared time axis.
    #[inline]
    pub fn time_length(&self) -> usize {
        self.features.len_of(Axis(2))
    }

    pub fn has_masks(&self) -> bool {
        self.features_mask.is_some() || self.labels_mask.is_some()
    }

    /// Whether feature position `(example, t)` holds real data.
    pub fn is_feature_valid(&self, example: usize, t: usize) -> bool {
        self.features_mask
            .as_ref()
            .map_or(true, |mask| mask[[example, t]] != 0.0)
    }

    /// Whether label position `(example, t)` holds real data.
    pub fn is_label_valid(&self, example: usize, t: usize) -> bool {
        self.labels_mask
            .as_ref()
            .map_or(true, |mask| mask[[example, t]] != 0.0)
    }

    /// Number of valid feature positions across the batch.
    pub fn valid_feature_steps(&self) -> usize {
        match &self.features_mask {
            Some(mask) => mask.iter().filter(|&&m| m != 0.0).count(),
            None => self.num_examples() * self.time_length(),
        }
    }

    /// Copy of the examples in `range`, masks included.
    ///
    /// # Panics
    ///
    /// Panics if `range` extends past `num_examples()`.
    pub fn slice_examples(&self, range: Range<usize>) -> MiniBatch {
        let rows = |mask: &Array2<f64>| mask.slice(s![range.clone(), ..]).to_owned();

        MiniBatch::new(
            self.features.slice(s![range.clone(), .., ..]).to_owned(),
            self.labels.slice(s![range.clone(), .., ..]).to_owned(),
            self.features_mask.as_ref().map(rows),
            self.labels_mask.as_ref().map(rows),
        )
    }

    /// Check that batch and time dimensions agree across all tensors.
    pub fn is_consistent(&self) -> bool {
        let (n, _, t) = self.features.dim();
        let (ln, _, lt) = self.labels.dim();
        let mask_ok = |mask: &Option<Array2<f64>>| mask.as_ref().map_or(true, |m| m.dim() == (n, t));

        n == ln && t == lt && mask_ok(&self.features_mask) && mask_ok(&self.labels_mask)
    }
}
