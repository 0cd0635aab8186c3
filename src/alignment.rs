//! Alignment engine: per-example arrays to batch tensors.
//!
//! Examples in a batch may have different lengths, and within one example the
//! feature span and the label span may differ (many-to-one or one-to-many
//! framing). The alignment mode decides where each span sits on the shared
//! time axis and which positions are marked as padding.
//!
//! # Modes
//!
//! ```text
//! EQUAL_LENGTH   F: |########|      every span has the same length, no masks
//!                L: |########|
//!
//! ALIGN_START    F: |#####...|      spans start at t = 0, padding trails
//!                L: |##......|
//!
//! ALIGN_END      F: |#####...|      the shorter span ends where the longer
//!                L: |...##...|      span ends; padding after the longer span
//! ```
//!
//! The placement math is kept in pure functions ([`AlignmentMode::placement`],
//! [`padding_ranges`]) so it can be checked without allocating tensors.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use ndarray::{s, Array2, Array3, ArrayViewMut1};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BatchError, Result};
use crate::extract::ExampleArrays;
use crate::minibatch::MiniBatch;

// ============================================================================
// Alignment Mode
// ============================================================================

/// Policy for positioning variable-length spans on the batch time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentMode {
    /// All feature and label spans share one length. No padding, no masks.
    #[default]
    EqualLength,

    /// Every span starts at time index 0; padding trails.
    AlignStart,

    /// Feature and label spans of an example end at the same time index.
    AlignEnd,
}

impl AlignmentMode {
    pub const ALL: [AlignmentMode; 3] = [
        AlignmentMode::EqualLength,
        AlignmentMode::AlignStart,
        AlignmentMode::AlignEnd,
    ];

    /// Canonical name (`EQUAL_LENGTH`, `ALIGN_START`, `ALIGN_END`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentMode::EqualLength => "EQUAL_LENGTH",
            AlignmentMode::AlignStart => "ALIGN_START",
            AlignmentMode::AlignEnd => "ALIGN_END",
        }
    }

    /// Whether this mode produces mask tensors.
    #[inline]
    pub fn uses_masks(&self) -> bool {
        !matches!(self, AlignmentMode::EqualLength)
    }

    /// Where an example with feature length `f` and label length `l` is placed.
    ///
    /// # Example
    ///
    /// ```
    /// use sequence_batcher::alignment::AlignmentMode;
    ///
    /// // Many-to-one: 5 feature steps, one label at the end
    /// let p = AlignmentMode::AlignEnd.placement(5, 1);
    /// assert_eq!(p.features, 0..5);
    /// assert_eq!(p.labels, 4..5);
    /// ```
    pub fn placement(&self, f: usize, l: usize) -> Placement {
        match self {
            AlignmentMode::EqualLength | AlignmentMode::AlignStart => Placement {
                features: 0..f,
                labels: 0..l,
            },
            AlignmentMode::AlignEnd => {
                if f >= l {
                    Placement {
                        features: 0..f,
                        labels: (f - l)..f,
                    }
                } else {
                    Placement {
                        features: (l - f)..l,
                        labels: 0..l,
                    }
                }
            }
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentMode {
    type Err = BatchError;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "EQUAL_LENGTH" => Ok(AlignmentMode::EqualLength),
            "ALIGN_START" => Ok(AlignmentMode::AlignStart),
            "ALIGN_END" => Ok(AlignmentMode::AlignEnd),
            _ => Err(BatchError::unsupported_alignment(s)),
        }
    }
}

/// Accepts the same spellings as [`FromStr`].
impl<'de> Deserialize<'de> for AlignmentMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Placement Math
// ============================================================================

/// Valid time ranges of one example's feature and label spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub features: Range<usize>,
    pub labels: Range<usize>,
}

impl Placement {
    /// Last time index (exclusive) touched by either span.
    #[inline]
    pub fn end(&self) -> usize {
        self.features.end.max(self.labels.end)
    }
}

/// Padding around a valid span on an axis of `time_length` steps.
///
/// Returns the leading and trailing padding ranges; either may be empty.
///
/// ```
/// use sequence_batcher::alignment::padding_ranges;
///
/// assert_eq!(padding_ranges(&(2..4), 6), (0..2, 4..6));
/// assert_eq!(padding_ranges(&(0..6), 6), (0..0, 6..6));
/// ```
pub fn padding_ranges(valid: &Range<usize>, time_length: usize) -> (Range<usize>, Range<usize>) {
    (0..valid.start, valid.end..time_length)
}

/// Zero the padding positions of one mask row. The row starts all-ones.
fn mask_padding(mut row: ArrayViewMut1<'_, f64>, valid: &Range<usize>) {
    let (leading, trailing) = padding_ranges(valid, row.len());
    row.slice_mut(s![leading]).fill(0.0);
    row.slice_mut(s![trailing]).fill(0.0);
}

// ============================================================================
// Batch Assembly
// ============================================================================

/// Shared time length of a batch under `mode`.
///
/// `EQUAL_LENGTH` requires every feature span and every label span to have the
/// same length and fails with [`BatchError::LengthMismatch`] otherwise. The
/// other modes use the longest span in the batch.
pub fn resolve_time_length(mode: AlignmentMode, examples: &[ExampleArrays]) -> Result<usize> {
    let first = examples.first().ok_or(BatchError::EmptyBatch)?;

    match mode {
        AlignmentMode::EqualLength => {
            let expected = first.feature_len();
            for (i, example) in examples.iter().enumerate() {
                if example.feature_len() != expected {
                    return Err(BatchError::LengthMismatch {
                        example: i,
                        kind: "feature",
                        expected,
                        actual: example.feature_len(),
                    });
                }
                if example.label_len() != expected {
                    return Err(BatchError::LengthMismatch {
                        example: i,
                        kind: "label",
                        expected,
                        actual: example.label_len(),
                    });
                }
            }
            Ok(expected)
        }
        AlignmentMode::AlignStart | AlignmentMode::AlignEnd => Ok(examples
            .iter()
            .map(|e| e.feature_len().max(e.label_len()))
            .max()
            .unwrap_or(0)),
    }
}

/// Vector width shared by every non-empty array.
///
/// Zero-length arrays carry no data and are exempt; if every array is empty
/// the first one's width is used.
fn batch_width<'a, I>(arrays: I, kind: &'static str) -> Result<usize>
where
    I: Iterator<Item = &'a Array2<f64>> + Clone,
{
    let expected = arrays
        .clone()
        .find(|a| a.nrows() > 0)
        .or_else(|| arrays.clone().next())
        .map_or(0, |a| a.ncols());

    for (i, array) in arrays.enumerate() {
        if array.nrows() > 0 && array.ncols() != expected {
            return Err(BatchError::WidthMismatch {
                example: i,
                kind,
                expected,
                actual: array.ncols(),
            });
        }
    }

    Ok(expected)
}

/// Copy a `[time, width]` array into `[example, .., span]` of a batch tensor.
fn place(tensor: &mut Array3<f64>, example: usize, span: &Range<usize>, data: &Array2<f64>) {
    if span.is_empty() {
        return;
    }
    tensor
        .slice_mut(s![example, .., span.clone()])
        .assign(&data.t());
}

/// Assemble a [`MiniBatch`] from per-example arrays.
///
/// # Errors
///
/// - [`BatchError::EmptyBatch`] when `examples` is empty
/// - [`BatchError::LengthMismatch`] under `EQUAL_LENGTH` with differing spans
/// - [`BatchError::WidthMismatch`] when vector widths differ between examples
///
/// # Example
///
/// ```
/// use ndarray::Array2;
/// use sequence_batcher::alignment::{align_batch, AlignmentMode};
/// use sequence_batcher::extract::ExampleArrays;
///
/// let examples = vec![
///     ExampleArrays::new(Array2::ones((3, 4)), Array2::ones((1, 2))),
///     ExampleArrays::new(Array2::ones((5, 4)), Array2::ones((1, 2))),
/// ];
/// let batch = align_batch(AlignmentMode::AlignEnd, &examples).unwrap();
///
/// assert_eq!(batch.features.dim(), (2, 4, 5));
/// let labels_mask = batch.labels_mask.unwrap();
/// assert_eq!(labels_mask.row(0).to_vec(), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
/// ```
pub fn align_batch(mode: AlignmentMode, examples: &[ExampleArrays]) -> Result<MiniBatch> {
    let time_length = resolve_time_length(mode, examples)?;
    let feature_width = batch_width(examples.iter().map(|e| &e.features), "feature")?;
    let label_width = batch_width(examples.iter().map(|e| &e.labels), "label")?;
    let n = examples.len();

    let mut features = Array3::<f64>::zeros((n, feature_width, time_length));
    let mut labels = Array3::<f64>::zeros((n, label_width, time_length));
    let mut masks = if mode.uses_masks() {
        Some((
            Array2::<f64>::ones((n, time_length)),
            Array2::<f64>::ones((n, time_length)),
        ))
    } else {
        None
    };

    for (i, example) in examples.iter().enumerate() {
        let placement = mode.placement(example.feature_len(), example.label_len());

        place(&mut features, i, &placement.features, &example.features);
        place(&mut labels, i, &placement.labels, &example.labels);

        if let Some((features_mask, labels_mask)) = masks.as_mut() {
            mask_padding(features_mask.row_mut(i), &placement.features);
            mask_padding(labels_mask.row_mut(i), &placement.labels);
        }
    }

    let (features_mask, labels_mask) = match masks {
        Some((f, l)) => (Some(f), Some(l)),
        None => (None, None),
    };

    Ok(MiniBatch::new(features, labels, features_mask, labels_mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Example whose feature value at step t is `base + t`, label value `-(base + t)`.
    fn example(f_len: usize, l_len: usize, width: usize, base: f64) -> ExampleArrays {
        let features = Array2::from_shape_fn((f_len, width), |(t, _)| base + t as f64);
        let labels = Array2::from_shape_fn((l_len, 1), |(t, _)| -(base + t as f64));
        ExampleArrays::new(features, labels)
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&AlignmentMode::AlignStart).unwrap();
        assert_eq!(json, "\"ALIGN_START\"");

        let mode: AlignmentMode = serde_json::from_str("\"align_end\"").unwrap();
        assert_eq!(mode, AlignmentMode::AlignEnd);
        assert!(serde_json::from_str::<AlignmentMode>("\"ALIGN_MIDDLE\"").is_err());
    }

    #[test]
    fn test_mode_names_roundtrip() {
        for mode in AlignmentMode::ALL {
            assert_eq!(mode.to_string().parse::<AlignmentMode>().unwrap(), mode);
        }
        assert_eq!(
            "align-end".parse::<AlignmentMode>().unwrap(),
            AlignmentMode::AlignEnd
        );
        assert!(matches!(
            "ALIGN_MIDDLE".parse::<AlignmentMode>(),
            Err(BatchError::UnsupportedAlignment { .. })
        ));
        assert_eq!(AlignmentMode::default(), AlignmentMode::EqualLength);
    }

    #[test]
    fn test_placement_align_start() {
        let p = AlignmentMode::AlignStart.placement(3, 5);
        assert_eq!(p.features, 0..3);
        assert_eq!(p.labels, 0..5);
        assert_eq!(p.end(), 5);
    }

    #[test]
    fn test_placement_align_end_features_longer() {
        let p = AlignmentMode::AlignEnd.placement(6, 2);
        assert_eq!(p.features, 0..6);
        assert_eq!(p.labels, 4..6);

        // Label padding within an axis of 8
        assert_eq!(padding_ranges(&p.labels, 8), (0..4, 6..8));
        assert_eq!(padding_ranges(&p.features, 8), (0..0, 6..8));
    }

    #[test]
    fn test_placement_align_end_labels_longer() {
        let p = AlignmentMode::AlignEnd.placement(2, 6);
        assert_eq!(p.features, 4..6);
        assert_eq!(p.labels, 0..6);

        assert_eq!(padding_ranges(&p.features, 7), (0..4, 6..7));
        assert_eq!(padding_ranges(&p.labels, 7), (0..0, 6..7));
    }

    #[test]
    fn test_placement_align_end_equal_spans() {
        let p = AlignmentMode::AlignEnd.placement(4, 4);
        assert_eq!(p.features, 0..4);
        assert_eq!(p.labels, 0..4);
    }

    #[test]
    fn test_equal_length_no_masks() {
        let examples = vec![example(4, 4, 2, 0.0), example(4, 4, 2, 10.0)];
        let batch = align_batch(AlignmentMode::EqualLength, &examples).unwrap();

        assert_eq!(batch.features.dim(), (2, 2, 4));
        assert_eq!(batch.labels.dim(), (2, 1, 4));
        assert!(batch.features_mask.is_none());
        assert!(batch.labels_mask.is_none());
        assert_eq!(batch.features[[1, 0, 3]], 13.0);
        assert_eq!(batch.labels[[0, 0, 2]], -2.0);
    }

    #[test]
    fn test_equal_length_mismatch_fails_fast() {
        let examples = vec![example(4, 4, 2, 0.0), example(3, 3, 2, 0.0)];
        let err = align_batch(AlignmentMode::EqualLength, &examples).unwrap_err();
        assert!(matches!(
            err,
            BatchError::LengthMismatch {
                example: 1,
                kind: "feature",
                expected: 4,
                actual: 3
            }
        ));

        let examples = vec![example(4, 1, 2, 0.0)];
        let err = align_batch(AlignmentMode::EqualLength, &examples).unwrap_err();
        assert!(matches!(err, BatchError::LengthMismatch { kind: "label", .. }));
    }

    #[test]
    fn test_align_start_masks_and_values() {
        let examples = vec![example(2, 2, 3, 0.0), example(4, 3, 3, 100.0)];
        let batch = align_batch(AlignmentMode::AlignStart, &examples).unwrap();

        assert_eq!(batch.time_length(), 4);
        let fm = batch.features_mask.as_ref().unwrap();
        let lm = batch.labels_mask.as_ref().unwrap();

        assert_eq!(fm.row(0).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(lm.row(0).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(fm.row(1).to_vec(), vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(lm.row(1).to_vec(), vec![1.0, 1.0, 1.0, 0.0]);

        // Data at the start, zeros in the padding
        assert_eq!(batch.features[[0, 2, 1]], 1.0);
        assert_eq!(batch.features[[0, 2, 2]], 0.0);
        assert_eq!(batch.labels[[1, 0, 2]], -102.0);
        assert_eq!(batch.labels[[1, 0, 3]], 0.0);
    }

    #[test]
    fn test_align_end_features_longer() {
        // F = 5, L = 2 in a batch whose time length is 6
        let examples = vec![example(5, 2, 1, 0.0), example(6, 6, 1, 0.0)];
        let batch = align_batch(AlignmentMode::AlignEnd, &examples).unwrap();

        let fm = batch.features_mask.as_ref().unwrap();
        let lm = batch.labels_mask.as_ref().unwrap();

        assert_eq!(fm.row(0).to_vec(), vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(lm.row(0).to_vec(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);

        // Labels right-aligned to the end of the feature span
        assert_eq!(batch.labels[[0, 0, 3]], -0.0);
        assert_eq!(batch.labels[[0, 0, 4]], -1.0);
        assert_eq!(batch.features[[0, 0, 4]], 4.0);
    }

    #[test]
    fn test_align_end_labels_longer() {
        // F = 2, L = 4 in a batch whose time length is 5
        let examples = vec![example(2, 4, 1, 10.0), example(5, 5, 1, 0.0)];
        let batch = align_batch(AlignmentMode::AlignEnd, &examples).unwrap();

        let fm = batch.features_mask.as_ref().unwrap();
        let lm = batch.labels_mask.as_ref().unwrap();

        assert_eq!(fm.row(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(lm.row(0).to_vec(), vec![1.0, 1.0, 1.0, 1.0, 0.0]);

        assert_eq!(batch.features[[0, 0, 1]], 0.0);
        assert_eq!(batch.features[[0, 0, 2]], 10.0);
        assert_eq!(batch.features[[0, 0, 3]], 11.0);
        assert_eq!(batch.labels[[0, 0, 0]], -10.0);
    }

    #[test]
    fn test_align_end_many_to_one_scenario() {
        // Batch of 2: feature lengths 3 and 5, width 4, labels spanning 5 steps
        let examples = vec![example(3, 5, 4, 0.0), example(5, 5, 4, 0.0)];
        let batch = align_batch(AlignmentMode::AlignEnd, &examples).unwrap();

        assert_eq!(batch.time_length(), 5);
        let fm = batch.features_mask.as_ref().unwrap();
        assert_eq!(fm.row(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(fm.row(1).to_vec(), vec![1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(batch.features[[0, 3, 2]], 0.0);
        assert_eq!(batch.features[[0, 3, 4]], 2.0);
    }

    #[test]
    fn test_zero_length_example_is_padding() {
        let examples = vec![
            ExampleArrays::new(Array2::zeros((0, 0)), Array2::zeros((0, 1))),
            example(3, 3, 2, 1.0),
        ];
        let batch = align_batch(AlignmentMode::AlignStart, &examples).unwrap();

        assert_eq!(batch.features.dim(), (2, 2, 3));
        let fm = batch.features_mask.as_ref().unwrap();
        assert_eq!(fm.row(0).to_vec(), vec![0.0, 0.0, 0.0]);

        let err = align_batch(AlignmentMode::EqualLength, &examples).unwrap_err();
        assert!(matches!(err, BatchError::LengthMismatch { .. }));
    }

    #[test]
    fn test_width_mismatch() {
        let examples = vec![example(2, 2, 3, 0.0), example(2, 2, 4, 0.0)];
        let err = align_batch(AlignmentMode::AlignStart, &examples).unwrap_err();
        assert!(matches!(
            err,
            BatchError::WidthMismatch {
                example: 1,
                kind: "feature",
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(
            align_batch(AlignmentMode::AlignStart, &[]),
            Err(BatchError::EmptyBatch)
        ));
    }
}
