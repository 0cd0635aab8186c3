//! Sequence extraction: raw field tuples to 2-D numeric arrays.
//!
//! Every array produced here is laid out `[time_step, width]`. The alignment
//! engine later transposes each example into the `[channel, time]` slot of the
//! batch tensor.
//!
//! # Label Encodings
//!
//! | Encoding | Label width | Per-step input |
//! |----------|-------------|----------------|
//! | Regression | fields in the label step (1 in single-source mode) | raw values |
//! | OneHot | `num_classes` | one class index |
//!
//! # Example
//!
//! ```
//! use sequence_batcher::extract::{LabelEncoding, SequenceExtractor};
//! use sequence_batcher::record::Sequence;
//!
//! let extractor = SequenceExtractor::new(LabelEncoding::OneHot { num_classes: 3 });
//!
//! // Label column first, two features after it
//! let seq = Sequence::from_rows(vec![vec![2.0, 0.1, 0.2], vec![0.0, 0.3, 0.4]]);
//! let example = extractor.split(&seq, 0).unwrap();
//!
//! assert_eq!(example.features.dim(), (2, 2));
//! assert_eq!(example.labels.dim(), (2, 3));
//! assert_eq!(example.labels[[0, 2]], 1.0);
//! ```

use ndarray::{Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use crate::error::{BatchError, Result};
use crate::record::{FieldValue, Sequence, TimeStep};

/// How label fields become label vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelEncoding {
    /// Copy label fields as-is.
    Regression,
    /// Expand a class index into a one-hot row of `num_classes` entries.
    OneHot { num_classes: usize },
}

impl LabelEncoding {
    /// Build the encoding from the `regression` flag and class count.
    pub fn from_flags(regression: bool, num_classes: usize) -> Self {
        if regression {
            LabelEncoding::Regression
        } else {
            LabelEncoding::OneHot { num_classes }
        }
    }

    #[inline]
    pub fn is_regression(&self) -> bool {
        matches!(self, LabelEncoding::Regression)
    }
}

/// Feature and label arrays of a single example, both `[time_step, width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleArrays {
    pub features: Array2<f64>,
    pub labels: Array2<f64>,
}

impl ExampleArrays {
    pub fn new(features: Array2<f64>, labels: Array2<f64>) -> Self {
        Self { features, labels }
    }

    /// Feature span length.
    #[inline]
    pub fn feature_len(&self) -> usize {
        self.features.nrows()
    }

    /// Label span length.
    #[inline]
    pub fn label_len(&self) -> usize {
        self.labels.nrows()
    }
}

/// Converts one [`Sequence`] into numeric arrays.
///
/// Extraction is pure: the only side effect is allocation of the output
/// arrays. Empty sequences are not rejected; they become zero-length arrays
/// and are dealt with by the alignment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceExtractor {
    encoding: LabelEncoding,
}

impl SequenceExtractor {
    pub fn new(encoding: LabelEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> LabelEncoding {
        self.encoding
    }

    /// Copy every field of every step positionally.
    ///
    /// Width is taken from the first time step.
    pub fn extract_features(&self, sequence: &Sequence) -> Result<Array2<f64>> {
        let width = sequence.width();
        let mut out = Array2::<f64>::zeros((sequence.len(), width));

        for (t, step) in sequence.iter().enumerate() {
            check_step_width(t, step, width)?;
            for (f, value) in step.iter().enumerate() {
                out[[t, f]] = value.as_f64();
            }
        }

        Ok(out)
    }

    /// Build the label array of a dual-source example.
    ///
    /// For regression all label fields are copied. For classification the
    /// first field of each step is the class index.
    pub fn extract_labels(&self, sequence: &Sequence) -> Result<Array2<f64>> {
        match self.encoding {
            LabelEncoding::Regression => self.extract_features(sequence),
            LabelEncoding::OneHot { num_classes } => {
                let mut out = Array2::<f64>::zeros((sequence.len(), num_classes));

                for (t, step) in sequence.iter().enumerate() {
                    let value = step.first().ok_or_else(|| {
                        BatchError::invalid_label_value(t, "time step has no label field")
                    })?;
                    write_one_hot(out.row_mut(t), value, num_classes, t)?;
                }

                Ok(out)
            }
        }
    }

    /// Split a single-source sequence into features and labels.
    ///
    /// The field at `label_index` of every step goes to the label array; all
    /// other fields keep their relative order in the feature array, so the
    /// feature width is the step width minus one.
    pub fn split(&self, sequence: &Sequence, label_index: usize) -> Result<ExampleArrays> {
        let len = sequence.len();
        let width = sequence.width();

        if len > 0 && label_index >= width {
            return Err(BatchError::LabelIndexOutOfRange { label_index, width });
        }

        let feature_width = width.saturating_sub(1);
        let label_width = match self.encoding {
            LabelEncoding::Regression => 1,
            LabelEncoding::OneHot { num_classes } => num_classes,
        };

        let mut features = Array2::<f64>::zeros((len, feature_width));
        let mut labels = Array2::<f64>::zeros((len, label_width));

        for (t, step) in sequence.iter().enumerate() {
            check_step_width(t, step, width)?;

            let mut f = 0;
            for (column, value) in step.iter().enumerate() {
                if column == label_index {
                    match self.encoding {
                        LabelEncoding::Regression => labels[[t, 0]] = value.as_f64(),
                        LabelEncoding::OneHot { num_classes } => {
                            write_one_hot(labels.row_mut(t), value, num_classes, t)?
                        }
                    }
                } else {
                    features[[t, f]] = value.as_f64();
                    f += 1;
                }
            }
        }

        Ok(ExampleArrays::new(features, labels))
    }
}

fn check_step_width(step: usize, fields: &TimeStep, expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(BatchError::RaggedTimeStep {
            step,
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

/// Write a one-hot row. The row must already be zeroed.
fn write_one_hot(
    mut row: ArrayViewMut1<'_, f64>,
    value: &FieldValue,
    num_classes: usize,
    step: usize,
) -> Result<()> {
    let index = value.as_index(step)?;
    if index < 0 || index as usize >= num_classes {
        return Err(BatchError::invalid_index(index, num_classes));
    }
    row[index as usize] = 1.0;
    Ok(())
}
