//! Raw sequence records as produced by a [`crate::source::SequenceSource`].
//!
//! A [`Sequence`] is an ordered list of time steps, and each time step is an
//! ordered list of scalar [`FieldValue`]s. Sequences are immutable once read
//! and are consumed by exactly one extraction.

use std::fmt;

use crate::error::{BatchError, Result};

/// A single scalar field of a time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Continuous numeric value.
    Real(f64),
    /// Integer value, typically a class index.
    Index(i64),
}

impl FieldValue {
    /// Numeric value of the field.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Real(v) => v,
            FieldValue::Index(i) => i as f64,
        }
    }

    /// Interpret the field as a class index.
    ///
    /// Real values are accepted only when they are finite and integral
    /// (CSV sources parse every column as `f64`, so `2.0` must map to class 2).
    pub fn as_index(&self, step: usize) -> Result<i64> {
        match *self {
            FieldValue::Index(i) => Ok(i),
            FieldValue::Real(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
            FieldValue::Real(v) => Err(BatchError::invalid_label_value(
                step,
                format!("{} is not an integral class index", v),
            )),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Real(value as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Index(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Index(value as i64)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Index(value as i64)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Fields of one time step, in column order.
pub type TimeStep = Vec<FieldValue>;

/// An ordered list of time steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    steps: Vec<TimeStep>,
}

impl Sequence {
    pub fn new(steps: Vec<TimeStep>) -> Self {
        Self { steps }
    }

    /// Build a sequence from rows of anything convertible to [`FieldValue`].
    ///
    /// ```
    /// use sequence_batcher::record::Sequence;
    ///
    /// let seq = Sequence::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    /// assert_eq!(seq.len(), 2);
    /// assert_eq!(seq.width(), 2);
    /// ```
    pub fn from_rows<R, V>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self {
            steps: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Number of time steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Field count of the first time step (0 for an empty sequence).
    pub fn width(&self) -> usize {
        self.steps.first().map_or(0, Vec::len)
    }

    pub fn steps(&self) -> &[TimeStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeStep> {
        self.steps.iter()
    }
}

impl From<Vec<TimeStep>> for Sequence {
    fn from(steps: Vec<TimeStep>) -> Self {
        Self::new(steps)
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a TimeStep;
    type IntoIter = std::slice::Iter<'a, TimeStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::from(2.5).as_f64(), 2.5);
        assert_eq!(FieldValue::from(3i64).as_f64(), 3.0);
        assert_eq!(FieldValue::Real(2.0).as_index(0).unwrap(), 2);
        assert_eq!(FieldValue::Index(-1).as_index(0).unwrap(), -1);
    }

    #[test]
    fn test_fractional_index_rejected() {
        let err = FieldValue::Real(1.5).as_index(4).unwrap_err();
        assert!(matches!(err, BatchError::InvalidLabelValue { step: 4, .. }));
        assert!(FieldValue::Real(f64::NAN).as_index(0).is_err());
    }

    #[test]
    fn test_empty_sequence() {
        let seq = Sequence::default();
        assert!(seq.is_empty());
        assert_eq!(seq.width(), 0);
    }

    #[test]
    fn test_mixed_rows() {
        let seq = Sequence::new(vec![
            vec![FieldValue::Index(1), FieldValue::Real(0.5)],
            vec![FieldValue::Index(0), FieldValue::Real(0.25)],
        ]);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.steps()[1][1], FieldValue::Real(0.25));
    }
}
