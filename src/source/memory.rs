use crate::error::{BatchError, Result};
use crate::record::Sequence;

use super::SequenceSource;

/// In-memory sequence source.
///
/// # Example
///
/// ```
/// use sequence_batcher::record::Sequence;
/// use sequence_batcher::source::{SequenceSource, VecSequenceSource};
///
/// let mut source = VecSequenceSource::new(vec![
///     Sequence::from_rows(vec![vec![1.0, 2.0]]),
///     Sequence::from_rows(vec![vec![3.0, 4.0], vec![5.0, 6.0]]),
/// ]);
///
/// assert_eq!(source.next_sequence().unwrap().len(), 1);
/// assert_eq!(source.next_sequence().unwrap().len(), 2);
/// assert!(!source.has_next());
///
/// source.reset();
/// assert!(source.has_next());
/// ```
#[derive(Debug, Clone, Default)]
pub struct VecSequenceSource {
    sequences: Vec<Sequence>,
    position: usize,
}

impl VecSequenceSource {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self {
            sequences,
            position: 0,
        }
    }

    /// Convenience constructor from nested rows of `f64`.
    pub fn from_rows(rows: Vec<Vec<Vec<f64>>>) -> Self {
        Self::new(rows.into_iter().map(Sequence::from_rows).collect())
    }

    /// Number of sequences read since the last reset.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl SequenceSource for VecSequenceSource {
    fn has_next(&self) -> bool {
        self.position < self.sequences.len()
    }

    fn next_sequence(&mut self) -> Result<Sequence> {
        let sequence = self
            .sequences
            .get(self.position)
            .cloned()
            .ok_or(BatchError::NoMoreData)?;
        self.position += 1;
        Ok(sequence)
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

impl FromIterator<Sequence> for VecSequenceSource {
    fn from_iter<I: IntoIterator<Item = Sequence>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion() {
        let mut source = VecSequenceSource::from_rows(vec![vec![vec![1.0]]]);
        assert!(source.has_next());
        source.next_sequence().unwrap();
        assert!(!source.has_next());
        assert!(matches!(
            source.next_sequence(),
            Err(BatchError::NoMoreData)
        ));
    }

    #[test]
    fn test_reset_rewinds() {
        let mut source = VecSequenceSource::from_rows(vec![vec![vec![1.0]], vec![vec![2.0]]]);
        let first = source.next_sequence().unwrap();
        source.next_sequence().unwrap();
        assert_eq!(source.position(), 2);

        source.reset();
        assert_eq!(source.position(), 0);
        assert_eq!(source.next_sequence().unwrap(), first);
    }
}
