//! Record sources: anything that yields one [`Sequence`] at a time.
//!
//! The batcher only depends on the [`SequenceSource`] capability, so in-memory
//! data, CSV files, or a custom reader plug in the same way. Dual-source
//! batching uses two sources (features, labels) advanced in lockstep;
//! single-source batching uses one source with a label column.
//!
//! # Implementations
//!
//! - [`VecSequenceSource`]: sequences held in memory
//! - [`CsvSequenceSource`]: one CSV file per sequence, one row per time step

mod delimited;
mod memory;

pub use delimited::CsvSequenceSource;
pub use memory::VecSequenceSource;

use crate::error::Result;
use crate::record::Sequence;

/// A forward-only, resettable stream of sequences.
///
/// Sources are not required to know how many sequences they hold; total
/// counts are never asked of them.
pub trait SequenceSource {
    /// Whether another sequence can be read.
    fn has_next(&self) -> bool;

    /// Read the next sequence.
    ///
    /// Fails with [`crate::BatchError::NoMoreData`] when the source is
    /// exhausted.
    fn next_sequence(&mut self) -> Result<Sequence>;

    /// Rewind to the first sequence.
    fn reset(&mut self);
}

impl<S: SequenceSource + ?Sized> SequenceSource for Box<S> {
    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn next_sequence(&mut self) -> Result<Sequence> {
        (**self).next_sequence()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
