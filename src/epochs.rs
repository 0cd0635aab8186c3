//! Multi-epoch wrapper.
//!
//! [`MultiEpochIterator`] replays an inner [`MiniBatchIterator`] a fixed
//! number of times. When the inner iterator runs dry after a batch, the epoch
//! counter advances and, if epochs remain, the inner iterator is reset.
//!
//! ```
//! use sequence_batcher::prelude::*;
//!
//! let source = VecSequenceSource::from_rows(vec![
//!     vec![vec![0.0, 1.0]],
//!     vec![vec![1.0, 2.0]],
//!     vec![vec![0.0, 3.0]],
//! ]);
//! let config = BatcherConfig::classification(2)
//!     .with_label_index(0)
//!     .with_mini_batch_size(2);
//! let batcher = SequenceBatcher::single(source, config).unwrap();
//!
//! let mut epochs = MultiEpochIterator::new(3, batcher);
//! let mut batches = 0;
//! while epochs.has_next() {
//!     epochs.next_batch().unwrap();
//!     batches += 1;
//! }
//!
//! assert_eq!(batches, 6);
//! assert_eq!(epochs.epochs_completed(), 3);
//! ```
//!
//! A data set already held as one [`MiniBatch`] is repeated with
//! [`MultiEpochIterator::from_batch`], which hands it out in slices of the
//! requested size through a [`MiniBatchSplitter`].

use tracing::info;

use crate::batcher::MiniBatchIterator;
use crate::error::{BatchError, Result};
use crate::minibatch::MiniBatch;
use crate::preprocessing::BatchPreProcessor;

// ============================================================================
// In-Memory Batches
// ============================================================================

/// Splits one in-memory [`MiniBatch`] into batches along the example axis.
pub struct MiniBatchSplitter {
    data: MiniBatch,
    batch_size: usize,
    cursor: usize,
    pre_processor: Option<Box<dyn BatchPreProcessor>>,
}

impl MiniBatchSplitter {
    pub fn new(data: MiniBatch, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(BatchError::config("batch_size must be > 0"));
        }
        Ok(Self {
            data,
            batch_size,
            cursor: 0,
            pre_processor: None,
        })
    }

    pub fn data(&self) -> &MiniBatch {
        &self.data
    }
}

impl MiniBatchIterator for MiniBatchSplitter {
    fn has_next(&self) -> bool {
        self.cursor < self.data.num_examples()
    }

    fn next_batch_of(&mut self, num: usize) -> Result<MiniBatch> {
        if num == 0 {
            return Err(BatchError::config("requested minibatch size must be > 0"));
        }
        if !self.has_next() {
            return Err(BatchError::NoMoreData);
        }

        let end = (self.cursor + num).min(self.data.num_examples());
        let mut batch = self.data.slice_examples(self.cursor..end);
        self.cursor = end;

        if let Some(pre_processor) = self.pre_processor.as_mut() {
            pre_processor.pre_process(&mut batch);
        }
        Ok(batch)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn feature_width(&mut self) -> Result<usize> {
        Ok(self.data.feature_width())
    }

    fn label_width(&mut self) -> Result<usize> {
        Ok(self.data.label_width())
    }

    /// Known up front for in-memory data.
    fn total_examples(&self) -> Result<usize> {
        Ok(self.data.num_examples())
    }

    fn num_examples(&self) -> Result<usize> {
        Ok(self.data.num_examples())
    }

    fn set_pre_processor(&mut self, pre_processor: Box<dyn BatchPreProcessor>) {
        self.pre_processor = Some(pre_processor);
    }
}

// ============================================================================
// Multi-Epoch Iterator
// ============================================================================

/// Iterates an inner minibatch iterator for `num_epochs` passes.
pub struct MultiEpochIterator<I> {
    inner: I,
    num_epochs: usize,
    epochs_completed: usize,
    /// Examples handed out across all epochs since the last reset
    examples_seen: usize,
    pre_processor: Option<Box<dyn BatchPreProcessor>>,
}

impl MultiEpochIterator<MiniBatchSplitter> {
    /// Repeat an in-memory data set, handed out `batch_size` examples at a time.
    pub fn from_batch(num_epochs: usize, data: MiniBatch, batch_size: usize) -> Result<Self> {
        Ok(Self::new(num_epochs, MiniBatchSplitter::new(data, batch_size)?))
    }
}

impl<I: MiniBatchIterator> MultiEpochIterator<I> {
    pub fn new(num_epochs: usize, inner: I) -> Self {
        Self {
            inner,
            num_epochs,
            epochs_completed: 0,
            examples_seen: 0,
            pre_processor: None,
        }
    }

    pub fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    /// Full passes finished since the last reset.
    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }

    /// Examples handed out across all epochs since the last reset.
    pub fn examples_seen(&self) -> usize {
        self.examples_seen
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn into_inner(self) -> I {
        self.inner
    }

    fn after_batch(&mut self) {
        if self.inner.has_next() {
            return;
        }

        self.epochs_completed += 1;
        info!(
            epoch = self.epochs_completed,
            num_epochs = self.num_epochs,
            "epoch complete"
        );

        if self.epochs_completed < self.num_epochs {
            self.inner.reset();
        }
    }
}

impl<I: MiniBatchIterator> MiniBatchIterator for MultiEpochIterator<I> {
    fn has_next(&self) -> bool {
        self.epochs_completed < self.num_epochs && self.inner.has_next()
    }

    fn next_batch_of(&mut self, num: usize) -> Result<MiniBatch> {
        if self.epochs_completed >= self.num_epochs {
            return Err(BatchError::NoMoreData);
        }

        let mut batch = self.inner.next_batch_of(num)?;
        self.examples_seen += batch.num_examples();
        self.after_batch();

        if let Some(pre_processor) = self.pre_processor.as_mut() {
            pre_processor.pre_process(&mut batch);
        }
        Ok(batch)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.epochs_completed = 0;
        self.examples_seen = 0;
    }

    fn batch_size(&self) -> usize {
        self.inner.batch_size()
    }

    /// Position within the current epoch.
    fn cursor(&self) -> usize {
        self.inner.cursor()
    }

    fn feature_width(&mut self) -> Result<usize> {
        self.inner.feature_width()
    }

    fn label_width(&mut self) -> Result<usize> {
        self.inner.label_width()
    }

    fn total_examples(&self) -> Result<usize> {
        self.inner.total_examples()
    }

    fn num_examples(&self) -> Result<usize> {
        self.inner.num_examples()
    }

    fn set_pre_processor(&mut self, pre_processor: Box<dyn BatchPreProcessor>) {
        self.pre_processor = Some(pre_processor);
    }
}

impl<I: MiniBatchIterator> Iterator for MultiEpochIterator<I> {
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if !MiniBatchIterator::has_next(self) {
            return None;
        }
        Some(self.next_batch())
    }
}
