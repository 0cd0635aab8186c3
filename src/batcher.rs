//! Batch cursor: sources → extractor → alignment engine → minibatches.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   Sequence    ┌──────────────────┐  ExampleArrays
//! │ SequenceSource   │ ────────────▶ │ SequenceExtractor│ ──────────────┐
//! │ (1 or 2 sources) │               └──────────────────┘               │
//! └──────────────────┘                                                  ▼
//!                      MiniBatch     ┌──────────────────┐   ┌──────────────────┐
//!            caller ◀──────────────  │ BatchPreProcessor│ ◀─│   align_batch    │
//!                                    └──────────────────┘   └──────────────────┘
//! ```
//!
//! The two construction modes are two [`ExampleStream`] implementations
//! driving one generic [`SequenceBatcher`]:
//!
//! - [`DualSource`]: features and labels come from separate sources read in
//!   lockstep
//! - [`SingleSource`]: one source, label taken from a column of every step
//!
//! # Lookahead
//!
//! Asking for [`MiniBatchIterator::feature_width`] or
//! [`MiniBatchIterator::label_width`] before the first batch was produced
//! assembles one batch and parks it. The next `next_batch*` call returns that
//! batch unchanged (post-processed exactly once, at hand-out), so probing
//! shapes never consumes data the caller does not see.
//!
//! # Thread Safety
//!
//! `SequenceBatcher` is NOT thread-safe. It holds the lookahead slot and the
//! source cursors; use one batcher per thread.

use tracing::{debug, trace, warn};

use crate::alignment::{align_batch, AlignmentMode};
use crate::config::BatcherConfig;
use crate::error::{BatchError, Result};
use crate::extract::{ExampleArrays, SequenceExtractor};
use crate::minibatch::MiniBatch;
use crate::preprocessing::BatchPreProcessor;
use crate::source::SequenceSource;

// ============================================================================
// Minibatch Iterator Protocol
// ============================================================================

/// Pull-based protocol shared by batchers and wrappers around them.
pub trait MiniBatchIterator {
    /// Whether another minibatch can be produced.
    fn has_next(&self) -> bool;

    /// Produce a minibatch of up to `num` examples.
    fn next_batch_of(&mut self, num: usize) -> Result<MiniBatch>;

    /// Produce a minibatch of the configured size.
    fn next_batch(&mut self) -> Result<MiniBatch> {
        let num = self.batch_size();
        self.next_batch_of(num)
    }

    /// Rewind to the start of the data.
    fn reset(&mut self);

    /// Configured minibatch size.
    fn batch_size(&self) -> usize;

    /// Examples handed out since the last reset.
    fn cursor(&self) -> usize;

    /// Feature vector width (may peek one batch).
    fn feature_width(&mut self) -> Result<usize>;

    /// Label vector width (may peek one batch).
    fn label_width(&mut self) -> Result<usize>;

    /// Total examples in the data set.
    fn total_examples(&self) -> Result<usize>;

    /// Examples in the data set, as seen by this iterator.
    fn num_examples(&self) -> Result<usize>;

    /// Register the post-processing hook, replacing any previous one.
    fn set_pre_processor(&mut self, pre_processor: Box<dyn BatchPreProcessor>);
}

// ============================================================================
// Example Streams
// ============================================================================

/// Produces one example's arrays at a time.
pub trait ExampleStream {
    fn has_next(&self) -> bool;

    fn next_example(&mut self, extractor: &SequenceExtractor) -> Result<ExampleArrays>;

    fn reset(&mut self);
}

/// Features and labels from two sources advanced in lockstep.
#[derive(Debug, Clone)]
pub struct DualSource<F, L> {
    features: F,
    labels: L,
}

impl<F, L> DualSource<F, L> {
    pub fn new(features: F, labels: L) -> Self {
        Self { features, labels }
    }

    pub fn into_inner(self) -> (F, L) {
        (self.features, self.labels)
    }
}

impl<F: SequenceSource, L: SequenceSource> ExampleStream for DualSource<F, L> {
    /// True while either source has data; a sequence left without a partner
    /// fails in `next_example` instead of being skipped.
    fn has_next(&self) -> bool {
        self.features.has_next() || self.labels.has_next()
    }

    fn next_example(&mut self, extractor: &SequenceExtractor) -> Result<ExampleArrays> {
        match (self.features.has_next(), self.labels.has_next()) {
            (true, false) => return Err(BatchError::UnpairedSequence { missing: "label" }),
            (false, true) => return Err(BatchError::UnpairedSequence { missing: "feature" }),
            _ => {}
        }

        let feature_sequence = self.features.next_sequence()?;
        let label_sequence = self.labels.next_sequence()?;

        Ok(ExampleArrays::new(
            extractor.extract_features(&feature_sequence)?,
            extractor.extract_labels(&label_sequence)?,
        ))
    }

    fn reset(&mut self) {
        self.features.reset();
        self.labels.reset();
    }
}

/// One source whose time steps carry the label in column `label_index`.
#[derive(Debug, Clone)]
pub struct SingleSource<S> {
    source: S,
    label_index: usize,
}

impl<S> SingleSource<S> {
    pub fn new(source: S, label_index: usize) -> Self {
        Self {
            source,
            label_index,
        }
    }

    pub fn label_index(&self) -> usize {
        self.label_index
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: SequenceSource> ExampleStream for SingleSource<S> {
    fn has_next(&self) -> bool {
        self.source.has_next()
    }

    fn next_example(&mut self, extractor: &SequenceExtractor) -> Result<ExampleArrays> {
        let sequence = self.source.next_sequence()?;
        extractor.split(&sequence, self.label_index)
    }

    fn reset(&mut self) {
        self.source.reset();
    }
}

// ============================================================================
// Sequence Batcher
// ============================================================================

/// Batcher over separate feature and label sources.
pub type DualSourceBatcher<F, L> = SequenceBatcher<DualSource<F, L>>;

/// Batcher over one source with an embedded label column.
pub type SingleSourceBatcher<S> = SequenceBatcher<SingleSource<S>>;

/// Produces successive minibatches from an [`ExampleStream`].
///
/// # Example
///
/// ```
/// use sequence_batcher::prelude::*;
///
/// // Two sequences, label in column 0, classes {0, 1}
/// let source = VecSequenceSource::from_rows(vec![
///     vec![vec![1.0, 0.5, 0.5], vec![0.0, 0.1, 0.2]],
///     vec![vec![0.0, 0.3, 0.4]],
/// ]);
/// let config = BatcherConfig::classification(2)
///     .with_label_index(0)
///     .with_alignment(AlignmentMode::AlignStart);
///
/// let mut batcher = SequenceBatcher::single(source, config).unwrap();
/// let batch = batcher.next_batch().unwrap();
///
/// assert_eq!(batch.features.dim(), (2, 2, 2));
/// assert_eq!(batch.labels.dim(), (2, 2, 2));
/// assert_eq!(batch.features_mask.unwrap().row(1).to_vec(), vec![1.0, 0.0]);
/// assert!(!batcher.has_next());
/// ```
pub struct SequenceBatcher<E> {
    stream: E,
    extractor: SequenceExtractor,
    config: BatcherConfig,
    /// Examples handed out since the last reset
    cursor: usize,
    /// Batch assembled by a shape query, returned by the next `next_batch*`
    peeked: Option<MiniBatch>,
    feature_width: Option<usize>,
    label_width: Option<usize>,
    pre_processor: Option<Box<dyn BatchPreProcessor>>,
}

impl<F: SequenceSource, L: SequenceSource> SequenceBatcher<DualSource<F, L>> {
    /// Batcher whose features and labels come from different sources.
    ///
    /// The `i`-th label sequence belongs to the `i`-th feature sequence.
    pub fn dual(features: F, labels: L, config: BatcherConfig) -> Result<Self> {
        if config.label_index.is_some() {
            warn!("label_index is ignored when features and labels come from separate sources");
        }
        Self::with_stream(DualSource::new(features, labels), config)
    }
}

impl<S: SequenceSource> SequenceBatcher<SingleSource<S>> {
    /// Batcher whose label is column `config.label_index` of each time step.
    ///
    /// With the default `EQUAL_LENGTH` alignment every sequence must have the
    /// same length; use [`AlignmentMode::AlignStart`] for variable-length data
    /// so shorter sequences are padded and masked.
    pub fn single(source: S, config: BatcherConfig) -> Result<Self> {
        let label_index = config.label_index.ok_or_else(|| {
            BatchError::config("single-source batching requires label_index")
        })?;
        Self::with_stream(SingleSource::new(source, label_index), config)
    }
}

impl<E: ExampleStream> SequenceBatcher<E> {
    /// Batcher over any example stream.
    pub fn with_stream(stream: E, config: BatcherConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            stream,
            extractor: SequenceExtractor::new(config.label_encoding()),
            config,
            cursor: 0,
            peeked: None,
            feature_width: None,
            label_width: None,
            pre_processor: None,
        })
    }

    /// Register a post-processing hook (builder style).
    pub fn with_pre_processor<P: BatchPreProcessor + 'static>(mut self, pre_processor: P) -> Self {
        self.pre_processor = Some(Box::new(pre_processor));
        self
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    pub fn alignment(&self) -> AlignmentMode {
        self.config.alignment
    }

    /// Whether a shape query has parked a batch that was not yet handed out.
    pub fn has_peeked(&self) -> bool {
        self.peeked.is_some()
    }

    pub fn stream(&self) -> &E {
        &self.stream
    }

    /// Read up to `num` examples and align them.
    ///
    /// Any extraction failure aborts the whole batch.
    fn assemble(&mut self, num: usize) -> Result<MiniBatch> {
        if num == 0 {
            return Err(BatchError::config("requested minibatch size must be > 0"));
        }
        if !self.stream.has_next() {
            return Err(BatchError::NoMoreData);
        }

        let mut examples = Vec::with_capacity(num);
        while examples.len() < num && self.stream.has_next() {
            examples.push(self.stream.next_example(&self.extractor)?);
        }

        let batch = align_batch(self.config.alignment, &examples)?;

        self.feature_width.get_or_insert(batch.feature_width());
        self.label_width.get_or_insert(batch.label_width());

        debug!(
            examples = batch.num_examples(),
            time_length = batch.time_length(),
            feature_width = batch.feature_width(),
            label_width = batch.label_width(),
            alignment = %self.config.alignment,
            "assembled minibatch"
        );

        Ok(batch)
    }

    /// Assemble and park one batch if nothing has been produced yet.
    fn peek(&mut self) -> Result<&MiniBatch> {
        if self.peeked.is_none() {
            let batch = self.assemble(self.config.mini_batch_size)?;
            trace!(
                examples = batch.num_examples(),
                "cached lookahead batch for shape query"
            );
            self.peeked = Some(batch);
        }
        self.peeked.as_ref().ok_or(BatchError::NoMoreData)
    }

    fn hand_out(&mut self, mut batch: MiniBatch) -> MiniBatch {
        self.cursor += batch.num_examples();
        if let Some(pre_processor) = self.pre_processor.as_mut() {
            pre_processor.pre_process(&mut batch);
        }
        batch
    }
}

impl<E: ExampleStream> MiniBatchIterator for SequenceBatcher<E> {
    fn has_next(&self) -> bool {
        self.peeked.is_some() || self.stream.has_next()
    }

    /// A parked lookahead batch is returned verbatim regardless of `num`.
    fn next_batch_of(&mut self, num: usize) -> Result<MiniBatch> {
        let batch = match self.peeked.take() {
            Some(batch) => batch,
            None => self.assemble(num)?,
        };
        Ok(self.hand_out(batch))
    }

    fn reset(&mut self) {
        self.stream.reset();
        self.cursor = 0;
        self.peeked = None;
    }

    fn batch_size(&self) -> usize {
        self.config.mini_batch_size
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn feature_width(&mut self) -> Result<usize> {
        match self.feature_width {
            Some(width) => Ok(width),
            None => self.peek().map(MiniBatch::feature_width),
        }
    }

    fn label_width(&mut self) -> Result<usize> {
        match self.label_width {
            Some(width) => Ok(width),
            None => self.peek().map(MiniBatch::label_width),
        }
    }

    fn total_examples(&self) -> Result<usize> {
        Err(BatchError::not_supported("total_examples"))
    }

    fn num_examples(&self) -> Result<usize> {
        Err(BatchError::not_supported("num_examples"))
    }

    fn set_pre_processor(&mut self, pre_processor: Box<dyn BatchPreProcessor>) {
        self.pre_processor = Some(pre_processor);
    }
}

impl<E: ExampleStream> Iterator for SequenceBatcher<E> {
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if !MiniBatchIterator::has_next(self) {
            return None;
        }
        Some(self.next_batch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSequenceSource;
    use std::cell::Cell;
    use std::rc::Rc;

    fn single_source(lengths: &[usize]) -> VecSequenceSource {
        // Label column 0 holds t % 2, features are [t, 10 * t]
        VecSequenceSource::from_rows(
            lengths
                .iter()
                .map(|&len| {
                    (0..len)
                        .map(|t| vec![(t % 2) as f64, t as f64, 10.0 * t as f64])
                        .collect()
                })
                .collect(),
        )
    }

    fn config() -> BatcherConfig {
        BatcherConfig::classification(2)
            .with_label_index(0)
            .with_mini_batch_size(2)
            .with_alignment(AlignmentMode::AlignStart)
    }

    #[test]
    fn test_single_requires_label_index() {
        let result = SequenceBatcher::single(single_source(&[2]), BatcherConfig::default());
        assert!(matches!(result, Err(BatchError::Config { .. })));
    }

    #[test]
    fn test_tail_batch_is_smaller() {
        let mut batcher = SequenceBatcher::single(single_source(&[2, 2, 2]), config()).unwrap();

        assert_eq!(batcher.next_batch().unwrap().num_examples(), 2);
        assert_eq!(batcher.cursor(), 2);
        assert_eq!(batcher.next_batch().unwrap().num_examples(), 1);
        assert_eq!(batcher.cursor(), 3);
        assert!(!batcher.has_next());
        assert!(matches!(batcher.next_batch(), Err(BatchError::NoMoreData)));
    }

    #[test]
    fn test_peek_does_not_advance_cursor() {
        let mut batcher = SequenceBatcher::single(single_source(&[2, 3]), config()).unwrap();

        assert_eq!(batcher.feature_width().unwrap(), 2);
        assert_eq!(batcher.label_width().unwrap(), 2);
        assert!(batcher.has_peeked());
        assert_eq!(batcher.cursor(), 0);
        assert!(batcher.has_next());

        let batch = batcher.next_batch().unwrap();
        assert_eq!(batch.num_examples(), 2);
        assert!(!batcher.has_peeked());
        assert_eq!(batcher.cursor(), 2);
        assert!(!batcher.has_next());

        // Widths are cached; no further peeking
        assert_eq!(batcher.feature_width().unwrap(), 2);
    }

    #[test]
    fn test_pre_processor_applied_once_to_peeked_batch() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        let mut batcher = SequenceBatcher::single(single_source(&[2, 2]), config())
            .unwrap()
            .with_pre_processor(move |batch: &mut MiniBatch| {
                counter.set(counter.get() + 1);
                batch.features += 1.0;
            });

        batcher.feature_width().unwrap();
        assert_eq!(calls.get(), 0);

        let batch = batcher.next_batch().unwrap();
        assert_eq!(calls.get(), 1);
        // t = 0 feature value 0.0, shifted once
        assert_eq!(batch.features[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_shape_query_on_empty_source() {
        let mut batcher =
            SequenceBatcher::single(VecSequenceSource::default(), config()).unwrap();
        assert!(!batcher.has_next());
        assert!(matches!(
            batcher.feature_width(),
            Err(BatchError::NoMoreData)
        ));
    }

    #[test]
    fn test_totals_not_supported() {
        let batcher = SequenceBatcher::single(single_source(&[1]), config()).unwrap();
        assert!(matches!(
            batcher.total_examples(),
            Err(BatchError::NotSupported { .. })
        ));
        assert!(matches!(
            batcher.num_examples(),
            Err(BatchError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_reset_keeps_cached_widths() {
        let mut batcher = SequenceBatcher::single(single_source(&[2, 2, 2]), config()).unwrap();
        batcher.next_batch().unwrap();
        batcher.reset();

        batcher.feature_width().unwrap();
        assert!(!batcher.has_peeked(), "width cached, no peek needed");

        batcher.reset();
        assert_eq!(batcher.cursor(), 0);
        assert_eq!(batcher.next_batch().unwrap().num_examples(), 2);
    }

    #[test]
    fn test_failed_example_aborts_batch() {
        // Class index 5 is out of range for 2 classes
        let source = VecSequenceSource::from_rows(vec![
            vec![vec![0.0, 1.0]],
            vec![vec![5.0, 1.0]],
        ]);
        let mut batcher = SequenceBatcher::single(source, config()).unwrap();

        assert!(matches!(
            batcher.next_batch(),
            Err(BatchError::InvalidIndex { index: 5, .. })
        ));
        assert_eq!(batcher.cursor(), 0);
    }

    #[test]
    fn test_single_variable_length_needs_padding_mode() {
        let equal = config().with_alignment(AlignmentMode::EqualLength);
        let mut batcher = SequenceBatcher::single(single_source(&[2, 3]), equal).unwrap();
        assert!(matches!(
            batcher.next_batch(),
            Err(BatchError::LengthMismatch { example: 1, .. })
        ));

        let mut batcher = SequenceBatcher::single(single_source(&[2, 3]), config()).unwrap();
        let batch = batcher.next_batch().unwrap();
        assert_eq!(batch.time_length(), 3);
        assert_eq!(
            batch.features_mask.unwrap().row(0).to_vec(),
            vec![1.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_dual_extra_features_fail_batch() {
        let features = VecSequenceSource::from_rows(vec![
            vec![vec![1.0]],
            vec![vec![2.0]],
            vec![vec![3.0]],
        ]);
        let labels = VecSequenceSource::from_rows(vec![vec![vec![0.0]]]);
        let config = BatcherConfig::classification(2).with_mini_batch_size(5);

        let mut batcher = SequenceBatcher::dual(features, labels, config).unwrap();
        assert!(matches!(
            batcher.next_batch(),
            Err(BatchError::UnpairedSequence { missing: "label" })
        ));
        assert_eq!(batcher.cursor(), 0);
    }

    #[test]
    fn test_dual_extra_labels_fail_after_paired_batch() {
        let features = VecSequenceSource::from_rows(vec![vec![vec![1.0]]]);
        let labels = VecSequenceSource::from_rows(vec![vec![vec![0.0]], vec![vec![1.0]]]);
        let config = BatcherConfig::classification(2).with_mini_batch_size(1);

        let mut batcher = SequenceBatcher::dual(features, labels, config).unwrap();
        assert_eq!(batcher.next_batch().unwrap().num_examples(), 1);
        assert!(batcher.has_next());
        assert!(matches!(
            batcher.next_batch(),
            Err(BatchError::UnpairedSequence { missing: "feature" })
        ));
    }

    #[test]
    fn test_iterator_yields_all_batches() {
        let batcher = SequenceBatcher::single(single_source(&[1, 2, 3, 4, 5]), config()).unwrap();
        let sizes: Vec<usize> = batcher.map(|b| b.unwrap().num_examples()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_zero_sized_request_rejected() {
        let mut batcher = SequenceBatcher::single(single_source(&[1]), config()).unwrap();
        assert!(matches!(
            batcher.next_batch_of(0),
            Err(BatchError::Config { .. })
        ));
        assert!(batcher.has_next());
    }
}
