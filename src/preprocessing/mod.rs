//! Minibatch post-processing.
//!
//! A [`BatchPreProcessor`] is applied to every minibatch after assembly and
//! before it is handed to the caller, and may rewrite it in place. Closures
//! work directly:
//!
//! ```
//! use sequence_batcher::minibatch::MiniBatch;
//! use sequence_batcher::preprocessing::BatchPreProcessor;
//! use ndarray::Array3;
//!
//! let mut scale = |batch: &mut MiniBatch| batch.features *= 0.5;
//!
//! let mut batch = MiniBatch::new(Array3::ones((1, 2, 3)), Array3::zeros((1, 1, 3)), None, None);
//! scale.pre_process(&mut batch);
//! assert_eq!(batch.features[[0, 1, 2]], 0.5);
//! ```
//!
//! # Normalization
//!
//! - [`FeatureStandardizer`]: per-feature z-score from running statistics
//! - [`FeatureMinMaxScaler`]: per-feature scaling to `[0, 1]` or `[-1, 1]`
//!
//! Both are fitted from a [`crate::MiniBatchIterator`] and only look at (and
//! only rewrite) positions the feature mask marks as valid.

pub mod normalization;

pub use normalization::{
    ChannelNormalizer, FeatureMinMaxScaler, FeatureStandardizer, MinMaxNormalizer, Normalizer,
    ZScoreNormalizer,
};

use crate::minibatch::MiniBatch;

/// Hook applied to each assembled minibatch.
pub trait BatchPreProcessor {
    fn pre_process(&mut self, batch: &mut MiniBatch);
}

impl<F> BatchPreProcessor for F
where
    F: FnMut(&mut MiniBatch),
{
    fn pre_process(&mut self, batch: &mut MiniBatch) {
        self(batch)
    }
}

/// Applies several pre-processors in insertion order.
#[derive(Default)]
pub struct PreProcessorChain {
    stages: Vec<Box<dyn BatchPreProcessor>>,
}

impl PreProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn with<P: BatchPreProcessor + 'static>(mut self, stage: P) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn BatchPreProcessor>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl BatchPreProcessor for PreProcessorChain {
    fn pre_process(&mut self, batch: &mut MiniBatch) {
        for stage in &mut self.stages {
            stage.pre_process(batch);
        }
    }
}
