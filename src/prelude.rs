//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```
//! use sequence_batcher::prelude::*;
//!
//! let config = BatcherConfig::regression().with_alignment(AlignmentMode::AlignStart);
//! assert!(config.validate().is_ok());
//! ```
//!
//! # What's Included
//!
//! ## Batching
//! - [`SequenceBatcher`] - Minibatch cursor over one or two sources
//! - [`MiniBatchIterator`] - Pull protocol (`has_next`, `next_batch`, `reset`)
//! - [`MultiEpochIterator`] - Multi-epoch replay
//! - [`MiniBatch`] - Output tensors and masks
//!
//! ## Configuration
//! - [`BatcherConfig`] - Batch size, label encoding, alignment
//! - [`AlignmentMode`] - `EQUAL_LENGTH`, `ALIGN_START`, `ALIGN_END`
//!
//! ## Sources
//! - [`SequenceSource`] - Sequence source trait
//! - [`VecSequenceSource`], [`CsvSequenceSource`]
//!
//! ## Preprocessing
//! - [`BatchPreProcessor`], [`PreProcessorChain`]
//! - [`FeatureStandardizer`], [`FeatureMinMaxScaler`]

pub use crate::alignment::AlignmentMode;
pub use crate::batcher::{MiniBatchIterator, SequenceBatcher};
pub use crate::config::BatcherConfig;
pub use crate::epochs::MultiEpochIterator;
pub use crate::error::{BatchError, Result};
pub use crate::minibatch::MiniBatch;
pub use crate::preprocessing::{
    BatchPreProcessor, FeatureMinMaxScaler, FeatureStandardizer, Normalizer, PreProcessorChain,
};
pub use crate::record::{FieldValue, Sequence};
pub use crate::source::{CsvSequenceSource, SequenceSource, VecSequenceSource};
