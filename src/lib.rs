//! Sequence Batcher
//!
//! Minibatch assembly for variable-length sequence data.
//!
//! # Overview
//!
//! This library turns a stream of per-example sequences into fixed-shape
//! minibatch tensors for sequence models (RNNs, temporal CNNs, transformers):
//!
//! - **Features**: `[batch, feature_width, time]`
//! - **Labels**: `[batch, label_width, time]`, one-hot classes or raw values
//! - **Masks**: `[batch, time]`, `1.0` for real data and `0.0` for padding
//!
//! Feature and label spans of one example may differ in length. The
//! [`AlignmentMode`] decides where each span sits on the shared time axis.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Sequence Batcher                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  source/        - Sequence sources (in-memory, CSV files)       │
//! │  record         - Time steps and field values                   │
//! │  extract        - Sequence → feature / label arrays             │
//! │  alignment      - Placement, padding and masks                  │
//! │  batcher        - Batch cursor, lookahead, reset                │
//! │  epochs         - Multi-epoch replay                            │
//! │  preprocessing/ - Minibatch hooks and normalization             │
//! │  config         - Construction-time settings (TOML / JSON)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sequence_batcher::prelude::*;
//!
//! // Features: 1 column. Labels: class index per time step.
//! let features = VecSequenceSource::from_rows(vec![
//!     vec![vec![0.1], vec![0.2], vec![0.3]],
//!     vec![vec![0.4], vec![0.5], vec![0.6], vec![0.7], vec![0.8]],
//! ]);
//! let labels = VecSequenceSource::from_rows(vec![
//!     vec![vec![1.0]],
//!     vec![vec![0.0]],
//! ]);
//!
//! let config = BatcherConfig::classification(2)
//!     .with_mini_batch_size(2)
//!     .with_alignment(AlignmentMode::AlignEnd);
//! let mut batcher = SequenceBatcher::dual(features, labels, config).unwrap();
//!
//! let batch = batcher.next_batch().unwrap();
//! assert_eq!(batch.features.dim(), (2, 1, 5));
//!
//! // Single label of example 0 sits at the last feature step (t = 2)
//! let labels_mask = batch.labels_mask.unwrap();
//! assert_eq!(labels_mask.row(0).to_vec(), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
//! assert_eq!(batch.labels[[0, 1, 2]], 1.0);
//! ```

pub mod alignment;
pub mod batcher;
pub mod config;
pub mod epochs;
pub mod error;
pub mod extract;
pub mod minibatch;
pub mod preprocessing;
pub mod record;
pub mod source;

// Re-exports - Core
pub use alignment::{align_batch, AlignmentMode, Placement};
pub use batcher::{
    DualSource, DualSourceBatcher, ExampleStream, MiniBatchIterator, SequenceBatcher,
    SingleSource, SingleSourceBatcher,
};
pub use config::BatcherConfig;
pub use epochs::{MiniBatchSplitter, MultiEpochIterator};
pub use error::{BatchError, Result};
pub use extract::{ExampleArrays, LabelEncoding, SequenceExtractor};
pub use minibatch::MiniBatch;
pub use record::{FieldValue, Sequence, TimeStep};

// Re-exports - Sources
pub use source::{CsvSequenceSource, SequenceSource, VecSequenceSource};

// Re-exports - Preprocessing
pub use preprocessing::{
    BatchPreProcessor, FeatureMinMaxScaler, FeatureStandardizer, PreProcessorChain,
};

pub mod prelude;
