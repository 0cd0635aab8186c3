//! Error types for sequence batching.
//!
//! Every fallible operation in the crate returns [`Result<T>`]. Nothing is
//! retried internally: a failure while building any example aborts the whole
//! minibatch and propagates to the caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    /// A read was attempted after the source was exhausted.
    #[error("No more data: the sequence source is exhausted")]
    NoMoreData,

    /// A classification label fell outside `[0, num_classes)`.
    #[error("Invalid class index {index}: expected a value in [0, {num_classes})")]
    InvalidIndex { index: i64, num_classes: usize },

    /// A classification label field could not be read as a class index.
    #[error("Invalid label value at time step {step}: {message}")]
    InvalidLabelValue { step: usize, message: String },

    /// The alignment mode name is not one of the known policies.
    #[error("Unsupported alignment mode: '{mode}'")]
    UnsupportedAlignment { mode: String },

    /// The operation cannot be answered by a forward-only stream.
    #[error("Operation not supported: {operation}")]
    NotSupported { operation: &'static str },

    /// Equal-length alignment was requested but sequence lengths differ.
    #[error(
        "Sequence length mismatch under EQUAL_LENGTH alignment: example {example} has {kind} length {actual}, expected {expected}"
    )]
    LengthMismatch {
        example: usize,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An example's vector width differs from the rest of the batch.
    #[error("Example {example} has {kind} width {actual}, batch width is {expected}")]
    WidthMismatch {
        example: usize,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A time step carries a different field count than the first step.
    #[error("Time step {step} has {actual} fields, first time step has {expected}")]
    RaggedTimeStep {
        step: usize,
        expected: usize,
        actual: usize,
    },

    /// The configured label column does not exist in a time step.
    #[error("Label field index {label_index} is out of range for a time step with {width} fields")]
    LabelIndexOutOfRange { label_index: usize, width: usize },

    /// Dual-source batching found a sequence whose partner source is exhausted.
    #[error("Unpaired sequence: the {missing} source ran out before its partner")]
    UnpairedSequence { missing: &'static str },

    /// A batch was assembled from zero examples.
    #[error("Cannot assemble a minibatch from zero examples")]
    EmptyBatch,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse '{path}' (row {row}, column {column}): {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BatchError>;

// Convenience constructors
impl BatchError {
    pub fn invalid_index(index: i64, num_classes: usize) -> Self {
        Self::InvalidIndex { index, num_classes }
    }

    pub fn invalid_label_value(step: usize, message: impl Into<String>) -> Self {
        Self::InvalidLabelValue {
            step,
            message: message.into(),
        }
    }

    pub fn unsupported_alignment(mode: impl Into<String>) -> Self {
        Self::UnsupportedAlignment { mode: mode.into() }
    }

    pub fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(
        path: impl Into<PathBuf>,
        row: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            row,
            column,
            message: message.into(),
        }
    }

    /// Whether this error marks the end of the stream rather than a fault.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::NoMoreData)
    }
}
