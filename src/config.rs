//! Batcher configuration management.
//!
//! [`BatcherConfig`] carries everything fixed at construction time: minibatch
//! size, label encoding, alignment mode and (single-source only) the label
//! column. It serializes to TOML or JSON for experiment reproducibility.
//!
//! # Example
//!
//! ```ignore
//! use sequence_batcher::{AlignmentMode, BatcherConfig};
//!
//! let config = BatcherConfig::classification(3)
//!     .with_mini_batch_size(32)
//!     .with_alignment(AlignmentMode::AlignEnd);
//!
//! config.save_toml("batcher.toml")?;
//! let loaded = BatcherConfig::load_toml("batcher.toml")?;
//! ```
//!
//! The TOML form:
//!
//! ```toml
//! mini_batch_size = 32
//! num_classes = 3
//! regression = false
//! alignment = "ALIGN_END"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentMode;
use crate::error::{BatchError, Result};
use crate::extract::LabelEncoding;

/// Default number of examples per minibatch.
pub const DEFAULT_MINI_BATCH_SIZE: usize = 10;

/// Construction-time configuration of a [`crate::SequenceBatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatcherConfig {
    /// Examples per minibatch (the tail batch may be smaller)
    #[serde(default = "default_mini_batch_size")]
    pub mini_batch_size: usize,

    /// Number of classes for one-hot labels (ignored for regression)
    #[serde(default)]
    pub num_classes: usize,

    /// Raw label values instead of one-hot class vectors
    #[serde(default)]
    pub regression: bool,

    /// Placement policy for variable-length spans
    #[serde(default)]
    pub alignment: AlignmentMode,

    /// Label column within each time step (single-source batching only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_index: Option<usize>,
}

fn default_mini_batch_size() -> usize {
    DEFAULT_MINI_BATCH_SIZE
}

impl Default for BatcherConfig {
    /// Binary classification, minibatch size 10, `EQUAL_LENGTH`.
    fn default() -> Self {
        Self {
            mini_batch_size: DEFAULT_MINI_BATCH_SIZE,
            num_classes: 2,
            regression: false,
            alignment: AlignmentMode::EqualLength,
            label_index: None,
        }
    }
}

impl BatcherConfig {
    pub fn new(mini_batch_size: usize, num_classes: usize, regression: bool) -> Self {
        Self {
            mini_batch_size,
            num_classes,
            regression,
            ..Default::default()
        }
    }

    /// Classification with one-hot labels over `num_classes` classes.
    pub fn classification(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Default::default()
        }
    }

    /// Regression with raw label values.
    pub fn regression() -> Self {
        Self {
            num_classes: 0,
            regression: true,
            ..Default::default()
        }
    }

    pub fn with_mini_batch_size(mut self, size: usize) -> Self {
        self.mini_batch_size = size;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentMode) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the label column for single-source batching.
    pub fn with_label_index(mut self, index: usize) -> Self {
        self.label_index = Some(index);
        self
    }

    /// Label encoding derived from `regression` and `num_classes`.
    pub fn label_encoding(&self) -> LabelEncoding {
        LabelEncoding::from_flags(self.regression, self.num_classes)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.mini_batch_size == 0 {
            return Err(BatchError::config("mini_batch_size must be > 0"));
        }

        if !self.regression && self.num_classes == 0 {
            return Err(BatchError::config(
                "num_classes must be > 0 for classification",
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// An unknown `alignment` name fails with
    /// [`BatchError::UnsupportedAlignment`].
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&contents)?;
        check_alignment_name(table.get("alignment").and_then(toml::Value::as_str))?;

        let config: BatcherConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        check_alignment_name(value.get("alignment").and_then(serde_json::Value::as_str))?;

        let config: BatcherConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }
}

/// Surface a bad mode name as its own error rather than a format error.
fn check_alignment_name(name: Option<&str>) -> Result<()> {
    if let Some(name) = name {
        name.parse::<AlignmentMode>()?;
    }
    Ok(())
}
