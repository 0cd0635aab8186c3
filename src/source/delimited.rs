//! CSV-backed sequence source.
//!
//! Each file holds one sequence and each row is one time step. Every column
//! is parsed as `f64`; classification labels stored as `2` or `2.0` are both
//! accepted by the extractor.
//!
//! # File Sets
//!
//! | Constructor | Files |
//! |-------------|-------|
//! | [`CsvSequenceSource::new`] | explicit list, in the given order |
//! | [`CsvSequenceSource::from_dir`] | regular files in a directory, sorted by name |
//! | [`CsvSequenceSource::numbered`] | `pattern` with `%d` replaced by each index in `min..=max` |
//!
//! Feature and label files for dual-source batching are usually produced as
//! two numbered sets with matching indices:
//!
//! ```ignore
//! let features = CsvSequenceSource::numbered("data/features_%d.csv", 0, 99);
//! let labels = CsvSequenceSource::numbered("data/labels_%d.csv", 0, 99);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BatchError, Result};
use crate::record::{FieldValue, Sequence, TimeStep};

use super::SequenceSource;

/// Reads one sequence per CSV file.
#[derive(Debug, Clone)]
pub struct CsvSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    skip_lines: usize,
    delimiter: u8,
}

impl CsvSequenceSource {
    /// Source over an explicit list of files.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            position: 0,
            skip_lines: 0,
            delimiter: b',',
        }
    }

    /// Source over every regular file in `dir`, sorted by file name.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(BatchError::config(format!(
                "no sequence files found in '{}'",
                dir.as_ref().display()
            )));
        }

        Ok(Self::new(paths))
    }

    /// Source over a numbered file set.
    ///
    /// `pattern` must contain `%d`, which is replaced by each index from
    /// `min` to `max` inclusive.
    ///
    /// ```
    /// use sequence_batcher::source::CsvSequenceSource;
    ///
    /// let source = CsvSequenceSource::numbered("seq_%d.csv", 0, 2);
    /// assert_eq!(source.paths()[2].to_str(), Some("seq_2.csv"));
    /// ```
    pub fn numbered(pattern: &str, min: usize, max: usize) -> Self {
        Self::new((min..=max).map(|i| pattern.replace("%d", &i.to_string())))
    }

    /// Skip the first `lines` rows of every file (e.g. a header).
    pub fn with_skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Field delimiter (default `,`).
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of files read since the last reset.
    pub fn position(&self) -> usize {
        self.position
    }

    fn read_file(&self, path: &Path) -> Result<Sequence> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(path)?;

        let mut steps: Vec<TimeStep> = Vec::new();
        for (row, record) in reader.records().enumerate().skip(self.skip_lines) {
            let record = record?;
            let step = record
                .iter()
                .enumerate()
                .map(|(column, field)| {
                    field
                        .trim()
                        .parse::<f64>()
                        .map(FieldValue::Real)
                        .map_err(|e| BatchError::parse(path, row, column, e.to_string()))
                })
                .collect::<Result<TimeStep>>()?;
            steps.push(step);
        }

        debug!(path = %path.display(), steps = steps.len(), "read sequence file");
        Ok(Sequence::new(steps))
    }
}

impl SequenceSource for CsvSequenceSource {
    fn has_next(&self) -> bool {
        self.position < self.paths.len()
    }

    fn next_sequence(&mut self) -> Result<Sequence> {
        let path = self.paths.get(self.position).ok_or(BatchError::NoMoreData)?;
        let sequence = self.read_file(path)?;
        self.position += 1;
        Ok(sequence)
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}
