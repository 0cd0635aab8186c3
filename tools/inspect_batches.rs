//! Minibatch Inspection Tool
//!
//! Configuration-driven tool that runs the batcher over CSV sequence files and
//! reports the shape and padding of every minibatch.
//!
//! # Input Layout
//!
//! - **Dual-source**: `<features_dir>` and `<labels_dir>` each hold one CSV
//!   file per sequence; files are paired by sorted file name
//! - **Single-source**: only `<features_dir>`; the config must set
//!   `label_index`
//!
//! # Usage
//!
//! ```bash
//! # Inspect batches
//! cargo run --release --bin inspect_batches -- --config batcher.toml data/features data/labels
//!
//! # Generate sample config
//! cargo run --release --bin inspect_batches -- --generate-config batcher.toml
//! ```
//!
//! Logging verbosity follows `RUST_LOG` (default `info`); `RUST_LOG=debug`
//! also logs every file read.

use sequence_batcher::{
    AlignmentMode, BatcherConfig, CsvSequenceSource, MiniBatch, MiniBatchIterator,
    SequenceBatcher,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 4 {
                eprintln!("Error: --config requires <path.toml> <features_dir> [labels_dir]");
                std::process::exit(1);
            }
            run_from_config(&args[2], &args[3], args.get(4).map(String::as_str));
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Minibatch Inspection Tool

Usage:
    {program} --config <path.toml> <features_dir> [labels_dir]   Inspect batches
    {program} --generate-config <path>                           Generate sample config
    {program} --help                                             Show this help

Without <labels_dir> the config must set label_index (single-source mode).
"#
    );
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let sample = BatcherConfig::classification(3)
        .with_mini_batch_size(32)
        .with_alignment(AlignmentMode::AlignEnd);

    match sample.save_toml(path) {
        Ok(()) => {
            println!("Generated sample config: {}", path);
            println!("\nEdit the following fields before running:");
            println!("  - num_classes / regression: label encoding");
            println!("  - alignment: EQUAL_LENGTH, ALIGN_START or ALIGN_END");
            println!("  - label_index: add for single-source data");
        }
        Err(e) => {
            eprintln!("Error generating config: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_from_config(config_path: &str, features_dir: &str, labels_dir: Option<&str>) {
    let config = match BatcherConfig::load_toml(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(path = config_path, error = %e, "failed to load config");
            std::process::exit(1);
        }
    };
    info!(
        mini_batch_size = config.mini_batch_size,
        alignment = %config.alignment,
        encoding = ?config.label_encoding(),
        "loaded configuration"
    );

    let result = match labels_dir {
        Some(labels_dir) => open_sources(features_dir)
            .and_then(|features| Ok((features, open_sources(labels_dir)?)))
            .and_then(|(features, labels)| SequenceBatcher::dual(features, labels, config))
            .and_then(|mut batcher| report(&mut batcher)),
        None => open_sources(features_dir)
            .and_then(|source| SequenceBatcher::single(source, config))
            .and_then(|mut batcher| report(&mut batcher)),
    };

    if let Err(e) = result {
        error!(error = %e, "batching failed");
        std::process::exit(1);
    }
}

fn open_sources(dir: &str) -> sequence_batcher::Result<CsvSequenceSource> {
    let source = CsvSequenceSource::from_dir(dir)?;
    info!(dir, files = source.paths().len(), "opened sequence directory");
    Ok(source)
}

fn report<I: MiniBatchIterator>(batcher: &mut I) -> sequence_batcher::Result<()> {
    let feature_width = batcher.feature_width()?;
    let label_width = batcher.label_width()?;
    info!(feature_width, label_width, "batch shape");

    let mut batches = 0usize;
    while batcher.has_next() {
        let batch = batcher.next_batch()?;
        log_batch(batches, &batch);
        batches += 1;
    }

    info!(batches, examples = batcher.cursor(), "done");
    Ok(())
}

fn log_batch(index: usize, batch: &MiniBatch) {
    let total = batch.num_examples() * batch.time_length();
    let valid = batch.valid_feature_steps();
    let padding_pct = if total == 0 {
        0.0
    } else {
        100.0 * (total - valid) as f64 / total as f64
    };

    info!(
        batch = index,
        examples = batch.num_examples(),
        time_length = batch.time_length(),
        masked = batch.has_masks(),
        padding_pct = %format!("{padding_pct:.1}"),
        "minibatch"
    );
}
