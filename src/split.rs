//! Deterministic train/validation/test splitting.
//!
//! Records are partitioned purely by input order: no shuffling and no
//! stratification, so identical input always gives identical splits.

use crate::config::{CorpusConfig, Partition, SplitConfig};
use crate::error::{DatasetError, Result};
use crate::normalize::line_text;
use crate::record::{QaRecord, decode_record};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// How records are distributed across the three partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitPolicy {
    /// Always apply the configured ratios.
    #[default]
    FixedRatio,
    /// Put everything in train when there are fewer records than
    /// `small_dataset_threshold`; otherwise apply the ratios.
    SmallToTrain,
}

/// The three ordered, disjoint partitions of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
    pub test: Vec<T>,
}

impl<T> Splits<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, partition: Partition) -> &[T] {
        match partition {
            Partition::Train => &self.train,
            Partition::Validation => &self.validation,
            Partition::Test => &self.test,
        }
    }

    /// Concatenate the partitions back in corpus order.
    pub fn into_ordered(self) -> Vec<T> {
        let mut all = self.train;
        all.extend(self.validation);
        all.extend(self.test);
        all
    }
}

/// Sizes of train and validation for `total` records; test takes the rest.
pub fn split_sizes(total: usize, config: &SplitConfig) -> (usize, usize) {
    let train = ((total as f64) * config.train_ratio).floor() as usize;
    let train = train.min(total);
    let validation = ((total as f64) * config.validation_ratio).floor() as usize;
    let validation = validation.min(total - train);
    (train, validation)
}

/// Partition `records` in order according to `policy`.
pub fn split_records<T>(
    mut records: Vec<T>,
    config: &SplitConfig,
    policy: SplitPolicy,
) -> Splits<T> {
    let total = records.len();

    if policy == SplitPolicy::SmallToTrain && total < config.small_dataset_threshold {
        tracing::debug!(
            "Small dataset ({} < {}): all records go to train",
            total,
            config.small_dataset_threshold
        );
        return Splits {
            train: records,
            validation: Vec::new(),
            test: Vec::new(),
        };
    }

    let (train_size, val_size) = split_sizes(total, config);

    // split_off leaves [0..at) in place and returns [at..)
    let test = records.split_off(train_size + val_size);
    let validation = records.split_off(train_size);

    tracing::debug!(
        "Dataset split: {} train, {} validation, {} test",
        records.len(),
        validation.len(),
        test.len()
    );

    Splits {
        train: records,
        validation,
        test,
    }
}

/// Line counts written for each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusSummary {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

impl CorpusSummary {
    pub fn total(&self) -> usize {
        self.train + self.validation + self.test
    }
}

/// Write records as JSONL, replacing any existing file.
pub fn write_jsonl(path: &Path, records: &[QaRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }
    }

    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let line = record.to_json_line()?;
        writeln!(writer, "{}", line).map_err(|e| DatasetError::io(path, e))?;
    }

    writer.flush().map_err(|e| DatasetError::io(path, e))?;
    Ok(())
}

/// Write all three partitions into the corpus directory.
pub fn write_corpus(corpus: &CorpusConfig, splits: &Splits<QaRecord>) -> Result<CorpusSummary> {
    for partition in Partition::ALL {
        let path = corpus.path(partition);
        let records = splits.get(partition);
        write_jsonl(&path, records)?;
        tracing::info!("Saved {} records to {}", records.len(), path.display());
    }

    Ok(CorpusSummary {
        train: splits.train.len(),
        validation: splits.validation.len(),
        test: splits.test.len(),
    })
}

/// Read canonical records from a JSONL file, accepting either record shape.
///
/// Lines that do not yield a complete record are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<QaRecord>> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DatasetError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_num += 1;

        let result = match line_text(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => decode_record(line),
            Err(issue) => Err(issue),
        };

        match result {
            Ok(record) => records.push(record),
            Err(issue) => {
                tracing::warn!("{}: line {} skipped: {}", path.display(), line_num, issue);
            }
        }
    }

    Ok(records)
}
