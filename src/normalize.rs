//! Format normalization.
//!
//! Rewrites a JSONL resource so every line is a canonical
//! `{"question": ..., "answer": ...}` object. Lines that cannot be
//! normalized are skipped with a warning; they never abort the run.

use crate::config::{CorpusConfig, Partition};
use crate::error::{DatasetError, Result};
use crate::record::{Decoded, LineIssue, decode_line};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to an original file when it is replaced.
pub const BACKUP_SUFFIX: &str = ".backup";

/// A line that produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub issue: LineIssue,
}

/// Outcome of normalizing one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Records written to the output.
    pub converted: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Normalize a single line, returning the text to emit (without newline).
///
/// Canonical lines are returned unchanged; conversation lines are rewritten.
pub fn normalize_line(line: &str) -> std::result::Result<String, LineIssue> {
    match decode_line(line)? {
        Decoded::Canonical(record) if record.is_complete() => Ok(line.to_string()),
        Decoded::Canonical(_) => Err(LineIssue::MissingField),
        Decoded::Conversation(conversation) => {
            let record = conversation.to_record().ok_or(LineIssue::MissingField)?;
            record
                .to_json_line()
                .map_err(|e| LineIssue::InvalidJson(e.to_string()))
        }
    }
}

/// Decode a raw line as UTF-8 and strip its `\n` / `\r\n` terminator.
///
/// Invalid UTF-8 is reported as a line issue so callers can skip the line.
pub(crate) fn line_text(buf: &[u8]) -> std::result::Result<&str, LineIssue> {
    let text = std::str::from_utf8(buf).map_err(|e| LineIssue::InvalidJson(e.to_string()))?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    Ok(text.strip_suffix('\r').unwrap_or(text))
}

/// Normalize every line of `reader` into `writer`.
///
/// Blank lines are ignored. Only I/O failures are returned as errors.
pub fn normalize_reader<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
) -> io::Result<NormalizeReport> {
    let mut report = NormalizeReport::default();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_num += 1;

        let result = match line_text(&buf) {
            Ok(text) if text.trim().is_empty() => continue,
            Ok(text) => normalize_line(text),
            Err(issue) => Err(issue),
        };

        match result {
            Ok(out) => {
                writer.write_all(out.as_bytes())?;
                writer.write_all(b"\n")?;
                report.converted += 1;
            }
            Err(issue) => {
                tracing::warn!("Line {} skipped: {}", line_num, issue);
                report.skipped.push(SkippedLine {
                    line: line_num,
                    issue,
                });
            }
        }
    }

    writer.flush()?;
    Ok(report)
}

/// Normalize `input` into `output`, truncating `output` first.
pub fn normalize_file(input: &Path, output: &Path) -> Result<NormalizeReport> {
    let reader = File::open(input)
        .map(BufReader::new)
        .map_err(|e| DatasetError::io(input, e))?;
    let writer = File::create(output)
        .map(BufWriter::new)
        .map_err(|e| DatasetError::io(output, e))?;

    let report = normalize_reader(reader, writer).map_err(|e| DatasetError::io(input, e))?;

    tracing::info!(
        "Normalized {} -> {}: {} records, {} skipped",
        input.display(),
        output.display(),
        report.converted,
        report.skipped.len()
    );

    Ok(report)
}

/// Path the converted copy of `input` is written to: `train.jsonl` -> `train_new.jsonl`.
pub fn converted_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");

    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_new.{}", stem, ext),
        None => format!("{}_new", stem),
    };

    input.with_file_name(name)
}

/// Per-resource result of a corpus conversion.
#[derive(Debug)]
pub enum ConversionOutcome {
    Converted {
        partition: Partition,
        input: PathBuf,
        output: PathBuf,
        report: NormalizeReport,
    },
    Missing {
        partition: Partition,
        input: PathBuf,
    },
    Failed {
        partition: Partition,
        input: PathBuf,
        error: DatasetError,
    },
}

impl ConversionOutcome {
    /// Records written, zero unless converted.
    pub fn converted(&self) -> usize {
        match self {
            ConversionOutcome::Converted { report, .. } => report.converted,
            _ => 0,
        }
    }
}

/// Convert all three corpus resources into `*_new.jsonl` siblings.
///
/// Each resource is handled on its own; a missing or failing one does not
/// stop the others.
pub fn convert_corpus(corpus: &CorpusConfig) -> Vec<ConversionOutcome> {
    Partition::ALL
        .iter()
        .map(|&partition| {
            let input = corpus.path(partition);

            if !input.is_file() {
                tracing::warn!("Input file not found: {}", input.display());
                return ConversionOutcome::Missing { partition, input };
            }

            let output = converted_path(&input);
            match normalize_file(&input, &output) {
                Ok(report) => ConversionOutcome::Converted {
                    partition,
                    input,
                    output,
                    report,
                },
                Err(error) => {
                    tracing::warn!("Conversion of {} failed: {}", input.display(), error);
                    ConversionOutcome::Failed {
                        partition,
                        input,
                        error,
                    }
                }
            }
        })
        .collect()
}

/// A completed replacement of an original by its converted copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub original: PathBuf,
    /// Where the previous original now lives, if there was one.
    pub backup: Option<PathBuf>,
}

/// First free name among `<original>.backup`, `<original>.backup.1`, ...
fn backup_path(original: &Path) -> PathBuf {
    let mut base = original.as_os_str().to_os_string();
    base.push(BACKUP_SUFFIX);

    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        let mut name = base.clone();
        name.push(format!(".{}", n));
        candidate = PathBuf::from(name);
        n += 1;
    }
    candidate
}

/// Move `original` aside to a fresh `<original>.backup[.N]`, then move
/// `converted` into its place. Earlier backups are never overwritten.
pub fn replace_with_converted(original: &Path, converted: &Path) -> Result<Replacement> {
    if !converted.is_file() {
        return Err(DatasetError::io(
            converted,
            io::Error::new(io::ErrorKind::NotFound, "converted file not found"),
        ));
    }

    let backup = if original.exists() {
        let backup = backup_path(original);
        fs::rename(original, &backup).map_err(|e| DatasetError::io(original, e))?;
        tracing::info!("Backed up {} -> {}", original.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    fs::rename(converted, original).map_err(|e| DatasetError::io(converted, e))?;

    Ok(Replacement {
        original: original.to_path_buf(),
        backup,
    })
}

/// Replace every successfully converted original with its converted copy.
pub fn replace_corpus(outcomes: &[ConversionOutcome]) -> Vec<Result<Replacement>> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ConversionOutcome::Converted { input, output, .. } => {
                Some(replace_with_converted(input, output))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn normalize_str(input: &str) -> (String, NormalizeReport) {
        let mut out = Vec::new();
        let report = normalize_reader(input.as_bytes(), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), report)
    }

    #[test]
    fn test_mixed_input_scenario() {
        let input = concat!(
            r#"{"messages":[{"role":"user","content":"Q1"},{"role":"assistant","content":"A1"}]}"#,
            "\n",
            r#"{"question":"Q2","answer":"A2"}"#,
            "\n",
            r#"{"bad":"shape"}"#,
            "\n",
        );

        let (out, report) = normalize_str(input);

        assert_eq!(report.converted, 2);
        assert_eq!(
            out,
            "{\"question\":\"Q1\",\"answer\":\"A1\"}\n{\"question\":\"Q2\",\"answer\":\"A2\"}\n"
        );
        assert_eq!(
            report.skipped,
            vec![SkippedLine {
                line: 3,
                issue: LineIssue::UnrecognizedShape
            }]
        );
    }

    #[test]
    fn test_canonical_lines_copied_verbatim() {
        let input = "{ \"question\" : \"Q\",  \"answer\": \"A\", \"source\": 3 }\n";
        let (out, report) = normalize_str(input);
        assert_eq!(out, input);
        assert_eq!(report.converted, 1);
    }

    #[test]
    fn test_malformed_lines_do_not_abort() {
        let input = "{not json\n{\"question\":\"Q\",\"answer\":\"A\"}\n\n{\"messages\":[{\"role\":\"user\",\"content\":\"Q\"}]}\n";
        let (out, report) = normalize_str(input);

        assert_eq!(report.converted, 1);
        assert_eq!(out, "{\"question\":\"Q\",\"answer\":\"A\"}\n");
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0].issue, LineIssue::InvalidJson(_)));
        assert_eq!(report.skipped[0].line, 1);
        assert_eq!(report.skipped[1].line, 4);
        assert_eq!(report.skipped[1].issue, LineIssue::MissingField);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(b"{\"question\":\"Q\",\"answer\":\"A\"}");
        let mut out = Vec::new();
        let report = normalize_reader(&input[..], &mut out).unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(report.skipped[0].line, 1);
    }

    #[test]
    fn test_normalizing_output_is_idempotent() {
        let input = concat!(
            r#"{"messages":[{"role":"user","content":"什么是CUDA？"},{"role":"assistant","content":"NVIDIA的并行计算平台"}]}"#,
            "\n",
            r#"{"question":"Q2","answer":"A2"}"#,
            "\r\n",
            "garbage\n",
        );
        let (first, _) = normalize_str(input);
        let (second, report) = normalize_str(&first);
        assert_eq!(first, second);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_converted_path() {
        assert_eq!(
            converted_path(Path::new("GPU-QA/train.jsonl")),
            PathBuf::from("GPU-QA/train_new.jsonl")
        );
        assert_eq!(converted_path(Path::new("data")), PathBuf::from("data_new"));
    }

    #[test]
    fn test_normalize_file_truncates_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        fs::write(&input, "{\"question\":\"Q\",\"answer\":\"A\"}\n").unwrap();
        fs::write(&output, "stale content that is much longer than the output\n").unwrap();

        let report = normalize_file(&input, &output).unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "{\"question\":\"Q\",\"answer\":\"A\"}\n"
        );
    }

    #[test]
    fn test_convert_corpus_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let corpus = CorpusConfig::in_dir(dir.path());
        fs::write(
            corpus.path(Partition::Train),
            "{\"messages\":[{\"role\":\"user\",\"content\":\"Q\"},{\"role\":\"assistant\",\"content\":\"A\"}]}\n",
        )
        .unwrap();
        fs::write(corpus.path(Partition::Test), "{\"question\":\"Q\",\"answer\":\"A\"}\n").unwrap();

        let outcomes = convert_corpus(&corpus);

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            outcomes[1],
            ConversionOutcome::Missing {
                partition: Partition::Validation,
                ..
            }
        ));
        assert_eq!(outcomes.iter().map(|o| o.converted()).sum::<usize>(), 2);
        assert!(dir.path().join("train_new.jsonl").is_file());
        assert!(dir.path().join("test_new.jsonl").is_file());
    }

    #[test]
    fn test_replace_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let corpus = CorpusConfig::in_dir(dir.path());
        let original = corpus.path(Partition::Train);
        let legacy = "{\"messages\":[{\"role\":\"user\",\"content\":\"Q\"},{\"role\":\"assistant\",\"content\":\"A\"}]}\n";
        fs::write(&original, legacy).unwrap();

        let outcomes = convert_corpus(&corpus);
        let replaced = replace_corpus(&outcomes);

        assert_eq!(replaced.len(), 1);
        let replacement = replaced.into_iter().next().unwrap().unwrap();
        let backup = replacement.backup.unwrap();
        assert_eq!(backup, dir.path().join("train.jsonl.backup"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), legacy);
        assert_eq!(
            fs::read_to_string(&original).unwrap(),
            "{\"question\":\"Q\",\"answer\":\"A\"}\n"
        );
        assert!(!dir.path().join("train_new.jsonl").exists());
    }

    #[test]
    fn test_repeated_replace_keeps_every_backup() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("train.jsonl");
        let converted = dir.path().join("train_new.jsonl");

        fs::write(&original, "first\n").unwrap();
        fs::write(&converted, "second\n").unwrap();
        let first = replace_with_converted(&original, &converted).unwrap();

        fs::write(&converted, "third\n").unwrap();
        let second = replace_with_converted(&original, &converted).unwrap();

        let first_backup = first.backup.unwrap();
        let second_backup = second.backup.unwrap();
        assert_eq!(first_backup, dir.path().join("train.jsonl.backup"));
        assert_eq!(second_backup, dir.path().join("train.jsonl.backup.1"));
        assert_eq!(fs::read_to_string(&first_backup).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(&second_backup).unwrap(), "second\n");
        assert_eq!(fs::read_to_string(&original).unwrap(), "third\n");
    }

    #[test]
    fn test_replace_requires_converted_file() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("train.jsonl");
        fs::write(&original, "x\n").unwrap();

        let result = replace_with_converted(&original, &dir.path().join("missing.jsonl"));
        assert!(result.is_err());
        assert!(original.is_file());
    }
}
