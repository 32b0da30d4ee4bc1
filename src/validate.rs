//! Read-only format check of a corpus.
//!
//! Inspects the first few lines of each resource and reports whether they
//! are canonical records. The keyword check is advisory and never fails a
//! line.

use crate::config::{CorpusConfig, Partition, ValidationConfig};
use serde_json::Value;
use std::path::PathBuf;

/// Characters shown in question/answer previews.
pub const PREVIEW_CHARS: usize = 50;

/// Result of checking one sampled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCheck {
    Valid {
        question_preview: String,
        answer_preview: String,
        /// Whether any domain keyword appears in the question or answer.
        has_keyword: bool,
    },
    MissingField(&'static str),
    InvalidJson(String),
}

impl LineCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, LineCheck::Valid { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Missing,
    Unreadable(String),
    Checked {
        total_lines: usize,
        /// Sampled lines as (1-based line number, check).
        lines: Vec<(usize, LineCheck)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub partition: Partition,
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    /// True when every resource exists and every sampled line is canonical.
    pub fn all_valid(&self) -> bool {
        self.files.iter().all(|f| match &f.status {
            FileStatus::Checked { lines, .. } => lines.iter().all(|(_, c)| c.is_valid()),
            _ => false,
        })
    }
}

/// First `max` characters of `text`, with "..." when truncated.
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn text_field(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Check a single line.
pub fn check_line(line: &str, keywords: &[String]) -> LineCheck {
    let value: Value = match serde_json::from_str(line.trim()) {
        Ok(v) => v,
        Err(e) => return LineCheck::InvalidJson(e.to_string()),
    };

    if value.get("question").is_none() {
        return LineCheck::MissingField("question");
    }
    if value.get("answer").is_none() {
        return LineCheck::MissingField("answer");
    }

    let question = text_field(&value, "question");
    let answer = text_field(&value, "answer");
    let has_keyword = keywords
        .iter()
        .any(|k| question.contains(k.as_str()) || answer.contains(k.as_str()));

    LineCheck::Valid {
        question_preview: preview(&question, PREVIEW_CHARS),
        answer_preview: preview(&answer, PREVIEW_CHARS),
        has_keyword,
    }
}

/// Check the leading lines of every corpus resource. Nothing is modified.
pub fn validate_corpus(corpus: &CorpusConfig, config: &ValidationConfig) -> ValidationReport {
    let files = Partition::ALL
        .iter()
        .map(|&partition| {
            let path = corpus.path(partition);
            let status = if !path.is_file() {
                FileStatus::Missing
            } else {
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        let lines = content
                            .lines()
                            .take(config.sample_lines)
                            .enumerate()
                            .map(|(i, line)| (i + 1, check_line(line, &config.keywords)))
                            .collect();
                        FileStatus::Checked {
                            total_lines: content.lines().count(),
                            lines,
                        }
                    }
                    Err(e) => FileStatus::Unreadable(e.to_string()),
                }
            };

            FileReport {
                partition,
                path,
                status,
            }
        })
        .collect();

    ValidationReport { files }
}
