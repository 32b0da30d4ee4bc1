//! Corpus sources: the built-in sample set and CSV import.

use crate::error::{DatasetError, Result};
use crate::record::QaRecord;
use std::path::Path;

/// Default CSV column names.
pub const DEFAULT_QUESTION_COLUMN: &str = "question";
pub const DEFAULT_ANSWER_COLUMN: &str = "answer";

/// A small GPU knowledge corpus for trying out the pipeline.
pub fn sample_records() -> Vec<QaRecord> {
    vec![
        QaRecord::new(
            "What is a GPU?",
            "A GPU (Graphics Processing Unit) is a processor built for graphics and parallel \
             workloads. Instead of a few powerful cores it has thousands of small ones that run \
             many simple calculations at once, which suits rendering, deep learning and \
             scientific computing.",
        ),
        QaRecord::new(
            "How does a GPU differ from a CPU?",
            "1. Cores: a CPU has a handful of strong cores, a GPU has hundreds to thousands of \
             smaller ones.\n2. Execution: CPUs excel at sequential, branch-heavy code; GPUs at \
             data-parallel math.\n3. Memory: CPUs rely on large caches, GPUs on high-bandwidth \
             VRAM.\n4. Use: CPUs for general logic, GPUs for rendering and parallel compute.",
        ),
        QaRecord::new(
            "How do I choose a graphics card?",
            "Consider the workload (gaming, design, deep learning), the budget, the target \
             resolution and frame rate, compatibility with the motherboard, power supply and \
             case, and the amount of VRAM: 8GB+ for 4K gaming, 12GB+ for training models.",
        ),
        QaRecord::new(
            "What is CUDA?",
            "CUDA (Compute Unified Device Architecture) is NVIDIA's parallel computing platform \
             and programming model. It extends C/C++ so general-purpose code can run on the GPU, \
             accelerating scientific computing, deep learning and image processing.",
        ),
        QaRecord::new(
            "What can I do when I run out of VRAM?",
            "1. Lower texture quality, resolution or model size.\n2. Reduce the batch size or \
             use gradient accumulation.\n3. Compress, quantize or prune the model.\n4. Free \
             unused tensors promptly.\n5. Upgrade to a card with more VRAM.\n6. Spread the work \
             over several GPUs.",
        ),
    ]
}

/// Load question/answer pairs from a CSV file with a header row.
///
/// Rows where either column is empty are skipped with a warning.
pub fn load_csv(path: &Path, question_col: &str, answer_col: &str) -> Result<Vec<QaRecord>> {
    let csv_error = |e: csv::Error| DatasetError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let q_idx = column(question_col)?;
    let a_idx = column(answer_col)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_data = result.map_err(csv_error)?;
        let question = row_data.get(q_idx).unwrap_or("").trim();
        let answer = row_data.get(a_idx).unwrap_or("").trim();

        let record = QaRecord::new(question, answer);
        if record.is_complete() {
            records.push(record);
        } else {
            // +2: header row and 1-based numbering
            tracing::warn!(
                "{}: row {} has an empty question or answer, skipping",
                path.display(),
                row + 2
            );
        }
    }

    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sample_records() {
        let records = sample_records();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(QaRecord::is_complete));
    }

    #[test]
    fn test_load_csv_with_custom_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qa.csv");
        fs::write(
            &path,
            "id,prompt,reply\n1,What is VRAM?,Video memory\n2,\"Is it fast, though?\",\"Yes, very\"\n3,,orphan\n",
        )
        .unwrap();

        let records = load_csv(&path, "prompt", "reply").unwrap();
        assert_eq!(
            records,
            vec![
                QaRecord::new("What is VRAM?", "Video memory"),
                QaRecord::new("Is it fast, though?", "Yes, very"),
            ]
        );
    }

    #[test]
    fn test_load_csv_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qa.csv");
        fs::write(&path, "question,response\nQ,A\n").unwrap();

        let err = load_csv(&path, DEFAULT_QUESTION_COLUMN, DEFAULT_ANSWER_COLUMN).unwrap_err();
        assert!(
            matches!(err, DatasetError::MissingColumn { ref column, .. } if column == "answer")
        );
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv(Path::new("/nonexistent/qa.csv"), "question", "answer");
        assert!(matches!(result, Err(DatasetError::Csv { .. })));
    }
}
