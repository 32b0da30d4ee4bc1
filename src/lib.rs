//! QA dataset tools - prepare question/answer corpora for fine-tuning.
//!
//! A corpus is a directory of three JSONL resources (`train.jsonl`,
//! `validation.jsonl`, `test.jsonl`), one canonical record per line:
//!
//! ```json
//! {"question": "What is CUDA?", "answer": "NVIDIA's parallel computing platform."}
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use qa_dataset_tools::{
//!     config::Config,
//!     split::{SplitPolicy, read_records, split_records, write_corpus},
//!     validate::validate_corpus,
//! };
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     // Accepts canonical and conversation-form lines alike
//!     let records = read_records(Path::new("all.jsonl"))?;
//!
//!     let splits = split_records(records, &config.split, SplitPolicy::FixedRatio);
//!     write_corpus(&config.corpus, &splits)?;
//!
//!     let report = validate_corpus(&config.corpus, &config.validation);
//!     println!("corpus valid: {}", report.all_valid());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **record**: canonical and conversation record shapes, tagged decode
//! - **normalize**: rewrite a resource into canonical form, backup-on-replace
//! - **split**: deterministic 70/20/10 partitioning and corpus writing
//! - **validate**: read-only format check
//! - **dataset**: built-in sample corpus and CSV import
//! - **registry**: artifact staging and upload to a model registry

pub mod config;
pub mod dataset;
pub mod error;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod split;
pub mod validate;

// Re-export commonly used types
pub use config::{Config, CorpusConfig, Partition, SplitConfig};
pub use error::{DatasetError, Result};
pub use normalize::{NormalizeReport, convert_corpus, normalize_file};
pub use record::{Conversation, QaRecord, Turn};
pub use split::{SplitPolicy, Splits, split_records};
pub use validate::{ValidationReport, validate_corpus};
