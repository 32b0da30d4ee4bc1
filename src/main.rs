//! QA dataset tools CLI
//!
//! Convert, split, check and publish question/answer fine-tuning datasets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qa_dataset_tools::{
    config::{Config, Partition},
    dataset::{DEFAULT_ANSWER_COLUMN, DEFAULT_QUESTION_COLUMN, load_csv, sample_records},
    normalize::{ConversionOutcome, convert_corpus, replace_corpus},
    record::QaRecord,
    registry::{ModelId, RegistryClient, manual_upload_instructions},
    split::{SplitPolicy, read_records, split_records, write_corpus},
    validate::{FileStatus, LineCheck, validate_corpus},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// QA dataset tools - prepare question/answer corpora for fine-tuning
#[derive(Parser)]
#[command(name = "qa-dataset")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Corpus directory (overrides config and QA_CORPUS_DIR)
    #[arg(long, global = true)]
    corpus_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert conversation-form records into question/answer records
    Convert {
        /// Replace the originals with the converted files, keeping .backup copies
        #[arg(long)]
        replace: bool,
    },

    /// Split a JSONL file into train/validation/test
    Split {
        /// Input JSONL file (canonical or conversation records)
        input: PathBuf,

        /// Put everything into train when the dataset is small
        #[arg(long)]
        small_to_train: bool,
    },

    /// Create a corpus from a built-in sample or a CSV file
    Create {
        /// Put everything into train when the dataset is small
        #[arg(long)]
        small_to_train: bool,

        #[command(subcommand)]
        source: CreateSource,
    },

    /// Check the format of the corpus files
    Validate,

    /// Upload trained artifacts to the model registry
    Upload,
}

#[derive(Subcommand)]
enum CreateSource {
    /// Built-in GPU knowledge sample
    Sample,

    /// Import question/answer columns from a CSV file
    Csv {
        /// Path to the CSV file
        path: PathBuf,

        /// Column holding the question
        #[arg(long, default_value = DEFAULT_QUESTION_COLUMN)]
        question_col: String,

        /// Column holding the answer
        #[arg(long, default_value = DEFAULT_ANSWER_COLUMN)]
        answer_col: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("qa_dataset_tools=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.corpus_dir {
        config.corpus.dir = dir;
    }
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Convert { replace } => cmd_convert(&config, replace),
        Commands::Split {
            input,
            small_to_train,
        } => cmd_split(&config, input, policy(small_to_train)),
        Commands::Create {
            small_to_train,
            source,
        } => cmd_create(&config, source, policy(small_to_train)),
        Commands::Validate => cmd_validate(&config),
        Commands::Upload => cmd_upload(&config).await,
    }
}

fn policy(small_to_train: bool) -> SplitPolicy {
    if small_to_train {
        SplitPolicy::SmallToTrain
    } else {
        SplitPolicy::FixedRatio
    }
}

fn cmd_convert(config: &Config, replace: bool) -> Result<()> {
    println!("Converting corpus in: {}", config.corpus.dir.display());

    let outcomes = convert_corpus(&config.corpus);
    for outcome in &outcomes {
        match outcome {
            ConversionOutcome::Converted {
                input,
                output,
                report,
                ..
            } => {
                println!(
                    "  {} -> {}: {} records ({} skipped)",
                    input.display(),
                    output.display(),
                    report.converted,
                    report.skipped.len()
                );
            }
            ConversionOutcome::Missing { input, .. } => {
                println!("  {}: not found, skipped", input.display());
            }
            ConversionOutcome::Failed { input, error, .. } => {
                println!("  {}: failed: {}", input.display(), error);
            }
        }
    }

    let total: usize = outcomes.iter().map(|o| o.converted()).sum();
    if total == 0 {
        println!("\nNo records converted.");
        return Ok(());
    }
    println!("\nConverted {} records in total.", total);

    if !replace {
        println!("Converted files saved as *_new.jsonl; rerun with --replace to swap them in.");
        return Ok(());
    }

    for result in replace_corpus(&outcomes) {
        match result {
            Ok(replacement) => {
                if let Some(backup) = replacement.backup {
                    println!("  Backed up original to {}", backup.display());
                }
                println!("  Replaced {}", replacement.original.display());
            }
            Err(e) => println!("  Replace failed: {}", e),
        }
    }
    println!("\nRun 'qa-dataset validate' to check the new files.");

    Ok(())
}

fn write_splits(config: &Config, records: Vec<QaRecord>, policy: SplitPolicy) -> Result<()> {
    let splits = split_records(records, &config.split, policy);
    let summary = write_corpus(&config.corpus, &splits).context("Failed to write corpus")?;

    println!("\nDataset statistics:");
    println!("  Train:       {}", summary.train);
    println!("  Validation:  {}", summary.validation);
    println!("  Test:        {}", summary.test);
    println!("  Total:       {}", summary.total());
    println!("  Written to:  {}", config.corpus.dir.display());

    Ok(())
}

fn cmd_split(config: &Config, input: PathBuf, policy: SplitPolicy) -> Result<()> {
    let records = read_records(&input)
        .with_context(|| format!("Failed to read records from '{}'", input.display()))?;

    if records.is_empty() {
        anyhow::bail!("No usable records in '{}'", input.display());
    }

    write_splits(config, records, policy)
}

fn cmd_create(config: &Config, source: CreateSource, policy: SplitPolicy) -> Result<()> {
    let records = match source {
        CreateSource::Sample => sample_records(),
        CreateSource::Csv {
            path,
            question_col,
            answer_col,
        } => load_csv(&path, &question_col, &answer_col).context("Failed to import CSV")?,
    };

    if records.is_empty() {
        anyhow::bail!("No question/answer pairs to write");
    }

    write_splits(config, records, policy)
}

fn cmd_validate(config: &Config) -> Result<()> {
    let report = validate_corpus(&config.corpus, &config.validation);

    for file in &report.files {
        println!("\nChecking {} ({})", file.path.display(), file.partition.label());

        match &file.status {
            FileStatus::Missing => println!("  File not found"),
            FileStatus::Unreadable(e) => println!("  Failed to read file: {}", e),
            FileStatus::Checked { total_lines, lines } => {
                println!("  Total lines: {}", total_lines);

                for (line, check) in lines {
                    match check {
                        LineCheck::Valid {
                            question_preview,
                            answer_preview,
                            has_keyword,
                        } => {
                            println!("  Line {}: ok", line);
                            println!("    Question: {}", question_preview);
                            println!("    Answer:   {}", answer_preview);
                            if !has_keyword {
                                println!("    Note: no domain keywords found");
                            }
                        }
                        LineCheck::MissingField(field) => {
                            println!("  Line {}: missing '{}' field", line, field)
                        }
                        LineCheck::InvalidJson(e) => {
                            println!("  Line {}: invalid JSON: {}", line, e)
                        }
                    }
                }
            }
        }
    }

    let train_missing = report
        .files
        .iter()
        .any(|f| f.partition == Partition::Train && f.status == FileStatus::Missing);

    println!();
    if report.all_valid() {
        println!("Format check passed.");
    } else if train_missing {
        println!(
            "Format check found problems; run 'qa-dataset create' or 'qa-dataset split' first."
        );
    } else {
        println!("Format check found problems.");
    }

    Ok(())
}

async fn cmd_upload(config: &Config) -> Result<()> {
    config.validate_registry().context("Invalid registry configuration")?;
    let registry = &config.registry;

    let model_id = ModelId::new(&registry.namespace, &registry.model_name)?;
    let token_hint: String = registry.token.chars().take(4).collect();

    println!("Uploading to model registry...");
    println!("  Model ID:   {}", model_id);
    println!("  Artifacts:  {}", registry.artifact_dir.display());
    println!("  Token:      {}...", token_hint);

    let client = RegistryClient::new(registry);
    let result = client
        .upload(
            &model_id,
            &registry.artifact_dir,
            &registry.artifacts,
            &registry.commit_message,
        )
        .await;

    match result {
        Ok(summary) => {
            for name in &summary.staging.missing {
                println!("  Skipped missing file: {}", name);
            }
            println!("\nUploaded {} files.", summary.staging.copied.len());
            println!("View at: {}", summary.url);
            Ok(())
        }
        Err(e) => {
            println!("\nUpload failed: {}", e);
            println!(
                "\n{}",
                manual_upload_instructions(&model_id, &registry.api_base, &registry.artifact_dir)
            );
            Err(e).context("Upload failed")
        }
    }
}
