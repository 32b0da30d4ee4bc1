//! Configuration for the dataset tools.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// One of the three named datasets of a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl Partition {
    /// All partitions in corpus order.
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validation, Partition::Test];

    pub fn label(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Validation => "validation",
            Partition::Test => "test",
        }
    }
}

/// Where the corpus lives and what its three resources are called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding the three JSONL resources.
    pub dir: PathBuf,
    pub train_file: String,
    pub validation_file: String,
    pub test_file: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("GPU-QA"),
            train_file: "train.jsonl".to_string(),
            validation_file: "validation.jsonl".to_string(),
            test_file: "test.jsonl".to_string(),
        }
    }
}

impl CorpusConfig {
    /// Corpus rooted at `dir` with the default resource names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn file_name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Train => &self.train_file,
            Partition::Validation => &self.validation_file,
            Partition::Test => &self.test_file,
        }
    }

    /// Full path of a partition's resource.
    pub fn path(&self, partition: Partition) -> PathBuf {
        self.dir.join(self.file_name(partition))
    }
}

/// Split proportions and the small-dataset threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub validation_ratio: f64,

    /// Below this many records the small-dataset policy sends everything to train.
    pub small_dataset_threshold: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.7,
            validation_ratio: 0.2,
            small_dataset_threshold: 10,
        }
    }
}

/// Settings for the format check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Number of leading lines inspected per resource.
    pub sample_lines: usize,

    /// Domain vocabulary for the advisory relevance check.
    pub keywords: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let keywords = [
            "GPU", "CUDA", "OpenCL", "VRAM", "显卡", "图形处理器", "显存", "渲染", "计算",
            "并行",
        ];
        Self {
            sample_lines: 3,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Model registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry (e.g., "https://www.modelscope.cn")
    pub api_base: String,

    /// Bearer token for authentication
    pub token: String,

    /// Owner of the model repository
    pub namespace: String,

    pub model_name: String,

    /// Directory holding the trained artifacts
    pub artifact_dir: PathBuf,

    /// Files copied from `artifact_dir` into the upload
    pub artifacts: Vec<String>,

    pub commit_message: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let artifacts = [
            "adapter_config.json",
            "adapter_model.safetensors",
            "README.md",
            "tokenizer_config.json",
            "tokenizer.json",
            "special_tokens_map.json",
            "training_params.json",
            "evaluation_results.json",
        ];
        Self {
            api_base: "https://www.modelscope.cn".to_string(),
            token: String::new(),
            namespace: String::new(),
            model_name: "qwen-gpu-assistant".to_string(),
            artifact_dir: PathBuf::from("qwen-output"),
            artifacts: artifacts.iter().map(|a| a.to_string()).collect(),
            commit_message: "Upload LoRA adapter".to_string(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub split: SplitConfig,
    pub validation: ValidationConfig,
    pub registry: RegistryConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    corpus: Option<CorpusFileSection>,
    split: Option<SplitFileSection>,
    validation: Option<ValidationFileSection>,
    registry: Option<RegistryFileSection>,
}

#[derive(Debug, Deserialize)]
struct CorpusFileSection {
    dir: Option<PathBuf>,
    train_file: Option<String>,
    validation_file: Option<String>,
    test_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SplitFileSection {
    train_ratio: Option<f64>,
    validation_ratio: Option<f64>,
    small_dataset_threshold: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ValidationFileSection {
    sample_lines: Option<usize>,
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RegistryFileSection {
    api_base: Option<String>,
    token: Option<String>,
    namespace: Option<String>,
    model_name: Option<String>,
    artifact_dir: Option<PathBuf>,
    artifacts: Option<Vec<String>>,
    commit_message: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (QA_CORPUS_DIR, MODEL_REGISTRY_TOKEN, ...)
    /// 2. Config file (`explicit`, else ~/.config/qa-dataset-tools/config.yaml)
    /// 3. Default values
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::config_file_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("QA_CORPUS_DIR") {
            self.corpus.dir = PathBuf::from(dir);
        }

        if let Ok(api_base) = env::var("MODEL_REGISTRY_API_BASE") {
            self.registry.api_base = api_base;
        }

        if let Ok(token) = env::var("MODEL_REGISTRY_TOKEN") {
            self.registry.token = token;
        }

        if let Ok(namespace) = env::var("MODEL_REGISTRY_NAMESPACE") {
            self.registry.namespace = namespace;
        }

        if let Ok(model) = env::var("MODEL_REGISTRY_MODEL") {
            self.registry.model_name = model;
        }

        if let Ok(dir) = env::var("MODEL_ARTIFACT_DIR") {
            self.registry.artifact_dir = PathBuf::from(dir);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document, filling unspecified values with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| DatasetError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(corpus) = file_config.corpus {
            if let Some(dir) = corpus.dir {
                config.corpus.dir = dir;
            }
            if let Some(name) = corpus.train_file {
                config.corpus.train_file = name;
            }
            if let Some(name) = corpus.validation_file {
                config.corpus.validation_file = name;
            }
            if let Some(name) = corpus.test_file {
                config.corpus.test_file = name;
            }
        }

        if let Some(split) = file_config.split {
            if let Some(ratio) = split.train_ratio {
                config.split.train_ratio = ratio;
            }
            if let Some(ratio) = split.validation_ratio {
                config.split.validation_ratio = ratio;
            }
            if let Some(threshold) = split.small_dataset_threshold {
                config.split.small_dataset_threshold = threshold;
            }
        }

        if let Some(validation) = file_config.validation {
            if let Some(lines) = validation.sample_lines {
                config.validation.sample_lines = lines;
            }
            if let Some(keywords) = validation.keywords {
                config.validation.keywords = keywords;
            }
        }

        if let Some(registry) = file_config.registry {
            if let Some(api_base) = registry.api_base {
                config.registry.api_base = api_base;
            }
            if let Some(token) = registry.token {
                config.registry.token = token;
            }
            if let Some(namespace) = registry.namespace {
                config.registry.namespace = namespace;
            }
            if let Some(model) = registry.model_name {
                config.registry.model_name = model;
            }
            if let Some(dir) = registry.artifact_dir {
                config.registry.artifact_dir = dir;
            }
            if let Some(artifacts) = registry.artifacts {
                config.registry.artifacts = artifacts;
            }
            if let Some(message) = registry.commit_message {
                config.registry.commit_message = message;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qa-dataset-tools")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate the dataset-side settings.
    pub fn validate(&self) -> Result<()> {
        let split = &self.split;
        for (name, ratio) in [
            ("train_ratio", split.train_ratio),
            ("validation_ratio", split.validation_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(DatasetError::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, ratio
                )));
            }
        }

        if split.train_ratio + split.validation_ratio > 1.0 {
            return Err(DatasetError::Config(format!(
                "train_ratio + validation_ratio must not exceed 1, got {}",
                split.train_ratio + split.validation_ratio
            )));
        }

        let names = Partition::ALL.map(|p| self.corpus.file_name(p));
        if names.iter().any(|n| n.is_empty()) {
            return Err(DatasetError::Config(
                "Corpus file names must not be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[1] == names[2] || names[0] == names[2] {
            return Err(DatasetError::Config(
                "Corpus file names must be distinct".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate that the settings needed for an upload are present.
    pub fn validate_registry(&self) -> Result<()> {
        let registry = &self.registry;

        if registry.api_base.is_empty() {
            return Err(DatasetError::Config(
                "Registry API base URL is required. Set MODEL_REGISTRY_API_BASE or add to config file."
                    .to_string(),
            ));
        }

        if registry.token.is_empty() {
            return Err(DatasetError::Config(
                "Registry token is required. Set MODEL_REGISTRY_TOKEN or add to config file."
                    .to_string(),
            ));
        }

        if registry.namespace.is_empty() || registry.model_name.is_empty() {
            return Err(DatasetError::Config(
                "Registry namespace and model name are required. \
                 Set MODEL_REGISTRY_NAMESPACE / MODEL_REGISTRY_MODEL or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.corpus.dir, PathBuf::from("GPU-QA"));
        assert_eq!(config.corpus.train_file, "train.jsonl");
        assert_eq!(config.split.train_ratio, 0.7);
        assert_eq!(config.split.validation_ratio, 0.2);
        assert_eq!(config.split.small_dataset_threshold, 10);
        assert_eq!(config.validation.sample_lines, 3);
        assert_eq!(config.registry.artifacts.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_corpus_paths() {
        let corpus = CorpusConfig::in_dir("/data/qa");
        assert_eq!(
            corpus.path(Partition::Validation),
            PathBuf::from("/data/qa/validation.jsonl")
        );
        assert_eq!(corpus.path(Partition::Test), PathBuf::from("/data/qa/test.jsonl"));
    }

    #[test]
    fn test_yaml_overrides_only_given_fields() {
        let yaml = r#"
corpus:
  dir: my-corpus
split:
  train_ratio: 0.8
  validation_ratio: 0.1
registry:
  namespace: someone
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.corpus.dir, PathBuf::from("my-corpus"));
        assert_eq!(config.corpus.test_file, "test.jsonl");
        assert_eq!(config.split.train_ratio, 0.8);
        assert_eq!(config.split.small_dataset_threshold, 10);
        assert_eq!(config.registry.namespace, "someone");
        assert_eq!(config.registry.model_name, "qwen-gpu-assistant");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Config::from_yaml("split: [not, a, map]").is_err());
    }

    #[test]
    fn test_validate_rejects_ratio_overflow() {
        let mut config = Config::default();
        config.split.train_ratio = 0.9;
        config.split.validation_ratio = 0.2;
        assert!(config.validate().is_err());

        config.split.train_ratio = -0.1;
        config.split.validation_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config = Config::default();
        config.corpus.test_file = "train.jsonl".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_registry_requires_credentials() {
        let mut config = Config::default();
        assert!(config.validate_registry().is_err());

        config.registry.token = "secret".to_string();
        config.registry.namespace = "someone".to_string();
        assert!(config.validate_registry().is_ok());
    }

    #[test]
    fn test_env_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "corpus:\n  dir: from-file\nregistry:\n  token: file-token\n  namespace: file-ns\n",
        )
        .unwrap();

        // Only this test touches these variables
        unsafe {
            env::set_var("QA_CORPUS_DIR", "from-env");
            env::set_var("MODEL_REGISTRY_TOKEN", "env-token");
        }
        let loaded = Config::load(Some(&path));
        unsafe {
            env::remove_var("QA_CORPUS_DIR");
            env::remove_var("MODEL_REGISTRY_TOKEN");
        }

        let config = loaded.unwrap();
        assert_eq!(config.corpus.dir, PathBuf::from("from-env"));
        assert_eq!(config.registry.token, "env-token");
        assert_eq!(config.registry.namespace, "file-ns");
    }
}
