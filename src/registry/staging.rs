//! Artifact staging and model identifiers.

use crate::error::{DatasetError, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A `<namespace>/<model-name>` registry identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub namespace: String,
    pub name: String,
}

impl ModelId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = Self {
            namespace: namespace.into(),
            name: name.into(),
        };

        let valid_part =
            |s: &str| !s.is_empty() && !s.contains('/') && !s.contains(char::is_whitespace);
        if valid_part(&id.namespace) && valid_part(&id.name) {
            Ok(id)
        } else {
            Err(DatasetError::InvalidModelId(id.to_string()))
        }
    }
}

impl FromStr for ModelId {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, name) = s
            .split_once('/')
            .ok_or_else(|| DatasetError::InvalidModelId(s.to_string()))?;
        ModelId::new(namespace, name)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Which artifacts made it into the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub copied: Vec<String>,
    pub missing: Vec<String>,
}

/// Copy each named artifact from `source_dir` into `staging_dir` verbatim.
///
/// Missing artifacts are recorded and skipped; the source is never modified.
pub fn stage_artifacts(
    source_dir: &Path,
    names: &[String],
    staging_dir: &Path,
) -> Result<StagingReport> {
    if !source_dir.is_dir() {
        return Err(DatasetError::io(
            source_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "artifact directory not found"),
        ));
    }

    fs::create_dir_all(staging_dir).map_err(|e| DatasetError::io(staging_dir, e))?;

    let mut report = StagingReport::default();
    for name in names {
        let src = source_dir.join(name);
        if !src.is_file() {
            tracing::warn!("Skipping missing artifact: {}", name);
            report.missing.push(name.clone());
            continue;
        }

        let dst = staging_dir.join(name);
        fs::copy(&src, &dst).map_err(|e| DatasetError::io(&src, e))?;
        tracing::debug!("Staged {}", name);
        report.copied.push(name.clone());
    }

    Ok(report)
}

/// Step-by-step git-lfs fallback for when the automatic push fails.
pub fn manual_upload_instructions(
    model_id: &ModelId,
    api_base: &str,
    artifact_dir: &Path,
) -> String {
    let host = api_base
        .trim_end_matches('/')
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    format!(
        r#"Manual upload steps:

1. Create the model on the registry website if it does not exist yet
   (model name: {name}).

2. Push the artifacts with git:
   cd {dir}
   git init
   git lfs install
   git lfs track "*.safetensors"
   git add .
   git commit -m "Upload {id}"
   git remote add origin https://oauth2:<YOUR_TOKEN>@{host}/{id}.git
   git push -u origin master
"#,
        name = model_id.name,
        dir = artifact_dir.display(),
        id = model_id,
        host = host,
    )
}
