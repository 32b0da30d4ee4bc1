//! HTTP client for the model registry.
//!
//! Talks to a ModelScope-style hub API: one request to create the model
//! repository and one upload request per staged file.

use super::staging::{ModelId, StagingReport, stage_artifacts};
use crate::config::RegistryConfig;
use crate::error::{DatasetError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Public visibility flag understood by the registry.
const VISIBILITY_PUBLIC: u8 = 5;
const DEFAULT_LICENSE: &str = "Apache License 2.0";
const DEFAULT_REVISION: &str = "master";

/// Request body for creating a model repository.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateModelRequest<'a> {
    path: &'a str,
    name: &'a str,
    visibility: u8,
    license: &'a str,
}

/// Registry error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Message", alias = "message")]
    message: String,
}

/// What `create_model` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub model_id: ModelId,
    pub repository: CreateOutcome,
    pub staging: StagingReport,
    /// Public page of the model.
    pub url: String,
}

/// Model registry client.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    api_base: String,
    token: String,
}

impl RegistryClient {
    /// Create a new registry client from configuration.
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Public page of a model.
    pub fn model_url(&self, model_id: &ModelId) -> String {
        format!("{}/models/{}", self.api_base, model_id)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Turn a non-success response body into an error message.
    fn api_error(status: StatusCode, body: &str) -> String {
        match serde_json::from_str::<ApiError>(body) {
            Ok(api_error) => format!("API error ({}): {}", status, api_error.message),
            Err(_) => format!("Request failed ({}): {}", status, body),
        }
    }

    /// Create the model repository. An existing repository is not an error.
    pub async fn create_model(&self, model_id: &ModelId) -> Result<CreateOutcome> {
        let request = CreateModelRequest {
            path: &model_id.namespace,
            name: &model_id.name,
            visibility: VISIBILITY_PUBLIC,
            license: DEFAULT_LICENSE,
        };

        let response = self
            .client
            .post(self.endpoint("models"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(CreateOutcome::Created);
        }

        let message = Self::api_error(status, &body);
        if status == StatusCode::CONFLICT || message.to_lowercase().contains("already exists") {
            tracing::info!("Model repository {} already exists, continuing", model_id);
            return Ok(CreateOutcome::AlreadyExists);
        }

        Err(DatasetError::Registry(message))
    }

    /// Upload one file into the model repository.
    pub async fn upload_file(
        &self,
        model_id: &ModelId,
        file_name: &str,
        path: &Path,
        commit_message: &str,
    ) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DatasetError::io(path, e))?;

        let response = self
            .client
            .put(self.endpoint(&format!("models/{}/repo", model_id)))
            .header("Authorization", self.bearer())
            .query(&[
                ("FilePath", file_name),
                ("Revision", DEFAULT_REVISION),
                ("CommitMessage", commit_message),
            ])
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(DatasetError::Registry(format!(
                "{}: {}",
                file_name,
                Self::api_error(status, &body)
            )));
        }

        tracing::info!("Uploaded {}", file_name);
        Ok(())
    }

    /// Stage `artifacts` from `artifact_dir` into a scratch directory and push them.
    ///
    /// Every request is attempted once; the first failure ends the upload.
    pub async fn upload(
        &self,
        model_id: &ModelId,
        artifact_dir: &Path,
        artifacts: &[String],
        commit_message: &str,
    ) -> Result<UploadSummary> {
        let scratch =
            tempfile::TempDir::new().map_err(|e| DatasetError::io(std::env::temp_dir(), e))?;
        let staging = stage_artifacts(artifact_dir, artifacts, scratch.path())?;

        if staging.copied.is_empty() {
            return Err(DatasetError::Registry(format!(
                "No artifacts found in '{}'",
                artifact_dir.display()
            )));
        }

        let repository = self.create_model(model_id).await?;

        for name in &staging.copied {
            self.upload_file(model_id, name, &scratch.path().join(name), commit_message)
                .await?;
        }

        Ok(UploadSummary {
            model_id: model_id.clone(),
            repository,
            url: self.model_url(model_id),
            staging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(api_base: &str) -> RegistryConfig {
        RegistryConfig {
            api_base: api_base.to_string(),
            token: "test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_construction() {
        let client = RegistryClient::new(&config("https://hub.example.com/"));
        assert_eq!(client.endpoint("models"), "https://hub.example.com/api/v1/models");

        let id = ModelId::new("someone", "model").unwrap();
        assert_eq!(client.model_url(&id), "https://hub.example.com/models/someone/model");
    }

    #[test]
    fn test_api_error_message() {
        let msg = RegistryClient::api_error(
            StatusCode::BAD_REQUEST,
            r#"{"Code":1,"Message":"model already exists"}"#,
        );
        assert_eq!(msg, "API error (400 Bad Request): model already exists");

        let msg = RegistryClient::api_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "Request failed (502 Bad Gateway): upstream down");
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateModelRequest {
            path: "someone",
            name: "model",
            visibility: VISIBILITY_PUBLIC,
            license: DEFAULT_LICENSE,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Path"], "someone");
        assert_eq!(json["Name"], "model");
        assert_eq!(json["Visibility"], 5);
    }

    #[test]
    fn test_upload_without_artifacts_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let client = RegistryClient::new(&config("http://127.0.0.1:1"));
        let id = ModelId::new("someone", "model").unwrap();

        let artifacts = ["missing.json".to_string()];
        let result = tokio_test::block_on(client.upload(&id, dir.path(), &artifacts, "msg"));
        assert!(matches!(result, Err(DatasetError::Registry(_))));
    }

    #[test]
    fn test_unreachable_registry_leaves_artifacts_intact() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("adapter_config.json"), "{}").unwrap();
        let client = RegistryClient::new(&config("http://127.0.0.1:1"));
        let id = ModelId::new("someone", "model").unwrap();

        let result = tokio_test::block_on(client.upload(
            &id,
            dir.path(),
            &["adapter_config.json".to_string()],
            "msg",
        ));

        assert!(matches!(result, Err(DatasetError::Http(_))));
        assert_eq!(fs::read_to_string(dir.path().join("adapter_config.json")).unwrap(), "{}");
    }
}
