//! Model registry integration.
//!
//! Stages trained artifacts into a scratch directory and pushes them to a
//! hosted registry with a single pass of HTTP requests. Failures are never
//! retried; callers fall back to [`manual_upload_instructions`].

mod client;
mod staging;

pub use client::{CreateOutcome, RegistryClient, UploadSummary};
pub use staging::{ModelId, StagingReport, manual_upload_instructions, stage_artifacts};
