//! Backend contract adapters.
//!
//! The redaction backend has shipped several incompatible HTTP contracts:
//! endpoint paths, accepted form fields and the shape of job progress all
//! moved between revisions. Each revision gets its own [`BackendContract`]
//! implementation so the client never branches on version inline.

mod v1;
mod v2;
mod webhook;

use chrono::Utc;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::models::job::{JobSnapshot, JobStatus, Progress};
use crate::models::redaction::RedactionRequest;

pub use v1::LegacyContract;
pub use v2::ChunkedContract;
pub use webhook::WebhookContract;

pub const IMAGE_PATH: &str = "/v1/anonymize-image";
pub const VIDEO_PATH: &str = "/v1/anonymize-video";
pub const JOBS_PATH: &str = "/v1/jobs";

/// Known backend contract revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContractVersion {
    /// Fraction progress, no ROI or coordinate output.
    V1,
    /// Chunk-based progress, ROI and coordinates-only output.
    #[default]
    V2,
    /// As `V2`, with videos posted to `/v1/video` alongside a webhook.
    Webhook,
}

impl ContractVersion {
    pub fn adapter(self) -> Box<dyn BackendContract> {
        match self {
            Self::V1 => Box::new(LegacyContract),
            Self::V2 => Box::new(ChunkedContract),
            Self::Webhook => Box::new(WebhookContract),
        }
    }
}

/// One revision of the backend HTTP contract.
pub trait BackendContract: Send + Sync {
    fn version(&self) -> ContractVersion;

    fn image_path(&self) -> &'static str {
        IMAGE_PATH
    }

    fn video_path(&self) -> &'static str {
        VIDEO_PATH
    }

    /// Collection path; the job id is appended as its own path segment.
    fn jobs_path(&self) -> &'static str {
        JOBS_PATH
    }

    /// Text fields for an image submission (the file part is added by the client).
    fn image_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError>;

    /// Text fields for a video submission.
    fn video_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError>;

    /// Decode a job status payload into a snapshot.
    fn parse_job(&self, job_id: &str, body: &[u8]) -> Result<JobSnapshot, serde_json::Error>;
}

/// Ordered multipart text fields. Each name appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(&'static str, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any earlier value.
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn set_bool(&mut self, name: &'static str, value: bool) {
        self.set(name, if value { "true" } else { "false" });
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for FormFields {
    type Item = (&'static str, String);
    type IntoIter = std::vec::IntoIter<(&'static str, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Fields every contract sends for an image: profile, mode and any target overrides.
fn base_image_fields(request: &RedactionRequest) -> FormFields {
    let mut fields = FormFields::new();
    fields.set("profile", request.profile.to_string());
    fields.set("mode", request.mode.to_string());
    for (name, value) in request.targets.fields() {
        if let Some(value) = value {
            fields.set_bool(name, value);
        }
    }
    fields
}

/// Adds the ROI and coordinates-only fields introduced after the first revision.
fn extended_image_fields(request: &RedactionRequest) -> FormFields {
    let mut fields = base_image_fields(request);
    if request.coordinates_only {
        fields.set_bool("coordinates_only", true);
    }
    if let Some(roi) = &request.roi {
        fields.set("roi", roi.to_form_value());
    }
    fields
}

fn reject_webhook(version: ContractVersion, request: &RedactionRequest) -> Result<(), ContractError> {
    if request.webhook_url.is_some() {
        return Err(ContractError::Unsupported { version, feature: "webhook_url" });
    }
    Ok(())
}

/// Wire shape of `GET /v1/jobs/{job_id}` across all revisions.
#[derive(Debug, Deserialize)]
struct RawJobStatus {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    chunks_completed: Option<u64>,
    #[serde(default)]
    chunks_total: Option<u64>,
    #[serde(default)]
    output_url: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Shared status decoder. An explicit fraction always wins; chunk counts are
/// only consulted when `accept_chunks` is set.
fn decode_job(job_id: &str, body: &[u8], accept_chunks: bool) -> Result<JobSnapshot, serde_json::Error> {
    let raw: RawJobStatus = serde_json::from_slice(body)?;

    let progress = match (raw.progress, raw.chunks_total) {
        (Some(fraction), _) => Progress::Fraction(fraction),
        (None, Some(total)) if accept_chunks => Progress::Chunks {
            completed: raw.chunks_completed.unwrap_or(0),
            total,
        },
        _ => Progress::default(),
    };

    Ok(JobSnapshot {
        job_id: job_id.to_string(),
        status: JobStatus::from_wire(&raw.status),
        progress,
        output_url: raw.output_url,
        error_message: raw.error_message,
        observed_at: Utc::now(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Contract {version} does not support {feature}")]
    Unsupported {
        version: ContractVersion,
        feature: &'static str,
    },
}
