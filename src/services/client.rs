use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::ApiBase;
use crate::contract::{BackendContract, ContractError, FormFields};
use crate::models::job::{JobSnapshot, JobStatus, SubmittedJob};
use crate::models::media::UploadFile;
use crate::models::redaction::RedactionRequest;
use crate::services::poller::JobSource;

const API_KEY_HEADER: &str = "X-API-KEY";
const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// HTTP client for the PrivacyScrub redaction backend.
pub struct ScrubClient {
    http: Client,
    base: ApiBase,
    api_key: Option<String>,
    contract: Box<dyn BackendContract>,
}

/// Result of a synchronous image submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageResult {
    Redacted { bytes: Vec<u8>, content_type: String },
    Coordinates(serde_json::Value),
}

#[derive(Deserialize)]
struct VideoSubmitResponse {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl ScrubClient {
    pub fn new(
        base: ApiBase,
        api_key: Option<String>,
        contract: Box<dyn BackendContract>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("privacyscrub-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            http,
            base,
            api_key,
            contract,
        })
    }

    pub fn contract(&self) -> &dyn BackendContract {
        self.contract.as_ref()
    }

    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    /// Submit an image and return the redacted artifact or its coordinates.
    pub async fn submit_image(
        &self,
        file: &UploadFile,
        request: &RedactionRequest,
    ) -> Result<ImageResult, ApiError> {
        let fields = self.contract.image_fields(request)?;
        let url = self.base.join(self.contract.image_path());
        let request_id = Uuid::new_v4();

        tracing::info!(
            %request_id,
            file = %file.file_name,
            profile = %request.profile,
            mode = %request.mode,
            contract = %self.contract.version(),
            "Submitting image"
        );

        let response = self
            .send(self.http.post(&url).multipart(build_form(file, fields)?), request_id)
            .await?;

        if request.coordinates_only {
            let body = response.bytes().await.map_err(ApiError::Request)?;
            let coordinates = serde_json::from_slice(&body)?;
            return Ok(ImageResult::Coordinates(coordinates));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await.map_err(ApiError::Request)?.to_vec();

        tracing::info!(%request_id, bytes = bytes.len(), "Image redacted");
        Ok(ImageResult::Redacted { bytes, content_type })
    }

    /// Submit a video and return the job handle the backend assigned.
    pub async fn submit_video(
        &self,
        file: &UploadFile,
        request: &RedactionRequest,
    ) -> Result<SubmittedJob, ApiError> {
        let fields = self.contract.video_fields(request)?;
        let url = self.base.join(self.contract.video_path());
        let request_id = Uuid::new_v4();

        tracing::info!(
            %request_id,
            file = %file.file_name,
            profile = %request.profile,
            contract = %self.contract.version(),
            "Submitting video job"
        );

        let response = self
            .send(self.http.post(&url).multipart(build_form(file, fields)?), request_id)
            .await?;
        let body = response.bytes().await.map_err(ApiError::Request)?;
        let parsed: VideoSubmitResponse = serde_json::from_slice(&body)?;

        let job_id = parsed
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ApiError::MissingJobId)?;
        let status = parsed
            .status
            .as_deref()
            .map(JobStatus::from_wire)
            .unwrap_or(JobStatus::Pending);

        tracing::info!(%request_id, %job_id, %status, "Video job accepted");
        Ok(SubmittedJob { job_id, status })
    }

    /// Fetch the current status of a job.
    pub async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        let url = self.job_url(job_id)?;
        let request_id = Uuid::new_v4();

        let response = self.send(self.http.get(url), request_id).await?;
        let body = response.bytes().await.map_err(ApiError::Request)?;
        let snapshot = self.contract.parse_job(job_id, &body)?;

        tracing::debug!(
            %request_id,
            job_id,
            status = %snapshot.status,
            progress = snapshot.progress.fraction(),
            "Job status fetched"
        );
        Ok(snapshot)
    }

    fn job_url(&self, job_id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base.join(self.contract.jobs_path()))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .push(job_id);
        Ok(url)
    }

    async fn send(&self, builder: RequestBuilder, request_id: Uuid) -> Result<Response, ApiError> {
        let mut builder = builder.header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%request_id, error = %e, "Request to backend failed");
            ApiError::Request(e)
        })?;
        Self::ensure_success(response, request_id).await
    }

    /// Pass 2xx responses through; turn anything else into `ApiError::Api`
    /// carrying the raw body text. The status survives a body that cannot be read.
    async fn ensure_success(response: Response, request_id: Uuid) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(%request_id, status = status.as_u16(), error = %e, "Failed to read error body");
                format!("<unreadable response body: {e}>")
            }
        };
        tracing::warn!(%request_id, status = status.as_u16(), body = %body, "Backend returned error");
        Err(ApiError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobSource for ScrubClient {
    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        ScrubClient::fetch_job(self, job_id).await
    }
}

fn build_form(file: &UploadFile, fields: FormFields) -> Result<Form, ApiError> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(file.content_type)
        .map_err(ApiError::Request)?;

    let form = fields
        .into_iter()
        .fold(Form::new().part("file", part), |form, (name, value)| form.text(name, value));
    Ok(form)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend accepted the video but returned no job_id")]
    MissingJobId,

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Contract(#[from] ContractError),
}
