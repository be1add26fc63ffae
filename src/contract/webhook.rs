use super::{decode_job, extended_image_fields, BackendContract, ContractError, ContractVersion, FormFields};
use crate::models::job::JobSnapshot;
use crate::models::redaction::RedactionRequest;

/// Revision that moved video submission to `/v1/video` and lets the caller
/// register a completion webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookContract;

impl BackendContract for WebhookContract {
    fn version(&self) -> ContractVersion {
        ContractVersion::Webhook
    }

    fn video_path(&self) -> &'static str {
        "/v1/video"
    }

    fn image_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        Ok(extended_image_fields(request))
    }

    fn video_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        let mut fields = FormFields::new();
        fields.set("profile", request.profile.to_string());
        if let Some(url) = &request.webhook_url {
            fields.set("webhook_url", url.clone());
        }
        Ok(fields)
    }

    fn parse_job(&self, job_id: &str, body: &[u8]) -> Result<JobSnapshot, serde_json::Error> {
        decode_job(job_id, body, true)
    }
}
