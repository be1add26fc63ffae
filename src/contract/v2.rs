use super::{
    decode_job, extended_image_fields, reject_webhook, BackendContract, ContractError,
    ContractVersion, FormFields,
};
use crate::models::job::JobSnapshot;
use crate::models::redaction::RedactionRequest;

/// Chunked video pipeline: progress is reported as chunk counts, images
/// accept a region of interest and can return coordinates instead of pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkedContract;

impl BackendContract for ChunkedContract {
    fn version(&self) -> ContractVersion {
        ContractVersion::V2
    }

    fn image_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        reject_webhook(self.version(), request)?;
        Ok(extended_image_fields(request))
    }

    fn video_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        reject_webhook(self.version(), request)?;
        let mut fields = FormFields::new();
        fields.set("profile", request.profile.to_string());
        Ok(fields)
    }

    fn parse_job(&self, job_id: &str, body: &[u8]) -> Result<JobSnapshot, serde_json::Error> {
        decode_job(job_id, body, true)
    }
}
