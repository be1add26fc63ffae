use super::{
    base_image_fields, decode_job, reject_webhook, BackendContract, ContractError, ContractVersion,
    FormFields,
};
use crate::models::job::JobSnapshot;
use crate::models::redaction::RedactionRequest;

/// First public revision: redacted image bytes only, fractional progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyContract;

impl BackendContract for LegacyContract {
    fn version(&self) -> ContractVersion {
        ContractVersion::V1
    }

    fn image_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        reject_webhook(self.version(), request)?;
        if request.coordinates_only {
            return Err(ContractError::Unsupported {
                version: self.version(),
                feature: "coordinates_only",
            });
        }
        if request.roi.is_some() {
            return Err(ContractError::Unsupported {
                version: self.version(),
                feature: "roi",
            });
        }
        Ok(base_image_fields(request))
    }

    fn video_fields(&self, request: &RedactionRequest) -> Result<FormFields, ContractError> {
        reject_webhook(self.version(), request)?;
        let mut fields = FormFields::new();
        fields.set("profile", request.profile.to_string());
        Ok(fields)
    }

    fn parse_job(&self, job_id: &str, body: &[u8]) -> Result<JobSnapshot, serde_json::Error> {
        decode_job(job_id, body, false)
    }
}
