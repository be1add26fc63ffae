//! Upload bytes and job payloads shared by the integration tests.

#![allow(dead_code)]

use privacyscrub_console::models::media::{MediaKind, UploadFile};
use serde_json::{json, Value};

/// Smallest prefix `image::guess_format` recognises as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// An `ftyp` box header, enough to pass the MP4 sniff.
pub const MP4_BYTES: &[u8] = b"\0\0\0\x18ftypisom\0\0\x02\0isomiso2";

pub const REDACTED_PNG: &[u8] = b"\x89PNG\r\n\x1a\nredacted";

pub fn png_upload() -> UploadFile {
    UploadFile::from_bytes("street.png".to_string(), PNG_BYTES.to_vec(), MediaKind::Image)
        .expect("Fixture PNG should validate")
}

pub fn mp4_upload() -> UploadFile {
    UploadFile::from_bytes("dashcam.mp4".to_string(), MP4_BYTES.to_vec(), MediaKind::Video)
        .expect("Fixture MP4 should validate")
}

pub fn running_chunks(completed: u64, total: u64) -> Value {
    json!({ "status": "RUNNING", "chunks_completed": completed, "chunks_total": total })
}

pub fn running_fraction(progress: f64) -> Value {
    json!({ "status": "RUNNING", "progress": progress })
}

pub fn completed(output_url: &str) -> Value {
    json!({ "status": "COMPLETED", "progress": 1.0, "output_url": output_url })
}

pub fn failed(error_message: &str) -> Value {
    json!({ "status": "FAILED", "error_message": error_message })
}
