//! Terminal rendering of submissions and job progress.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::job::{JobSnapshot, JobStatus};
use crate::services::client::ImageResult;
use crate::services::poller::{PollEvent, PollHandle, PollOutcome};

const BAR_WIDTH: usize = 30;

/// `Status: RUNNING | Progress: 40%`
pub fn status_line(snapshot: &JobSnapshot) -> String {
    format!(
        "Status: {} | Progress: {}%",
        snapshot.status,
        snapshot.progress.percent()
    )
}

/// Fixed-width text bar, e.g. `[############------------------]`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Final message for a polling run.
pub fn outcome_message(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Completed { output_url: Some(url) } => {
            format!("Processing complete! Download result: {url}")
        }
        PollOutcome::Completed { output_url: None } => {
            "Processing complete, but the backend returned no output URL".to_string()
        }
        PollOutcome::Failed { status: JobStatus::Cancelled, message } => {
            format!("Job cancelled: {message}")
        }
        PollOutcome::Failed { message, .. } => format!("Job failed: {message}"),
        PollOutcome::Cancelled => "Stopped watching the job; it keeps running on the backend".to_string(),
        PollOutcome::TimedOut { last: Some(s) } => {
            format!("Gave up waiting for the job (last seen: {})", status_line(s))
        }
        PollOutcome::TimedOut { last: None } => {
            "Gave up waiting for the job before any status was received".to_string()
        }
        PollOutcome::Aborted(e) => format!("Connection error while polling: {e}"),
    }
}

/// Print every event from a running poll, then its outcome.
pub async fn watch(mut handle: PollHandle, out: &mut impl Write) -> std::io::Result<PollOutcome> {
    while let Some(event) = handle.events.recv().await {
        match event {
            PollEvent::Status(snapshot) => writeln!(
                out,
                "{} {} [{}]",
                progress_bar(snapshot.progress.fraction(), BAR_WIDTH),
                status_line(&snapshot),
                snapshot.observed_at.format("%H:%M:%S"),
            )?,
            PollEvent::Warning { attempt, message } => {
                writeln!(out, "warning: status check {attempt} failed: {message}")?
            }
        }
        out.flush()?;
    }

    let outcome = handle.task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Polling task panicked");
        PollOutcome::Cancelled
    });
    writeln!(out, "{}", outcome_message(&outcome))?;
    Ok(outcome)
}

/// Default output path for a redacted image: `<stem>.redacted.<ext>` next to the input.
pub fn redacted_path(input: &Path, content_type: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = match content_type {
        "image/png" => "png".to_string(),
        "image/jpeg" => "jpg".to_string(),
        _ => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string()),
    };
    input.with_file_name(format!("{stem}.redacted.{ext}"))
}

/// Write an image result to disk or print its coordinates.
/// Returns the written path, if any.
pub fn present_image(
    result: &ImageResult,
    input: &Path,
    out_path: Option<&Path>,
    out: &mut impl Write,
) -> std::io::Result<Option<PathBuf>> {
    match result {
        ImageResult::Redacted { bytes, content_type } => {
            let content_type = content_type.split(';').next().unwrap_or_default().trim();
            let path = out_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| redacted_path(input, content_type));
            std::fs::write(&path, bytes)?;
            writeln!(out, "Anonymized image written to {}", path.display())?;
            Ok(Some(path))
        }
        ImageResult::Coordinates(value) => {
            let pretty = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
            writeln!(out, "{pretty}")?;
            Ok(None)
        }
    }
}
