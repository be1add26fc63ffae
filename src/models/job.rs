use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown when the backend reports a failure without a message.
pub const DEFAULT_ERROR_MESSAGE: &str = "no error message provided";

/// Status of a redaction job as reported by the backend.
///
/// The backend vocabulary has drifted between revisions, so incoming values
/// are normalized; anything unrecognized is kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Unknown(String),
}

impl JobStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" | "SUBMITTED" => Self::Pending,
            "RUNNING" | "PROCESSING" | "IN_PROGRESS" => Self::Running,
            "COMPLETED" | "SUCCEEDED" | "DONE" => Self::Completed,
            "FAILED" | "ERROR" => Self::Failed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Cancelled => f.write_str("CANCELLED"),
            Self::Unknown(raw) => write!(f, "UNKNOWN({raw})"),
        }
    }
}

/// Progress as reported by the backend, in whichever shape it used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Fraction(f64),
    Chunks { completed: u64, total: u64 },
}

impl Default for Progress {
    fn default() -> Self {
        Self::Fraction(0.0)
    }
}

impl Progress {
    /// Completion in `0.0..=1.0`. A zero chunk total counts as no progress.
    pub fn fraction(&self) -> f64 {
        let raw = match *self {
            Self::Fraction(f) => f,
            Self::Chunks { total: 0, .. } => 0.0,
            Self::Chunks { completed, total } => completed as f64 / total as f64,
        };
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 1.0)
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor() as u8
    }
}

/// Local mirror of a job, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: Progress,
    pub output_url: Option<String>,
    pub error_message: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// The final outcome if this snapshot is terminal.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self.status {
            JobStatus::Completed => Some(JobOutcome::Completed {
                output_url: self.output_url.clone(),
            }),
            JobStatus::Failed | JobStatus::Cancelled => Some(JobOutcome::Failed {
                status: self.status.clone(),
                message: self
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            }),
            _ => None,
        }
    }
}

/// Terminal result of a job as the backend reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { output_url: Option<String> },
    Failed { status: JobStatus, message: String },
}

/// Handle returned by a successful video submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: JobStatus) -> JobSnapshot {
        JobSnapshot {
            job_id: "job-1".to_string(),
            status,
            progress: Progress::default(),
            output_url: None,
            error_message: None,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_vocabulary_normalized() {
        assert_eq!(JobStatus::from_wire("pending"), JobStatus::Pending);
        assert_eq!(JobStatus::from_wire("PROCESSING"), JobStatus::Running);
        assert_eq!(JobStatus::from_wire("succeeded"), JobStatus::Completed);
        assert_eq!(JobStatus::from_wire("Canceled"), JobStatus::Cancelled);
        assert_eq!(
            JobStatus::from_wire("THAWING"),
            JobStatus::Unknown("THAWING".to_string())
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown("x".into()).is_terminal());
    }

    #[test]
    fn test_chunk_progress() {
        let p = Progress::Chunks { completed: 4, total: 10 };
        assert_eq!(p.fraction(), 0.4);
        assert_eq!(p.percent(), 40);
    }

    #[test]
    fn test_zero_chunk_total() {
        let p = Progress::Chunks { completed: 3, total: 0 };
        assert_eq!(p.fraction(), 0.0);
    }

    #[test]
    fn test_fraction_clamped() {
        assert_eq!(Progress::Fraction(1.7).fraction(), 1.0);
        assert_eq!(Progress::Fraction(-0.2).fraction(), 0.0);
        assert_eq!(Progress::Fraction(f64::NAN).fraction(), 0.0);
    }

    #[test]
    fn test_failed_outcome_defaults_message() {
        let outcome = snapshot(JobStatus::Failed).outcome().unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Failed {
                status: JobStatus::Failed,
                message: DEFAULT_ERROR_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_outcome_is_stable_for_terminal_snapshot() {
        let mut s = snapshot(JobStatus::Completed);
        s.output_url = Some("https://x/y.mp4".to_string());
        assert_eq!(s.outcome(), s.outcome());
        assert_eq!(
            s.outcome(),
            Some(JobOutcome::Completed { output_url: Some("https://x/y.mp4".to_string()) })
        );
    }

    #[test]
    fn test_non_terminal_has_no_outcome() {
        assert!(snapshot(JobStatus::Running).outcome().is_none());
        assert!(snapshot(JobStatus::Unknown("PAUSED".into())).outcome().is_none());
    }
}
