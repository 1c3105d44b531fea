use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod queues {
    pub const INGEST_QUEUE: &str = "jobs:ingest";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{}", job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Pending,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Processing,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Completed,
            result: Some(result),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Failed,
            result: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

/// Uploaded PDFs waiting in the spool directory for the worker to index
/// into a subject's knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestDocumentJob {
    pub job_id: Uuid,
    pub subject: String,
    pub paths: Vec<PathBuf>,
    pub requested_by: String,
}

impl IngestDocumentJob {
    pub fn new(subject: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            subject: subject.into(),
            paths,
            requested_by: String::new(),
        }
    }

    pub fn with_requester(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = requested_by.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_result_transitions() {
        let id = Uuid::new_v4();
        assert_eq!(JobResult::pending(id).status, QueueJobStatus::Pending);
        assert!(JobResult::processing(id).completed_at.is_none());

        let done = JobResult::completed(id, serde_json::json!({"chunks": 3}));
        assert_eq!(done.status, QueueJobStatus::Completed);
        assert!(done.completed_at.is_some());

        let failed = JobResult::failed(id, "boom");
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_ingest_job_round_trips_through_json() {
        let job = IngestDocumentJob::new("Math", vec![PathBuf::from("/spool/a.pdf")])
            .with_requester("alice");
        let json = serde_json::to_string(&job).unwrap();
        let back: IngestDocumentJob = serde_json::from_str(&json).unwrap();

        assert_eq!(back.job_id, job.job_id);
        assert_eq!(back.subject, "Math");
        assert_eq!(back.requested_by, "alice");
        assert_eq!(back.paths, job.paths);
    }
}
