use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::Owner;
use crate::api::routes::{error_response, ErrorResponse};
use crate::api::state::AppState;
use crate::infrastructure::IngestDocumentJob;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub status: String,
    pub files: usize,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub async fn list_subjects(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.agents.subject_names().to_vec())
}

/// Accepts multipart PDF uploads for one subject, spools them to disk and
/// queues an ingestion job for the worker.
pub async fn upload_documents(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Extension(Owner(owner)): Extension<Owner>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.agents.contains(&subject) {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Subject '{subject}' not found."),
        ));
    }

    let job_id = Uuid::new_v4();
    let spool_dir = PathBuf::from(&state.config.config.ingest.spool_dir).join(job_id.to_string());
    tokio::fs::create_dir_all(&spool_dir).await.map_err(|e| {
        tracing::error!(error = %e, "failed to create spool directory");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store uploaded files.",
        )
    })?;

    let max_bytes = state.config.config.ingest.max_upload_mb * 1024 * 1024;
    let mut paths = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}"))
    })? {
        let Some(file_name) = field.file_name().map(sanitize_file_name) else {
            continue;
        };

        let bytes = field.bytes().await.map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}"))
        })?;

        if bytes.len() > max_bytes {
            cleanup_spool(&spool_dir).await;
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("File '{file_name}' exceeds the size limit."),
            ));
        }

        let path = spool_dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            tracing::error!(error = %e, "failed to write spooled file");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded files.",
            )
        })?;
        paths.push(path);
    }

    if paths.is_empty() {
        cleanup_spool(&spool_dir).await;
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No files provided.",
        ));
    }

    let files = paths.len();
    let job = IngestDocumentJob {
        job_id,
        subject,
        paths,
        requested_by: owner,
    };

    if let Err(e) = state.job_producer.push_ingest_job(&job).await {
        tracing::error!(error = %e, "Failed to queue ingest job");
        cleanup_spool(&spool_dir).await;
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to queue ingestion job.",
        ));
    }

    Ok(Json(UploadResponse {
        job_id,
        status: "queued".to_string(),
        files,
    }))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    let result = state
        .job_producer
        .get_job_status(&job_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get job status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Some(job_result) => Ok(Json(JobStatusResponse {
            job_id: job_result.job_id,
            status: format!("{:?}", job_result.status).to_lowercase(),
            result: job_result.result,
            error: job_result.error,
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

fn sanitize_file_name(name: &str) -> String {
    FsPath::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf")
        .to_string()
}

async fn cleanup_spool(dir: &FsPath) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::warn!(error = %e, "failed to clean up spool directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_file_name("dir/inner.pdf"), "inner.pdf");
    }
}
