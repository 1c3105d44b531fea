use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::Owner;
use crate::api::routes::{error_response, ErrorResponse};
use crate::api::state::AppState;
use crate::domain::{AnswerBundle, MessageRole};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub chat_id: Uuid,
}

/// Answers one question inside a chat session: persists the user turn,
/// runs the session subject's agent, persists the assistant turn, and
/// returns the full answer bundle.
pub async fn query_handler(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerBundle>, (StatusCode, Json<ErrorResponse>)> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Field 'question' must not be empty.",
        ));
    }

    let session = state
        .chat_store
        .get_session(request.chat_id, &owner)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load chat session");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load chat session.",
            )
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                "Chat session not found or you do not have permission.",
            )
        })?;

    let agent = state.agents.get(&session.subject).ok_or_else(|| {
        tracing::error!(subject = %session.subject, "session references unknown subject");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("No agent is configured for subject '{}'.", session.subject),
        )
    })?;

    state
        .chat_store
        .append_message(session.id, MessageRole::User, question)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to persist user message");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist message.",
            )
        })?;

    let bundle = agent.answer_question(question).await;

    // The transcript must reflect what the user saw, even degraded answers.
    if let Err(e) = state
        .chat_store
        .append_message(session.id, MessageRole::Assistant, &bundle.final_answer)
        .await
    {
        tracing::error!(error = %e, "Failed to persist assistant message");
    }

    Ok(Json(bundle))
}
