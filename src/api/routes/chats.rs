use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::Owner;
use crate::api::routes::{error_response, ErrorResponse};
use crate::api::state::AppState;
use crate::domain::{ChatMessage, ChatSession, DomainError};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub subject: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChatRequest {
    pub name: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatSessionResponse {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatSession> for ChatSessionResponse {
    fn from(session: ChatSession) -> Self {
        Self {
            id: session.id,
            name: session.name,
            subject: session.subject,
            owner: session.owner,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            role: message.role.as_str().to_string(),
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    #[serde(flatten)]
    pub session: ChatSessionResponse,
    pub messages: Vec<ChatMessageResponse>,
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
) -> Result<Json<Vec<ChatSessionResponse>>, StatusCode> {
    let sessions = state.chat_store.list_sessions(&owner).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list chat sessions");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
    Json(request): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    if !state.agents.contains(&request.subject) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid subject '{}' provided.", request.subject),
        ));
    }

    let mut session = ChatSession::new(owner, request.subject);
    if let Some(name) = request.name.filter(|n| !n.trim().is_empty()) {
        session = session.with_name(name);
    }

    state.chat_store.create_session(&session).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create chat session");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create chat session.",
        )
    })?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatDetailResponse>, StatusCode> {
    let session = state
        .chat_store
        .get_session(id, &owner)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get chat session");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let messages = state.chat_store.list_messages(id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list chat messages");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ChatDetailResponse {
        session: session.into(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

pub async fn update_chat(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateChatRequest>,
) -> Result<Json<ChatSessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Some(subject) = &request.subject {
        if !state.agents.contains(subject) {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid subject '{subject}' provided."),
            ));
        }
    }

    match state
        .chat_store
        .update_session(id, &owner, request.name.as_deref(), request.subject.as_deref())
        .await
    {
        Ok(()) => {}
        Err(DomainError::NotFound(_)) => {
            return Err(error_response(
                StatusCode::NOT_FOUND,
                "Chat session not found or you do not have permission.",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update chat session");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update chat session.",
            ));
        }
    }

    let session = state
        .chat_store
        .get_session(id, &owner)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reload chat session");
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

    Ok(Json(session.into()))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    match state.chat_store.delete_session(id, &owner).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(DomainError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete chat session");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
