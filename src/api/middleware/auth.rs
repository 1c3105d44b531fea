use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;

/// The authenticated identity attached to the request. Sessions are
/// created and listed under this name.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

/// Checks the request key against the configured named keys and injects
/// the matching owner. With no keys configured, requests run as
/// "anonymous".
pub async fn api_key_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = extract_key(&request).map(str::to_string);
    let keys = &state.config.config.auth.api_keys;

    let owner = if keys.is_empty() {
        Owner("anonymous".to_string())
    } else {
        match provided.and_then(|candidate| keys.iter().find(|k| k.key == candidate)) {
            Some(entry) => Owner(entry.name.clone()),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}

fn extract_key(request: &Request) -> Option<&str> {
    if let Some(key) = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
    {
        return Some(key);
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
