use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    Json,
};
use serde_json::Value;

use crate::agent::ChatRequest;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/agent/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, AppError> {
    let request = match Json::<ChatRequest>::from_request(request, &state).await {
        Ok(Json(request)) => request,
        // No JSON body means no message.
        Err(JsonRejection::MissingJsonContentType(_)) => ChatRequest::default(),
        Err(e) => return Err(AppError::Validation(e.body_text())),
    };

    let message = match request.message.as_deref() {
        Some(message) if !message.is_empty() => message,
        _ => return Err(AppError::Validation("Message is required".to_string())),
    };

    let reply = state.agent.chat(message, &request).await?;
    Ok(Json(reply))
}
