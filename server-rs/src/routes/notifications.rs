use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::mailer::Email;
use crate::AppState;

pub async fn send_notification(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    Json(body): Json<Email>,
) -> AppResult<Json<Value>> {
    body.validate().map_err(AppError::BadRequest)?;

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Internal("Mail service is not configured".into()))?;

    let response = mailer.send(&body).await?;

    tracing::info!(sent_by = %user.id, to = %body.to, "notification sent");
    Ok(Json(json!({
        "success": true,
        "id": response.get("id").cloned().unwrap_or(Value::Null),
    })))
}
