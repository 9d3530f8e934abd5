use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::user::UserMetadata;
use crate::AppState;

async fn current_metadata(state: &AppState, user_id: Uuid) -> Result<UserMetadata, AppError> {
    let row = sqlx::query_scalar::<_, Json<UserMetadata>>(
        "SELECT user_metadata FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    row.map(|m| m.0)
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))
}

/// Middleware: requires the admin role in the user's stored metadata.
/// Token claims are not trusted here so a role flip applies immediately.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    // Cheap rejection before touching the database.
    if !user.metadata.is_admin() {
        return Err(AppError::Forbidden("Requires admin role".into()));
    }

    let metadata = current_metadata(&state, user.id).await?;
    if !metadata.is_admin() {
        return Err(AppError::Forbidden("Requires admin role".into()));
    }

    req.extensions_mut().insert(AuthUser { metadata, ..user });
    Ok(next.run(req).await)
}

/// Middleware: platform operators only (`OPERATOR_EMAILS`). Guards data shared
/// by every organization, so an organization admin role is not enough.
pub async fn require_operator(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    if !state.config.is_operator(&user.email) {
        tracing::warn!(user_id = %user.id, "non-operator rejected from platform route");
        return Err(AppError::Forbidden("Requires platform operator".into()));
    }

    Ok(next.run(req).await)
}
