use axum::{extract::State, Json};
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{generate_tokens, is_refresh, verify_token, AuthUser};
use crate::models::user::*;
use crate::AppState;

const USER_COLUMNS: &str = "id, email, password_hash, user_metadata, created_at, last_sign_in_at";

fn issue(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let tokens = generate_tokens(
        user.id,
        &user.email,
        &user.user_metadata.0,
        &state.config.jwt.secret,
        state.config.jwt.access_expiry_secs,
        state.config.jwt.refresh_expiry_secs,
    )?;
    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: UserPublic::from(user),
    })
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&state.db)
            .await?,
    )
}

/// Creates an organization and its first user, who becomes the organization's admin.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&body.email)
        .ok_or_else(|| AppError::BadRequest("A valid email is required".into()))?;
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let name = body.name.trim();
    let organization = body.organization.trim();
    if name.is_empty() || organization.is_empty() {
        return Err(AppError::BadRequest(
            "Name and organization are required".into(),
        ));
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash =
        bcrypt::hash(&body.password, 12).map_err(|e| AppError::Internal(e.to_string()))?;

    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    let metadata = UserMetadata {
        role: Some(ROLE_ADMIN.to_string()),
        organization: Some(organization.to_string()),
        organization_id: Some(org_id),
        name: Some(name.to_string()),
    };

    let mut tx = state.db.begin().await?;

    sqlx::query(
        "INSERT INTO organizations (id, name, admin_user_id, created_at) VALUES ($1, $2, NULL, NOW())",
    )
    .bind(org_id)
    .bind(organization)
    .execute(&mut *tx)
    .await?;

    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (id, email, password_hash, user_metadata, created_at, last_sign_in_at)
        VALUES ($1, $2, $3, $4, NOW(), NOW())
        RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&email)
    .bind(&password_hash)
    .bind(SqlJson(&metadata))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE organizations SET admin_user_id = $1 WHERE id = $2")
        .bind(user_id)
        .bind(org_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, organization_id = %org_id, "organization signed up");
    Ok(Json(issue(&state, &user)?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());
    let email = normalize_email(&body.email).ok_or_else(invalid)?;

    let user: User = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(invalid)?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(invalid());
    }

    sqlx::query("UPDATE users SET last_sign_in_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(issue(&state, &user)?))
}

/// Exchanges a refresh token for a new pair. Metadata is re-read so role and
/// organization changes reach the new access token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let claims = verify_token(&body.refresh_token, &state.config.jwt.secret)?;
    if !is_refresh(&claims) {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))?;
    let user = find_user(&state, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;

    Ok(Json(issue(&state, &user)?))
}

pub async fn me(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let record = find_user(&state, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(json!({ "user": UserPublic::from(&record) })))
}
