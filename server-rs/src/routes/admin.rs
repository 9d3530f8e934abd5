use axum::{
    extract::{Path, Query, State},
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::TenantId;
use crate::models::user::*;
use crate::AppState;

const USER_COLUMNS: &str = "id, email, password_hash, user_metadata, created_at, last_sign_in_at";
const TEMP_PASSWORD_LEN: usize = 14;

#[derive(Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
}

fn temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Organization admins may only create users inside their own organization.
fn target_organization(requested: Option<Uuid>, own: Uuid) -> AppResult<Uuid> {
    match requested {
        Some(id) if id != own => Err(AppError::Forbidden(
            "Cannot manage users of another organization".into(),
        )),
        _ => Ok(own),
    }
}

fn ensure_not_self(admin: &AuthUser, id: Uuid) -> AppResult<()> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Admins cannot change their own role".into(),
        ));
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Query(q): Query<UserQuery>,
) -> AppResult<Json<Value>> {
    let search = format!("%{}%", q.search.as_deref().unwrap_or("").trim());

    let rows: Vec<User> = sqlx::query_as(&format!(
        r#"SELECT {USER_COLUMNS} FROM users
        WHERE user_metadata->>'organization_id' = $2
            AND (email ILIKE $1 OR COALESCE(user_metadata->>'name', '') ILIKE $1)
        ORDER BY created_at DESC"#
    ))
    .bind(&search)
    .bind(tenant.0 .0.to_string())
    .fetch_all(&state.db)
    .await?;

    let users: Vec<UserPublic> = rows.iter().map(UserPublic::from).collect();
    Ok(Json(json!({ "users": users, "count": users.len() })))
}

/// Creates a user in the admin's organization. Without a password a
/// temporary one is generated and returned once in the response.
pub async fn create_user(
    State(state): State<AppState>,
    admin: axum::Extension<AuthUser>,
    tenant: axum::Extension<TenantId>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<Json<Value>> {
    let email = normalize_email(&body.email)
        .ok_or_else(|| AppError::BadRequest("A valid email is required".into()))?;
    let role = match body.role.as_deref() {
        Some(r) => normalize_role(r)
            .ok_or_else(|| AppError::BadRequest("Role must be admin or user".into()))?,
        None => ROLE_USER,
    };

    let (password, generated) = match body.password {
        Some(p) if p.len() >= MIN_PASSWORD_LEN => (p, false),
        Some(_) => {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )))
        }
        None => (temporary_password(), true),
    };

    let organization_id = target_organization(body.organization_id, tenant.0 .0)?;
    let organization: Option<String> =
        sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
            .bind(organization_id)
            .fetch_optional(&state.db)
            .await?;

    let metadata = UserMetadata {
        role: Some(role.to_string()),
        organization,
        organization_id: Some(organization_id),
        name: body.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    };

    let password_hash =
        bcrypt::hash(&password, 12).map_err(|e| AppError::Internal(e.to_string()))?;

    let user: User = sqlx::query_as(&format!(
        r#"INSERT INTO users (id, email, password_hash, user_metadata, created_at)
        VALUES ($1, $2, $3, $4, NOW())
        RETURNING {USER_COLUMNS}"#
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&password_hash)
    .bind(SqlJson(&metadata))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, created_by = %admin.id, role, "user created by admin");

    let temp_password = generated.then_some(password);
    Ok(Json(json!({
        "user": UserPublic::from(&user),
        "temporary_password": temp_password,
    })))
}

async fn write_metadata(
    state: &AppState,
    tenant: TenantId,
    id: Uuid,
    metadata: &UserMetadata,
) -> AppResult<User> {
    sqlx::query_as(&format!(
        r#"UPDATE users SET user_metadata = $1
        WHERE id = $2 AND user_metadata->>'organization_id' = $3
        RETURNING {USER_COLUMNS}"#
    ))
    .bind(SqlJson(metadata))
    .bind(id)
    .bind(tenant.0.to_string())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Users outside the admin's organization read as not found.
async fn read_metadata(state: &AppState, tenant: TenantId, id: Uuid) -> AppResult<UserMetadata> {
    let row: Option<SqlJson<UserMetadata>> = sqlx::query_scalar(
        "SELECT user_metadata FROM users WHERE id = $1 AND user_metadata->>'organization_id' = $2",
    )
    .bind(id)
    .bind(tenant.0.to_string())
    .fetch_optional(&state.db)
    .await?;
    row.map(|m| m.0)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn set_role(
    State(state): State<AppState>,
    admin: axum::Extension<AuthUser>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> AppResult<Json<Value>> {
    ensure_not_self(&admin, id)?;
    let role = normalize_role(&body.role)
        .ok_or_else(|| AppError::BadRequest("Role must be admin or user".into()))?;

    let mut metadata = read_metadata(&state, tenant.0, id).await?;
    metadata.role = Some(role.to_string());
    let user = write_metadata(&state, tenant.0, id, &metadata).await?;

    tracing::info!(user_id = %id, changed_by = %admin.id, role, "user role set");
    Ok(Json(json!({ "user": UserPublic::from(&user) })))
}

/// Flips the metadata role between admin and user.
pub async fn toggle_admin(
    State(state): State<AppState>,
    admin: axum::Extension<AuthUser>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    ensure_not_self(&admin, id)?;

    let mut metadata = read_metadata(&state, tenant.0, id).await?;
    metadata.toggle_admin();
    let user = write_metadata(&state, tenant.0, id, &metadata).await?;

    tracing::info!(user_id = %id, changed_by = %admin.id, is_admin = metadata.is_admin(), "admin flag toggled");
    Ok(Json(json!({
        "user": UserPublic::from(&user),
        "is_admin": metadata.is_admin(),
    })))
}

pub async fn list_demo_requests(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let requests = state.demo_requests.list().await?;
    Ok(Json(json!({
        "demo_requests": requests,
        "count": requests.len(),
    })))
}
