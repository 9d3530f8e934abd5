use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::tenant::TenantId;
use crate::models::organization::*;
use crate::AppState;

const MEMBER_NAME_SYNC: &str = r#"UPDATE users
    SET user_metadata = jsonb_set(user_metadata, '{organization}', to_jsonb($1::text))
    WHERE user_metadata->>'organization_id' = $2::text"#;

async fn load(state: &AppState, tenant: TenantId) -> AppResult<Organization> {
    sqlx::query_as("SELECT id, name, admin_user_id, created_at FROM organizations WHERE id = $1")
        .bind(tenant.0)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".into()))
}

pub async fn get_organization(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
) -> AppResult<Json<Value>> {
    let org = load(&state, tenant.0).await?;

    let athlete_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM athletes WHERE organization_id = $1")
            .bind(org.id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(json!({
        "organization": org,
        "athlete_count": athlete_count,
    })))
}

/// Renames the organization. Only its admin user may do this.
pub async fn update_organization(
    State(state): State<AppState>,
    user: axum::Extension<AuthUser>,
    tenant: axum::Extension<TenantId>,
    Json(body): Json<UpdateOrganizationRequest>,
) -> AppResult<Json<Organization>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Organization name required".into()));
    }

    let org = load(&state, tenant.0).await?;
    if org.admin_user_id != Some(user.id) {
        return Err(AppError::Forbidden(
            "Only the organization admin can update it".into(),
        ));
    }

    let mut tx = state.db.begin().await?;

    let updated: Organization = sqlx::query_as(
        "UPDATE organizations SET name = $1 WHERE id = $2 RETURNING id, name, admin_user_id, created_at",
    )
    .bind(name)
    .bind(org.id)
    .fetch_one(&mut *tx)
    .await?;

    // Members' metadata carries the name too; both change or neither does.
    let members = sqlx::query(MEMBER_NAME_SYNC)
        .bind(name)
        .bind(org.id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    tracing::info!(organization_id = %org.id, members, "organization renamed");
    Ok(Json(updated))
}
