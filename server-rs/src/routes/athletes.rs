use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantId;
use crate::models::*;
use crate::services::athlete_import::{self, ImportReport};
use crate::services::table_view::{
    parse_direction, view_athletes, AthleteFilter, AthleteSortField, SortDirection, SortState,
};
use crate::AppState;

const ATHLETE_COLUMNS: &str = "id, name, gender, year, sport_id, organization_id, created_at";

#[derive(Debug, Deserialize)]
pub struct AthleteListQuery {
    pub search: Option<String>,
    pub gender: Option<String>,
    pub sport_id: Option<Uuid>,
    pub year: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

pub async fn list_athletes(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Query(q): Query<AthleteListQuery>,
) -> AppResult<Json<Value>> {
    let rows: Vec<AthleteListItem> = sqlx::query_as(
        r#"SELECT a.id, a.name, a.gender, a.year, a.sport_id, s.name AS sport_name, a.created_at
        FROM athletes a
        LEFT JOIN sports s ON s.id = a.sport_id
        WHERE a.organization_id = $1"#,
    )
    .bind(tenant.0 .0)
    .fetch_all(&state.db)
    .await?;

    let field = q
        .sort
        .as_deref()
        .and_then(AthleteSortField::parse)
        .unwrap_or(AthleteSortField::Name);
    let sort = SortState::new(field, parse_direction(q.direction.as_deref(), SortDirection::Asc));
    let filter = AthleteFilter {
        search: q.search,
        gender: q.gender,
        sport_id: q.sport_id,
        year: q.year,
    };

    let athletes = view_athletes(rows, &filter, &sort);
    Ok(Json(json!({
        "athletes": athletes,
        "count": athletes.len(),
        "sort": sort,
    })))
}

pub async fn get_athlete(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Athlete>> {
    let athlete: Option<Athlete> = sqlx::query_as(&format!(
        "SELECT {ATHLETE_COLUMNS} FROM athletes WHERE id = $1 AND organization_id = $2"
    ))
    .bind(id)
    .bind(tenant.0 .0)
    .fetch_optional(&state.db)
    .await?;

    athlete
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Athlete not found".into()))
}

async fn ensure_sport(state: &AppState, sport_id: Uuid) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sports WHERE id = $1)")
        .bind(sport_id)
        .fetch_one(&state.db)
        .await?;
    if !exists {
        return Err(AppError::BadRequest("Sport not found".into()));
    }
    Ok(())
}

pub async fn create_athlete(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Json(body): Json<AthleteRequest>,
) -> AppResult<Json<Athlete>> {
    let new = body.validate().map_err(AppError::BadRequest)?;
    ensure_sport(&state, new.sport_id).await?;

    let athlete: Athlete = sqlx::query_as(&format!(
        r#"INSERT INTO athletes (id, name, gender, year, sport_id, organization_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING {ATHLETE_COLUMNS}"#
    ))
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.gender)
    .bind(&new.year)
    .bind(new.sport_id)
    .bind(tenant.0 .0)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(athlete_id = %athlete.id, organization_id = %athlete.organization_id, "athlete created");
    Ok(Json(athlete))
}

pub async fn update_athlete(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AthleteRequest>,
) -> AppResult<Json<Athlete>> {
    let new = body.validate().map_err(AppError::BadRequest)?;
    ensure_sport(&state, new.sport_id).await?;

    let athlete: Option<Athlete> = sqlx::query_as(&format!(
        r#"UPDATE athletes SET name = $1, gender = $2, year = $3, sport_id = $4
        WHERE id = $5 AND organization_id = $6
        RETURNING {ATHLETE_COLUMNS}"#
    ))
    .bind(&new.name)
    .bind(&new.gender)
    .bind(&new.year)
    .bind(new.sport_id)
    .bind(id)
    .bind(tenant.0 .0)
    .fetch_optional(&state.db)
    .await?;

    athlete
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Athlete not found".into()))
}

/// Deletes the athlete together with its payments.
pub async fn delete_athlete(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM athletes WHERE id = $1 AND organization_id = $2)",
    )
    .bind(id)
    .bind(tenant.0 .0)
    .fetch_one(&mut *tx)
    .await?;
    if !owned {
        return Err(AppError::NotFound("Athlete not found".into()));
    }

    let payments = sqlx::query("DELETE FROM payments WHERE athlete_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM athletes WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(athlete_id = %id, payments_deleted = payments, "athlete deleted");
    Ok(Json(json!({
        "success": true,
        "payments_deleted": payments,
    })))
}

/// Imports athletes from a CSV body with `name, gender, year, sport` columns.
/// Rows are inserted one at a time; failures are reported, not rolled back.
pub async fn import_athletes(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    body: String,
) -> AppResult<Json<ImportReport>> {
    let rows = athlete_import::parse_csv(&body).map_err(AppError::BadRequest)?;

    let sports: Vec<Sport> = sqlx::query_as("SELECT id, name, created_at FROM sports")
        .fetch_all(&state.db)
        .await?;

    let report = athlete_import::run_import(&state.db, tenant.0 .0, rows, &sports).await;

    tracing::info!(
        organization_id = %tenant.0 .0,
        total = report.total,
        inserted = report.inserted,
        failed = report.failed,
        "athlete csv import finished"
    );
    Ok(Json(report))
}
