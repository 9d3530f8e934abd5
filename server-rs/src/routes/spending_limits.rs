use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantId;
use crate::models::spending_limit::*;
use crate::services::spending::{chart_bar, LimitSpend};
use crate::AppState;

const LIMIT_COLUMNS: &str = "id, sport_id, organization_id, limit_amount, period, created_at";

pub async fn list_limits(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
) -> AppResult<Json<Value>> {
    let limits: Vec<SpendingLimit> = sqlx::query_as(&format!(
        "SELECT {LIMIT_COLUMNS} FROM spending_limits WHERE organization_id = $1 ORDER BY created_at"
    ))
    .bind(tenant.0 .0)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "limits": limits })))
}

pub async fn create_limit(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Json(body): Json<SpendingLimitRequest>,
) -> AppResult<Json<SpendingLimit>> {
    let period = body.validate().map_err(AppError::BadRequest)?;

    let limit: SpendingLimit = sqlx::query_as(&format!(
        r#"INSERT INTO spending_limits (id, sport_id, organization_id, limit_amount, period, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING {LIMIT_COLUMNS}"#
    ))
    .bind(Uuid::new_v4())
    .bind(body.sport_id)
    .bind(tenant.0 .0)
    .bind(body.limit_amount)
    .bind(period.as_str())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(limit_id = %limit.id, sport_id = %limit.sport_id, period = period.as_str(), "spending limit created");
    Ok(Json(limit))
}

pub async fn update_limit(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
    Json(body): Json<SpendingLimitRequest>,
) -> AppResult<Json<SpendingLimit>> {
    let period = body.validate().map_err(AppError::BadRequest)?;

    let limit: Option<SpendingLimit> = sqlx::query_as(&format!(
        r#"UPDATE spending_limits SET sport_id = $1, limit_amount = $2, period = $3
        WHERE id = $4 AND organization_id = $5
        RETURNING {LIMIT_COLUMNS}"#
    ))
    .bind(body.sport_id)
    .bind(body.limit_amount)
    .bind(period.as_str())
    .bind(id)
    .bind(tenant.0 .0)
    .fetch_optional(&state.db)
    .await?;

    limit
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Spending limit not found".into()))
}

pub async fn delete_limit(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM spending_limits WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(tenant.0 .0)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Spending limit not found".into()));
    }
    Ok(Json(json!({"success": true})))
}

#[derive(sqlx::FromRow)]
struct LimitRow {
    id: Uuid,
    sport_id: Uuid,
    sport_name: String,
    limit_amount: f64,
    period: String,
}

/// Budget-vs-actual bars: spend for each limit's sport inside the current
/// period window.
pub async fn chart(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
) -> AppResult<Json<Value>> {
    let org_id = tenant.0 .0;
    let today = Utc::now().date_naive();

    let limits: Vec<LimitRow> = sqlx::query_as(
        r#"SELECT l.id, l.sport_id, s.name AS sport_name, l.limit_amount, l.period
        FROM spending_limits l
        JOIN sports s ON s.id = l.sport_id
        WHERE l.organization_id = $1
        ORDER BY s.name"#,
    )
    .bind(org_id)
    .fetch_all(&state.db)
    .await?;

    let mut bars = Vec::with_capacity(limits.len());
    for limit in limits {
        let Some(period) = Period::parse(&limit.period) else {
            tracing::warn!(limit_id = %limit.id, period = %limit.period, "skipping limit with unknown period");
            continue;
        };

        let actual: f64 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(p.amount), 0)::float8
            FROM payments p
            JOIN athletes a ON a.id = p.athlete_id
            WHERE a.organization_id = $1 AND a.sport_id = $2 AND p.date >= $3 AND p.date <= $4"#,
        )
        .bind(org_id)
        .bind(limit.sport_id)
        .bind(period.window_start(today))
        .bind(today)
        .fetch_one(&state.db)
        .await?;

        bars.push(chart_bar(
            LimitSpend {
                limit_id: limit.id,
                sport_id: limit.sport_id,
                sport_name: limit.sport_name,
                period,
                limit_amount: limit.limit_amount,
                actual,
            },
            today,
        ));
    }

    let over_budget = bars.iter().filter(|b| b.over_budget > 0.0).count();
    Ok(Json(json!({
        "bars": bars,
        "as_of": today,
        "over_budget_count": over_budget,
    })))
}
