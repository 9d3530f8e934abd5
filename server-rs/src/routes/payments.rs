use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantId;
use crate::models::payment::*;
use crate::services::table_view::{
    parse_direction, view_payments, PaymentFilter, PaymentSortField, SortDirection, SortState,
};
use crate::AppState;

const PAYMENT_COLUMNS: &str = "id, athlete_id, amount, date, source, activity_type, link, created_at";

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub search: Option<String>,
    pub athlete_id: Option<Uuid>,
    pub source: Option<String>,
    pub activity_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Query(q): Query<PaymentListQuery>,
) -> AppResult<Json<Value>> {
    let rows: Vec<PaymentListItem> = sqlx::query_as(
        r#"SELECT p.id, p.athlete_id, a.name AS athlete_name, s.name AS sport_name,
            p.amount, p.date, p.source, p.activity_type, p.link, p.created_at
        FROM payments p
        JOIN athletes a ON a.id = p.athlete_id
        LEFT JOIN sports s ON s.id = a.sport_id
        WHERE a.organization_id = $1"#,
    )
    .bind(tenant.0 .0)
    .fetch_all(&state.db)
    .await?;

    // Newest first unless the caller picks a column.
    let sort = match q.sort.as_deref().and_then(PaymentSortField::parse) {
        Some(field) => SortState::new(field, parse_direction(q.direction.as_deref(), SortDirection::Asc)),
        None => SortState::new(
            PaymentSortField::Date,
            parse_direction(q.direction.as_deref(), SortDirection::Desc),
        ),
    };
    let filter = PaymentFilter {
        search: q.search,
        athlete_id: q.athlete_id,
        source: q.source,
        activity_type: q.activity_type,
        from: q.from,
        to: q.to,
        min_amount: q.min_amount,
        max_amount: q.max_amount,
    };

    let payments = view_payments(rows, &filter, &sort);
    let total: f64 = payments.iter().map(|p| p.amount).sum();
    Ok(Json(json!({
        "payments": payments,
        "count": payments.len(),
        "total": total,
        "sort": sort,
    })))
}

async fn ensure_athlete(state: &AppState, tenant: TenantId, athlete_id: Uuid) -> AppResult<()> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM athletes WHERE id = $1 AND organization_id = $2)",
    )
    .bind(athlete_id)
    .bind(tenant.0)
    .fetch_one(&state.db)
    .await?;
    if !owned {
        return Err(AppError::BadRequest("Athlete not found".into()));
    }
    Ok(())
}

pub async fn create_payment(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Json(body): Json<PaymentRequest>,
) -> AppResult<Json<Payment>> {
    let new = body.validate().map_err(AppError::BadRequest)?;
    ensure_athlete(&state, tenant.0, new.athlete_id).await?;

    let payment: Payment = sqlx::query_as(&format!(
        r#"INSERT INTO payments (id, athlete_id, amount, date, source, activity_type, link, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING {PAYMENT_COLUMNS}"#
    ))
    .bind(Uuid::new_v4())
    .bind(new.athlete_id)
    .bind(new.amount)
    .bind(new.date)
    .bind(&new.source)
    .bind(&new.activity_type)
    .bind(&new.link)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(payment_id = %payment.id, athlete_id = %payment.athlete_id, amount = payment.amount, "payment recorded");
    Ok(Json(payment))
}

pub async fn update_payment(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentRequest>,
) -> AppResult<Json<Payment>> {
    let new = body.validate().map_err(AppError::BadRequest)?;
    ensure_athlete(&state, tenant.0, new.athlete_id).await?;

    let payment: Option<Payment> = sqlx::query_as(
        r#"UPDATE payments p SET athlete_id = $1, amount = $2, date = $3, source = $4,
            activity_type = $5, link = $6
        FROM athletes a
        WHERE p.id = $7 AND a.id = p.athlete_id AND a.organization_id = $8
        RETURNING p.id, p.athlete_id, p.amount, p.date, p.source, p.activity_type, p.link, p.created_at"#,
    )
    .bind(new.athlete_id)
    .bind(new.amount)
    .bind(new.date)
    .bind(&new.source)
    .bind(&new.activity_type)
    .bind(&new.link)
    .bind(id)
    .bind(tenant.0 .0)
    .fetch_optional(&state.db)
    .await?;

    payment
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Payment not found".into()))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query(
        r#"DELETE FROM payments p USING athletes a
        WHERE p.id = $1 AND a.id = p.athlete_id AND a.organization_id = $2"#,
    )
    .bind(id)
    .bind(tenant.0 .0)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Payment not found".into()));
    }
    Ok(Json(json!({"success": true})))
}
