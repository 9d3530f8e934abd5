use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantId;
use crate::services::{equity, reports, trends};
use crate::AppState;

/// Gender-equity comparison: payment share vs athlete share per gender.
pub async fn equity_report(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
) -> AppResult<Json<Value>> {
    let org_id = tenant.0 .0;

    let (payments, athletes, sports) = tokio::try_join!(
        reports::gender_payment_distribution(&state.db, org_id),
        reports::gender_athlete_distribution(&state.db, org_id),
        reports::sport_payment_distribution(&state.db, org_id),
    )?;

    let report = equity::build_report(&payments, &athletes);
    tracing::debug!(organization_id = %org_id, score = report.score, "equity score computed");

    Ok(Json(json!({
        "equity": report,
        "sports": sports,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub granularity: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn trend_report(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Query(q): Query<TrendQuery>,
) -> AppResult<Json<Value>> {
    let granularity = trends::Granularity::parse(q.granularity.as_deref()).ok_or_else(|| {
        AppError::BadRequest("Granularity must be month, quarter or year".into())
    })?;
    if let (Some(from), Some(to)) = (q.from, q.to) {
        if from > to {
            return Err(AppError::BadRequest("'from' must not be after 'to'".into()));
        }
    }

    let facts = reports::payment_facts(&state.db, tenant.0 .0, q.from, q.to).await?;
    let report = trends::build_report(&facts, granularity);

    Ok(Json(json!({ "trends": report })))
}
