use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::tenant::TenantId;
use crate::services::reports::{self, ReportSummary, TOP_ATHLETES_LIMIT};
use crate::AppState;

pub async fn summary(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
) -> AppResult<Json<ReportSummary>> {
    let org_id = tenant.0 .0;

    let (sports, top_athletes, monthly) = tokio::try_join!(
        reports::sport_payment_distribution(&state.db, org_id),
        reports::top_athletes(&state.db, org_id, TOP_ATHLETES_LIMIT),
        reports::monthly_totals(&state.db, org_id),
    )?;

    Ok(Json(ReportSummary::new(sports, top_athletes, monthly)))
}
