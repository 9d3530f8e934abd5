use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantId;
use crate::services::upload::{
    self, AthleteRows, PaymentRows, UploadFormat, UploadKind, UploadReport,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub format: Option<String>,
}

/// Bulk upload of payments or athletes as CSV or a JSON array of objects.
/// Records are validated one by one and valid ones inserted in fixed-size
/// chunks; a failed chunk marks its records failed and the upload continues.
pub async fn upload(
    State(state): State<AppState>,
    tenant: axum::Extension<TenantId>,
    Path(kind): Path<String>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<UploadReport>> {
    let kind = UploadKind::parse(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown upload type '{kind}'")))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let format = UploadFormat::detect(q.format.as_deref(), content_type, &body);

    let records = upload::parse_records(&body, format).map_err(AppError::BadRequest)?;
    if records.is_empty() {
        return Err(AppError::BadRequest("Upload contains no records".into()));
    }

    let org_id = tenant.0 .0;
    let chunk_size = state.config.import.upload_chunk_size;
    let mut report = UploadReport::new(records.len());

    match kind {
        UploadKind::Payments => {
            let athletes: HashSet<Uuid> =
                sqlx::query_scalar("SELECT id FROM athletes WHERE organization_id = $1")
                    .bind(org_id)
                    .fetch_all(&state.db)
                    .await?
                    .into_iter()
                    .collect();

            let mut valid = Vec::new();
            for (i, record) in records.iter().enumerate() {
                match upload::validate_payment(record, &athletes) {
                    Ok(p) => valid.push((i + 1, p)),
                    Err(msg) => report.reject(i + 1, msg),
                }
            }
            let sink = PaymentRows { db: &state.db };
            upload::insert_chunked(&sink, valid, chunk_size, &mut report).await;
        }
        UploadKind::Athletes => {
            let sports: HashSet<Uuid> = sqlx::query_scalar("SELECT id FROM sports")
                .fetch_all(&state.db)
                .await?
                .into_iter()
                .collect();

            let mut valid = Vec::new();
            for (i, record) in records.iter().enumerate() {
                match upload::validate_athlete(record, &sports) {
                    Ok(a) => valid.push((i + 1, a)),
                    Err(msg) => report.reject(i + 1, msg),
                }
            }
            let sink = AthleteRows {
                db: &state.db,
                organization_id: org_id,
            };
            upload::insert_chunked(&sink, valid, chunk_size, &mut report).await;
        }
    }

    report.errors.sort_by_key(|e| e.record);

    tracing::info!(
        organization_id = %org_id,
        kind = ?kind,
        total = report.total,
        inserted = report.inserted,
        failed = report.failed,
        "bulk upload finished"
    );
    Ok(Json(report))
}

/// Per-kind field reference for upload templates.
pub async fn upload_template(Path(kind): Path<String>) -> AppResult<Json<HashMap<&'static str, Vec<&'static str>>>> {
    let kind = UploadKind::parse(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown upload type '{kind}'")))?;
    let optional: &[&str] = match kind {
        UploadKind::Payments => &["activity_type", "link"],
        UploadKind::Athletes => &[],
    };
    Ok(Json(HashMap::from([
        ("required", kind.required_fields().to_vec()),
        ("optional", optional.to_vec()),
    ])))
}
