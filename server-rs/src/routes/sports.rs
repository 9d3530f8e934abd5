use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::sport::*;
use crate::AppState;

fn validated_name(body: &SportRequest) -> AppResult<String> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Sport name required".into()));
    }
    Ok(name.to_string())
}

pub async fn list_sports(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let sports: Vec<Sport> =
        sqlx::query_as("SELECT id, name, created_at FROM sports ORDER BY name")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(json!({ "sports": sports })))
}

pub async fn create_sport(
    State(state): State<AppState>,
    Json(body): Json<SportRequest>,
) -> AppResult<Json<Sport>> {
    let name = validated_name(&body)?;

    let sport: Sport = sqlx::query_as(
        "INSERT INTO sports (id, name, created_at) VALUES ($1, $2, NOW()) RETURNING id, name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(sport_id = %sport.id, name = %sport.name, "sport created");
    Ok(Json(sport))
}

pub async fn update_sport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SportRequest>,
) -> AppResult<Json<Sport>> {
    let name = validated_name(&body)?;

    let sport: Option<Sport> = sqlx::query_as(
        "UPDATE sports SET name = $1 WHERE id = $2 RETURNING id, name, created_at",
    )
    .bind(&name)
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    sport
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Sport not found".into()))
}

pub async fn delete_sport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let in_use: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM athletes WHERE sport_id = $1)")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if in_use {
        return Err(AppError::Conflict(
            "Sport still has athletes assigned".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM sports WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Sport not found".into()));
    }

    Ok(Json(json!({"success": true})))
}
