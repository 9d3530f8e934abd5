use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::DemoRequest;
use crate::services::fallback_store::{FallbackStore, DEMO_REQUESTS};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("demo_requests table does not exist")]
    Missing,
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(sqlx::Error),
}

impl From<sqlx::Error> for TableError {
    fn from(e: sqlx::Error) -> Self {
        if db::is_undefined_table(&e) {
            TableError::Missing
        } else if db::is_unavailable(&e) {
            TableError::Unavailable(e.to_string())
        } else {
            TableError::Other(e)
        }
    }
}

impl TableError {
    fn wants_fallback(&self) -> bool {
        matches!(self, TableError::Missing | TableError::Unavailable(_))
    }
}

impl From<TableError> for AppError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::Other(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DemoRequestTable: Send + Sync {
    async fn insert(&self, request: &DemoRequest) -> Result<(), TableError>;
    async fn list(&self) -> Result<Vec<DemoRequest>, TableError>;
}

pub struct PgDemoRequestTable {
    pub pool: sqlx::PgPool,
}

#[async_trait]
impl DemoRequestTable for PgDemoRequestTable {
    async fn insert(&self, r: &DemoRequest) -> Result<(), TableError> {
        sqlx::query(
            r#"INSERT INTO demo_requests (id, name, email, institution, phone_number, preferred_time, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(r.id)
        .bind(&r.name)
        .bind(&r.email)
        .bind(&r.institution)
        .bind(&r.phone_number)
        .bind(&r.preferred_time)
        .bind(&r.message)
        .bind(r.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DemoRequest>, TableError> {
        Ok(sqlx::query_as::<_, DemoRequest>(
            "SELECT id, name, email, institution, phone_number, preferred_time, message, created_at FROM demo_requests ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredIn {
    Database,
    Fallback,
}

#[derive(Clone)]
pub struct DemoRequestService {
    table: Arc<dyn DemoRequestTable>,
    fallback: FallbackStore,
}

impl DemoRequestService {
    pub fn new(table: Arc<dyn DemoRequestTable>, fallback: FallbackStore) -> Self {
        Self { table, fallback }
    }

    /// Saves to the table, or to the fallback store when the table is missing
    /// or the database is unreachable.
    pub async fn create(&self, request: &DemoRequest) -> AppResult<StoredIn> {
        match self.table.insert(request).await {
            Ok(()) => Ok(StoredIn::Database),
            Err(e) if e.wants_fallback() => {
                tracing::warn!(error = %e, "demo request stored in fallback");
                self.fallback.push(DEMO_REQUESTS, request).await?;
                Ok(StoredIn::Fallback)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Table rows merged with fallback entries, newest first.
    pub async fn list(&self) -> AppResult<Vec<DemoRequest>> {
        let mut rows = match self.table.list().await {
            Ok(rows) => rows,
            Err(e) if e.wants_fallback() => {
                tracing::warn!(error = %e, "listing demo requests from fallback only");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let stored: Vec<DemoRequest> = self.fallback.list(DEMO_REQUESTS).await?;
        for r in stored {
            if !rows.iter().any(|existing| existing.id == r.id) {
                rows.push(r);
            }
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
