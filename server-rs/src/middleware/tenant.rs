use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;

#[derive(Debug, Clone, Copy)]
pub struct TenantId(pub Uuid);

/// Middleware: resolves the caller's organization from their user metadata.
/// Must run after `authenticate`.
pub async fn resolve_tenant(mut req: Request, next: Next) -> Result<Response, AppError> {
    let org_id = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?
        .metadata
        .organization_id
        .ok_or_else(|| AppError::Forbidden("No organization linked to this account".into()))?;

    req.extensions_mut().insert(TenantId(org_id));
    Ok(next.run(req).await)
}
