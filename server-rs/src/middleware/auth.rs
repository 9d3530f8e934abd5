use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::UserMetadata;
use crate::AppState;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(rename = "type")]
    pub token_type: Option<String>, // "access" or "refresh"
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub metadata: UserMetadata,
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn generate_tokens(
    user_id: Uuid,
    email: &str,
    metadata: &UserMetadata,
    secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> AppResult<TokenPair> {
    let now = Utc::now().timestamp();
    let claims = |token_type: &str, ttl: i64| Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        user_metadata: metadata.clone(),
        token_type: Some(token_type.to_string()),
        exp: now + ttl,
        iat: now,
    };

    Ok(TokenPair {
        access_token: sign(&claims(ACCESS, access_expiry_secs), secret)?,
        refresh_token: sign(&claims(REFRESH, refresh_expiry_secs), secret)?,
    })
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn is_refresh(claims: &Claims) -> bool {
    claims.token_type.as_deref() == Some(REFRESH)
}

fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Middleware: requires a valid access token. Sets AuthUser in extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(&req)
        .ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;

    let claims = verify_token(&token, &state.config.jwt.secret)?;

    if is_refresh(&claims) {
        return Err(AppError::Unauthorized("Access token required".into()));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))?;

    req.extensions_mut().insert(AuthUser {
        id: user_id,
        email: claims.email,
        metadata: claims.user_metadata,
    });

    Ok(next.run(req).await)
}
