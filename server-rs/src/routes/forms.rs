//! Public marketing-site forms. No authentication; rate limited per client.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::demo_request::*;
use crate::services::fallback_store::CONTACT_MESSAGES;
use crate::services::mailer::Email;
use crate::AppState;

fn demo_request_email(to: &str, r: &DemoRequest) -> Email {
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    Email {
        to: to.to_string(),
        subject: format!("Demo request: {} ({})", r.institution, r.name),
        text: format!(
            "Name: {}\nEmail: {}\nInstitution: {}\nPhone: {}\nPreferred time: {}\n\n{}",
            r.name,
            r.email,
            r.institution,
            optional(&r.phone_number),
            optional(&r.preferred_time),
            optional(&r.message),
        ),
        html: None,
        reply_to: Some(r.email.clone()),
    }
}

fn contact_email(to: &str, m: &ContactMessage) -> Email {
    Email {
        to: to.to_string(),
        subject: m
            .subject
            .clone()
            .unwrap_or_else(|| format!("Contact form message from {}", m.name)),
        text: format!("From: {} <{}>\n\n{}", m.name, m.email, m.message),
        html: None,
        reply_to: Some(m.email.clone()),
    }
}

pub async fn submit_demo_request(
    State(state): State<AppState>,
    Json(body): Json<DemoRequestForm>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let request = body.into_record().map_err(AppError::BadRequest)?;
    let stored_in = state.demo_requests.create(&request).await?;

    tracing::info!(demo_request_id = %request.id, institution = %request.institution, ?stored_in, "demo request received");

    // Notification is best-effort and must not hold up the response.
    if let Some(mailer) = state.mailer.clone() {
        let notify_to = state.config.mail.notify_to.clone();
        if !notify_to.is_empty() {
            let email = demo_request_email(&notify_to, &request);
            tokio::spawn(async move {
                if let Err(e) = mailer.send(&email).await {
                    tracing::warn!(error = %e, "demo request notification failed");
                }
            });
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": request.id,
            "stored_in": stored_in,
        })),
    ))
}

/// Delivers the message by email, or keeps it in the fallback store when
/// mail is unconfigured or the send fails.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactForm>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let message = body.into_record().map_err(AppError::BadRequest)?;
    let notify_to = &state.config.mail.notify_to;

    let delivered = match &state.mailer {
        Some(mailer) if !notify_to.is_empty() => {
            match mailer.send(&contact_email(notify_to, &message)).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "contact email failed, storing locally");
                    false
                }
            }
        }
        _ => false,
    };

    if !delivered {
        state.fallback.push(CONTACT_MESSAGES, &message).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": message.id,
            "delivered": delivered,
        })),
    ))
}
