use serde::Deserialize;
use serde_json::Value;

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

/// Transactional email over a Mailgun-style HTTP API: form-encoded POST
/// with the API key as basic-auth password.
#[derive(Clone)]
pub struct Mailer {
    api_key: String,
    endpoint: String,
    from: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub reply_to: Option<String>,
}

impl Email {
    pub fn validate(&self) -> Result<(), String> {
        let recipients: Vec<&str> = self
            .to
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() || recipients.iter().any(|r| !r.contains('@')) {
            return Err("At least one valid recipient is required".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("Subject is required".to_string());
        }
        if self.text.trim().is_empty() && self.html.as_deref().map_or(true, |h| h.trim().is_empty()) {
            return Err("Message body is required".to_string());
        }
        Ok(())
    }

    fn form(&self, from: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("from", from.to_string()),
            ("to", self.to.clone()),
            ("subject", self.subject.clone()),
            ("text", self.text.clone()),
        ];
        if let Some(html) = &self.html {
            params.push(("html", html.clone()));
        }
        if let Some(reply_to) = &self.reply_to {
            params.push(("h:Reply-To", reply_to.clone()));
        }
        params
    }
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Option<Self> {
        if config.api_key.is_empty() || config.domain.is_empty() {
            return None;
        }
        Some(Self {
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/v3/{}/messages",
                config.api_base.trim_end_matches('/'),
                config.domain
            ),
            from: config.from.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub async fn send(&self, email: &Email) -> AppResult<Value> {
        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&email.form(&self.from))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mail request failed: {e}")))?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let msg = body["message"].as_str().unwrap_or("Unknown mail API error");
            return Err(AppError::Upstream(format!("Mail API error ({status}): {msg}")));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(body)
    }
}
