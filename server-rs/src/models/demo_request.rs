use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DemoRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub institution: String,
    pub phone_number: Option<String>,
    pub preferred_time: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoRequestForm {
    pub name: String,
    pub email: String,
    pub institution: String,
    pub phone_number: Option<String>,
    pub preferred_time: Option<String>,
    pub message: Option<String>,
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl DemoRequestForm {
    /// Checks required fields and builds the record to persist.
    pub fn into_record(self) -> Result<DemoRequest, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        let institution = self.institution.trim();
        if name.is_empty() || email.is_empty() || institution.is_empty() {
            return Err("Name, email and institution are required".to_string());
        }
        if !email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        Ok(DemoRequest {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            institution: institution.to_string(),
            phone_number: trimmed(&self.phone_number),
            preferred_time: trimmed(&self.preferred_time),
            message: trimmed(&self.message),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn into_record(self) -> Result<ContactMessage, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();
        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err("Name, email and message are required".to_string());
        }
        if !email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        Ok(ContactMessage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            subject: trimmed(&self.subject),
            message: message.to_string(),
            created_at: Utc::now(),
        })
    }
}
