use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row returned by `get_gender_payment_distribution`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenderPaymentRow {
    pub gender: String,
    pub total_amount: f64,
    pub payment_count: i64,
}

/// Row returned by `get_gender_athlete_distribution`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenderAthleteRow {
    pub gender: String,
    pub athlete_count: i64,
}

/// Row returned by `get_sport_payment_distribution`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SportPaymentRow {
    pub sport_id: Uuid,
    pub sport_name: String,
    pub total_amount: f64,
    pub payment_count: i64,
}

/// Minimal payment projection used by trend and report aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentFact {
    pub amount: f64,
    pub date: NaiveDate,
    pub source: String,
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AthleteTotalRow {
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub sport_name: Option<String>,
    pub total_amount: f64,
    pub payment_count: i64,
}
