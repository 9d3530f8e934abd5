use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: String,
    pub activity_type: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined with athlete and sport names for the payments table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentListItem {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub sport_name: Option<String>,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: String,
    pub activity_type: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub athlete_id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: String,
    pub activity_type: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub athlete_id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: String,
    pub activity_type: Option<String>,
    pub link: Option<String>,
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

impl PaymentRequest {
    pub fn validate(&self) -> Result<NewPayment, String> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err("Amount must be greater than zero".to_string());
        }
        let source = self.source.trim();
        if source.is_empty() {
            return Err("Source is required".to_string());
        }
        Ok(NewPayment {
            athlete_id: self.athlete_id,
            amount: self.amount,
            date: self.date,
            source: source.to_string(),
            activity_type: non_empty(self.activity_type.as_deref()),
            link: non_empty(self.link.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: f64, source: &str) -> PaymentRequest {
        PaymentRequest {
            athlete_id: Uuid::new_v4(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            source: source.to_string(),
            activity_type: Some("  ".to_string()),
            link: Some("https://example.com/deal".to_string()),
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(request(0.0, "Nike").validate().is_err());
        assert!(request(-5.0, "Nike").validate().is_err());
        assert!(request(f64::NAN, "Nike").validate().is_err());
    }

    #[test]
    fn blank_optionals_become_none() {
        let p = request(250.0, " Nike ").validate().unwrap();
        assert_eq!(p.source, "Nike");
        assert_eq!(p.activity_type, None);
        assert_eq!(p.link.as_deref(), Some("https://example.com/deal"));
    }
}
