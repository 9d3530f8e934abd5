use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpendingLimit {
    pub id: Uuid,
    pub sport_id: Uuid,
    pub organization_id: Uuid,
    pub limit_amount: f64,
    pub period: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Some(Period::Monthly),
            "quarterly" => Some(Period::Quarterly),
            "yearly" => Some(Period::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        }
    }

    /// First day of the period containing `today`.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        let month = match self {
            Period::Monthly => today.month(),
            Period::Quarterly => (today.month0() / 3) * 3 + 1,
            Period::Yearly => 1,
        };
        NaiveDate::from_ymd_opt(today.year(), month, 1).unwrap_or(today)
    }
}

#[derive(Debug, Deserialize)]
pub struct SpendingLimitRequest {
    pub sport_id: Uuid,
    pub limit_amount: f64,
    pub period: String,
}

impl SpendingLimitRequest {
    pub fn validate(&self) -> Result<Period, String> {
        if !self.limit_amount.is_finite() || self.limit_amount <= 0.0 {
            return Err("Limit amount must be greater than zero".to_string());
        }
        Period::parse(&self.period)
            .ok_or_else(|| "Period must be monthly, quarterly or yearly".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_starts_follow_calendar_periods() {
        let today = day(2024, 8, 17);
        assert_eq!(Period::Monthly.window_start(today), day(2024, 8, 1));
        assert_eq!(Period::Quarterly.window_start(today), day(2024, 7, 1));
        assert_eq!(Period::Yearly.window_start(today), day(2024, 1, 1));
        assert_eq!(Period::Quarterly.window_start(day(2024, 3, 31)), day(2024, 1, 1));
    }

    #[test]
    fn period_parsing_is_case_insensitive() {
        assert_eq!(Period::parse("Quarterly"), Some(Period::Quarterly));
        assert_eq!(Period::parse("weekly"), None);
    }
}
