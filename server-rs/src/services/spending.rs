use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Period;

/// One stacked bar of the spending-limits chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub limit_id: Uuid,
    pub sport_id: Uuid,
    pub sport_name: String,
    pub period: Period,
    pub window_start: NaiveDate,
    pub limit_amount: f64,
    pub actual: f64,
    /// Spend drawn inside the limit; never exceeds `limit_amount`.
    pub used: f64,
    pub remaining: f64,
    pub over_budget: f64,
    pub percent_used: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarAmounts {
    pub used: f64,
    pub remaining: f64,
    pub over_budget: f64,
    pub percent_used: f64,
}

pub fn bar_amounts(limit: f64, actual: f64) -> BarAmounts {
    let actual = actual.max(0.0);
    BarAmounts {
        used: actual.min(limit),
        remaining: (limit - actual).max(0.0),
        over_budget: (actual - limit).max(0.0),
        percent_used: if limit > 0.0 { actual / limit * 100.0 } else { 0.0 },
    }
}

pub struct LimitSpend {
    pub limit_id: Uuid,
    pub sport_id: Uuid,
    pub sport_name: String,
    pub period: Period,
    pub limit_amount: f64,
    pub actual: f64,
}

pub fn chart_bar(spend: LimitSpend, today: NaiveDate) -> ChartBar {
    let amounts = bar_amounts(spend.limit_amount, spend.actual);
    ChartBar {
        limit_id: spend.limit_id,
        sport_id: spend.sport_id,
        sport_name: spend.sport_name,
        period: spend.period,
        window_start: spend.period.window_start(today),
        limit_amount: spend.limit_amount,
        actual: spend.actual,
        used: amounts.used,
        remaining: amounts.remaining,
        over_budget: amounts.over_budget,
        percent_used: amounts.percent_used,
    }
}
