//! Gender-equity (Title IX style) comparison of payment share against
//! athlete-population share.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::analytics::{GenderAthleteRow, GenderPaymentRow};

pub const BALANCED_THRESHOLD: f64 = 90.0;
pub const CAUTION_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EquityStatus {
    Balanced,
    Caution,
    Risk,
}

impl EquityStatus {
    pub fn classify(score: f64) -> Self {
        if score >= BALANCED_THRESHOLD {
            EquityStatus::Balanced
        } else if score >= CAUTION_THRESHOLD {
            EquityStatus::Caution
        } else {
            EquityStatus::Risk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderShare {
    pub gender: String,
    pub payment_total: f64,
    pub payment_count: i64,
    pub payment_pct: f64,
    pub athlete_count: i64,
    pub athlete_pct: f64,
    /// payment_pct minus athlete_pct; positive means over-paid relative to headcount.
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquityReport {
    pub score: f64,
    pub status: EquityStatus,
    pub total_paid: f64,
    pub total_athletes: i64,
    pub genders: Vec<GenderShare>,
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Builds per-gender shares over the case-insensitive union of both inputs.
pub fn gender_shares(payments: &[GenderPaymentRow], athletes: &[GenderAthleteRow]) -> Vec<GenderShare> {
    // gender key -> (display label, paid, payment count, athletes)
    let mut acc: BTreeMap<String, (String, f64, i64, i64)> = BTreeMap::new();

    for row in payments {
        let label = row.gender.trim();
        let entry = acc
            .entry(label.to_lowercase())
            .or_insert_with(|| (label.to_string(), 0.0, 0, 0));
        entry.1 += row.total_amount;
        entry.2 += row.payment_count;
    }
    for row in athletes {
        let label = row.gender.trim();
        let entry = acc
            .entry(label.to_lowercase())
            .or_insert_with(|| (label.to_string(), 0.0, 0, 0));
        entry.3 += row.athlete_count;
    }

    let total_paid: f64 = acc.values().map(|v| v.1).sum();
    let total_athletes: i64 = acc.values().map(|v| v.3).sum();

    acc.into_values()
        .map(|(gender, paid, count, athletes)| {
            let payment_pct = percent(paid, total_paid);
            let athlete_pct = percent(athletes as f64, total_athletes as f64);
            GenderShare {
                gender,
                payment_total: paid,
                payment_count: count,
                payment_pct,
                athlete_count: athletes,
                athlete_pct,
                gap: payment_pct - athlete_pct,
            }
        })
        .collect()
}

/// `100 × (1 − Σ|payment% − athlete%| / (100 × N))`, clamped to 0..=100.
/// An empty comparison has nothing out of balance and scores 100.
pub fn equity_score(shares: &[GenderShare]) -> f64 {
    if shares.is_empty() {
        return 100.0;
    }
    let n = shares.len() as f64;
    let total_gap: f64 = shares.iter().map(|s| s.gap.abs()).sum();
    let score = 100.0 * (1.0 - total_gap / (100.0 * n));
    round1(score.clamp(0.0, 100.0))
}

pub fn build_report(payments: &[GenderPaymentRow], athletes: &[GenderAthleteRow]) -> EquityReport {
    let genders = gender_shares(payments, athletes);
    let score = equity_score(&genders);
    EquityReport {
        score,
        status: EquityStatus::classify(score),
        total_paid: genders.iter().map(|g| g.payment_total).sum(),
        total_athletes: genders.iter().map(|g| g.athlete_count).sum(),
        genders,
    }
}
