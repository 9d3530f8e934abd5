use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::analytics::PaymentFact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn parse(s: Option<&str>) -> Option<Self> {
        match s.map(str::to_lowercase).as_deref() {
            None | Some("month") | Some("monthly") => Some(Granularity::Month),
            Some("quarter") | Some("quarterly") => Some(Granularity::Quarter),
            Some("year") | Some("yearly") => Some(Granularity::Year),
            _ => None,
        }
    }

    /// Sortable bucket label: `2024-03`, `2024-Q1`, `2024`.
    pub fn bucket(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Month => format!("{:04}-{:02}", date.year(), date.month()),
            Granularity::Quarter => format!("{:04}-Q{}", date.year(), date.month0() / 3 + 1),
            Granularity::Year => format!("{:04}", date.year()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub label: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub series: Vec<TrendPoint>,
    pub by_activity_type: Vec<Breakdown>,
    pub by_source: Vec<Breakdown>,
    pub total: f64,
    pub count: usize,
}

pub fn series(facts: &[PaymentFact], granularity: Granularity) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for f in facts {
        let e = buckets.entry(granularity.bucket(f.date)).or_default();
        e.0 += f.amount;
        e.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(period, (total, count))| TrendPoint { period, total, count })
        .collect()
}

/// Groups by a label, largest total first. Labels are merged case-insensitively.
pub fn breakdown<'a>(facts: &'a [PaymentFact], label: impl Fn(&'a PaymentFact) -> &'a str) -> Vec<Breakdown> {
    let mut groups: HashMap<String, Breakdown> = HashMap::new();
    for f in facts {
        let raw = label(f).trim();
        let raw = if raw.is_empty() { "Other" } else { raw };
        let entry = groups.entry(raw.to_lowercase()).or_insert_with(|| Breakdown {
            label: raw.to_string(),
            total: 0.0,
            count: 0,
        });
        entry.total += f.amount;
        entry.count += 1;
    }
    let mut out: Vec<Breakdown> = groups.into_values().collect();
    out.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    out
}

pub fn build_report(facts: &[PaymentFact], granularity: Granularity) -> TrendReport {
    TrendReport {
        series: series(facts, granularity),
        by_activity_type: breakdown(facts, |f| f.activity_type.as_deref().unwrap_or("")),
        by_source: breakdown(facts, |f| f.source.as_str()),
        total: facts.iter().map(|f| f.amount).sum(),
        count: facts.len(),
    }
}
