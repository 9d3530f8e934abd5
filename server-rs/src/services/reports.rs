//! Read-side queries behind the analytics and report endpoints. The three
//! distribution queries are Postgres functions defined in the migrations.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::analytics::*;
use crate::services::trends::{self, Granularity, TrendPoint};

pub const TOP_ATHLETES_LIMIT: i64 = 10;

pub async fn gender_payment_distribution(db: &PgPool, org_id: Uuid) -> AppResult<Vec<GenderPaymentRow>> {
    Ok(sqlx::query_as("SELECT gender, total_amount, payment_count FROM get_gender_payment_distribution($1)")
        .bind(org_id)
        .fetch_all(db)
        .await?)
}

pub async fn gender_athlete_distribution(db: &PgPool, org_id: Uuid) -> AppResult<Vec<GenderAthleteRow>> {
    Ok(sqlx::query_as("SELECT gender, athlete_count FROM get_gender_athlete_distribution($1)")
        .bind(org_id)
        .fetch_all(db)
        .await?)
}

pub async fn sport_payment_distribution(db: &PgPool, org_id: Uuid) -> AppResult<Vec<SportPaymentRow>> {
    Ok(sqlx::query_as(
        "SELECT sport_id, sport_name, total_amount, payment_count FROM get_sport_payment_distribution($1)",
    )
    .bind(org_id)
    .fetch_all(db)
    .await?)
}

/// Payment facts for the tenant, optionally bounded by date.
pub async fn payment_facts(
    db: &PgPool,
    org_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> AppResult<Vec<PaymentFact>> {
    Ok(sqlx::query_as(
        r#"SELECT p.amount, p.date, p.source, p.activity_type
        FROM payments p
        JOIN athletes a ON a.id = p.athlete_id
        WHERE a.organization_id = $1
          AND ($2::date IS NULL OR p.date >= $2)
          AND ($3::date IS NULL OR p.date <= $3)
        ORDER BY p.date"#,
    )
    .bind(org_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?)
}

pub async fn top_athletes(db: &PgPool, org_id: Uuid, limit: i64) -> AppResult<Vec<AthleteTotalRow>> {
    Ok(sqlx::query_as(
        r#"SELECT a.id AS athlete_id, a.name AS athlete_name, s.name AS sport_name,
            COALESCE(SUM(p.amount), 0)::float8 AS total_amount,
            COUNT(p.id) AS payment_count
        FROM athletes a
        JOIN payments p ON p.athlete_id = a.id
        LEFT JOIN sports s ON s.id = a.sport_id
        WHERE a.organization_id = $1
        GROUP BY a.id, a.name, s.name
        ORDER BY total_amount DESC, a.name
        LIMIT $2"#,
    )
    .bind(org_id)
    .bind(limit)
    .fetch_all(db)
    .await?)
}

pub async fn monthly_totals(db: &PgPool, org_id: Uuid) -> AppResult<Vec<TrendPoint>> {
    let facts = payment_facts(db, org_id, None, None).await?;
    Ok(trends::series(&facts, Granularity::Month))
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_paid: f64,
    pub payment_count: i64,
    pub sports: Vec<SportPaymentRow>,
    pub top_athletes: Vec<AthleteTotalRow>,
    pub monthly: Vec<TrendPoint>,
}

impl ReportSummary {
    pub fn new(
        sports: Vec<SportPaymentRow>,
        top_athletes: Vec<AthleteTotalRow>,
        monthly: Vec<TrendPoint>,
    ) -> Self {
        Self {
            total_paid: sports.iter().map(|s| s.total_amount).sum(),
            payment_count: sports.iter().map(|s| s.payment_count).sum(),
            sports,
            top_athletes,
            monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sport(name: &str, total: f64, count: i64) -> SportPaymentRow {
        SportPaymentRow {
            sport_id: Uuid::new_v4(),
            sport_name: name.into(),
            total_amount: total,
            payment_count: count,
        }
    }

    #[test]
    fn headline_totals_come_from_sport_rows() {
        let summary = ReportSummary::new(
            vec![sport("Basketball", 1200.0, 3), sport("Soccer", 300.5, 2)],
            vec![],
            vec![],
        );
        assert_eq!(summary.total_paid, 1500.5);
        assert_eq!(summary.payment_count, 5);
    }

    #[test]
    fn empty_report_is_zeroed() {
        let summary = ReportSummary::new(vec![], vec![], vec![]);
        assert_eq!(summary.total_paid, 0.0);
        assert_eq!(summary.payment_count, 0);
    }
}
