//! In-memory filtering and sorting for the athlete and payment tables.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AthleteListItem, PaymentListItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Column sort state as driven by clicking table headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: PartialEq> SortState<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Clicking the active column flips direction; a new column starts ascending.
    pub fn toggle(&mut self, field: F) {
        if self.field == field {
            self.direction = self.direction.flip();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AthleteSortField {
    Name,
    Gender,
    Year,
    Sport,
    CreatedAt,
}

impl AthleteSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "gender" => Some(Self::Gender),
            "year" => Some(Self::Year),
            "sport" | "sport_name" => Some(Self::Sport),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSortField {
    Date,
    Amount,
    Athlete,
    Source,
    ActivityType,
}

impl PaymentSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Self::Date),
            "amount" => Some(Self::Amount),
            "athlete" | "athlete_name" => Some(Self::Athlete),
            "source" => Some(Self::Source),
            "activity_type" => Some(Self::ActivityType),
            _ => None,
        }
    }
}

pub fn parse_direction(s: Option<&str>, default: SortDirection) -> SortDirection {
    match s.map(str::to_lowercase).as_deref() {
        Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        _ => default,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn cmp_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthleteFilter {
    pub search: Option<String>,
    pub gender: Option<String>,
    pub sport_id: Option<Uuid>,
    pub year: Option<String>,
}

impl AthleteFilter {
    pub fn matches(&self, a: &AthleteListItem) -> bool {
        if let Some(g) = self.gender.as_deref().filter(|g| !g.is_empty() && *g != "all") {
            if a.gender.to_lowercase() != g.to_lowercase() {
                return false;
            }
        }
        if let Some(q) = self.search.as_deref().filter(|q| !q.is_empty()) {
            if !contains_ci(&a.name, q) {
                return false;
            }
        }
        if let Some(sport) = self.sport_id {
            if a.sport_id != sport {
                return false;
            }
        }
        if let Some(y) = self.year.as_deref().filter(|y| !y.is_empty() && *y != "all") {
            if !eq_ci(&a.year, y) {
                return false;
            }
        }
        true
    }
}

pub fn sort_athletes(rows: &mut [AthleteListItem], sort: &SortState<AthleteSortField>) {
    rows.sort_by(|a, b| {
        let ord = match sort.field {
            AthleteSortField::Name => cmp_ci(&a.name, &b.name),
            AthleteSortField::Gender => cmp_ci(&a.gender, &b.gender),
            AthleteSortField::Year => cmp_ci(&a.year, &b.year),
            AthleteSortField::Sport => cmp_ci(
                a.sport_name.as_deref().unwrap_or(""),
                b.sport_name.as_deref().unwrap_or(""),
            ),
            AthleteSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        sort.direction.apply(ord)
    });
}

pub fn view_athletes(
    rows: Vec<AthleteListItem>,
    filter: &AthleteFilter,
    sort: &SortState<AthleteSortField>,
) -> Vec<AthleteListItem> {
    let mut rows: Vec<_> = rows.into_iter().filter(|a| filter.matches(a)).collect();
    sort_athletes(&mut rows, sort);
    rows
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub search: Option<String>,
    pub athlete_id: Option<Uuid>,
    pub source: Option<String>,
    pub activity_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl PaymentFilter {
    pub fn matches(&self, p: &PaymentListItem) -> bool {
        if self.athlete_id.is_some_and(|id| id != p.athlete_id) {
            return false;
        }
        if let Some(src) = self.source.as_deref().filter(|s| !s.is_empty()) {
            if !eq_ci(&p.source, src) {
                return false;
            }
        }
        if let Some(kind) = self.activity_type.as_deref().filter(|s| !s.is_empty()) {
            if !p.activity_type.as_deref().is_some_and(|t| eq_ci(t, kind)) {
                return false;
            }
        }
        if self.from.is_some_and(|from| p.date < from) || self.to.is_some_and(|to| p.date > to) {
            return false;
        }
        if self.min_amount.is_some_and(|min| p.amount < min)
            || self.max_amount.is_some_and(|max| p.amount > max)
        {
            return false;
        }
        if let Some(q) = self.search.as_deref().filter(|q| !q.is_empty()) {
            if !contains_ci(&p.athlete_name, q) && !contains_ci(&p.source, q) {
                return false;
            }
        }
        true
    }
}

pub fn sort_payments(rows: &mut [PaymentListItem], sort: &SortState<PaymentSortField>) {
    rows.sort_by(|a, b| {
        let ord = match sort.field {
            PaymentSortField::Date => a.date.cmp(&b.date),
            PaymentSortField::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
            PaymentSortField::Athlete => cmp_ci(&a.athlete_name, &b.athlete_name),
            PaymentSortField::Source => cmp_ci(&a.source, &b.source),
            PaymentSortField::ActivityType => cmp_ci(
                a.activity_type.as_deref().unwrap_or(""),
                b.activity_type.as_deref().unwrap_or(""),
            ),
        };
        sort.direction.apply(ord)
    });
}

pub fn view_payments(
    rows: Vec<PaymentListItem>,
    filter: &PaymentFilter,
    sort: &SortState<PaymentSortField>,
) -> Vec<PaymentListItem> {
    let mut rows: Vec<_> = rows.into_iter().filter(|p| filter.matches(p)).collect();
    sort_payments(&mut rows, sort);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn athlete(name: &str, gender: &str, year: &str) -> AthleteListItem {
        AthleteListItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            gender: gender.to_string(),
            year: year.to_string(),
            sport_id: Uuid::nil(),
            sport_name: Some("Soccer".to_string()),
            created_at: Utc::now(),
        }
    }

    fn payment(athlete: &str, amount: f64, day: u32, source: &str) -> PaymentListItem {
        PaymentListItem {
            id: Uuid::new_v4(),
            athlete_id: Uuid::nil(),
            athlete_name: athlete.to_string(),
            sport_name: None,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            source: source.to_string(),
            activity_type: Some("Social Media".to_string()),
            link: None,
            created_at: Utc::now(),
        }
    }

    fn roster() -> Vec<AthleteListItem> {
        vec![
            athlete("Maya Cruz", "Female", "Junior"),
            athlete("Ben Ortiz", "male", "Senior"),
            athlete("Ana Diaz", "FEMALE", "Freshman"),
            athlete("Chris Kim", "Non-binary", "Junior"),
        ]
    }

    #[test]
    fn gender_filter_is_case_insensitive_exact_match() {
        let filter = AthleteFilter {
            gender: Some("female".into()),
            ..Default::default()
        };
        let sort = SortState::new(AthleteSortField::Name, SortDirection::Asc);
        let rows = view_athletes(roster(), &filter, &sort);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|a| a.gender.to_lowercase() == "female"));
    }

    #[test]
    fn search_matches_name_substrings() {
        let filter = AthleteFilter {
            search: Some("DIAZ".into()),
            ..Default::default()
        };
        let sort = SortState::new(AthleteSortField::Name, SortDirection::Asc);
        let rows = view_athletes(roster(), &filter, &sort);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ana Diaz");
    }

    #[test]
    fn toggling_same_column_twice_reverses_order() {
        let mut sort = SortState::new(AthleteSortField::CreatedAt, SortDirection::Desc);
        sort.toggle(AthleteSortField::Name);
        let first = view_athletes(roster(), &AthleteFilter::default(), &sort);
        sort.toggle(AthleteSortField::Name);
        let second = view_athletes(roster(), &AthleteFilter::default(), &sort);

        let names = |rows: &[AthleteListItem]| rows.iter().map(|a| a.name.clone()).collect::<Vec<_>>();
        let mut reversed = names(&first);
        reversed.reverse();
        assert_eq!(names(&second), reversed);
        assert_eq!(names(&first)[0], "Ana Diaz");
    }

    #[test]
    fn switching_columns_starts_ascending() {
        let mut sort = SortState::new(PaymentSortField::Amount, SortDirection::Desc);
        sort.toggle(PaymentSortField::Date);
        assert_eq!(sort.field, PaymentSortField::Date);
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn payment_filters_combine() {
        let rows = vec![
            payment("Maya Cruz", 500.0, 1, "Nike"),
            payment("Ben Ortiz", 1500.0, 10, "Local Diner"),
            payment("Maya Cruz", 2500.0, 20, "nike"),
        ];
        let filter = PaymentFilter {
            source: Some("NIKE".into()),
            min_amount: Some(1000.0),
            ..Default::default()
        };
        let sort = SortState::new(PaymentSortField::Amount, SortDirection::Desc);
        let out = view_payments(rows, &filter, &sort);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, 2500.0);
    }

    #[test]
    fn payment_date_range_is_inclusive() {
        let rows = vec![
            payment("A", 10.0, 1, "X"),
            payment("B", 20.0, 10, "X"),
            payment("C", 30.0, 20, "X"),
        ];
        let filter = PaymentFilter {
            from: NaiveDate::from_ymd_opt(2024, 5, 10),
            to: NaiveDate::from_ymd_opt(2024, 5, 20),
            ..Default::default()
        };
        let sort = SortState::new(PaymentSortField::Date, SortDirection::Asc);
        let out = view_payments(rows, &filter, &sort);
        assert_eq!(
            out.iter().map(|p| p.athlete_name.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );
    }
}
