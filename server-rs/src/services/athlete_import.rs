//! Bulk athlete import from CSV. Rows are inserted one at a time and
//! failures are collected per row; nothing is rolled back.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{NewAthlete, Sport};

pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "gender", "year", "sport"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorCode {
    InvalidRow,
    MissingFields,
    SportNotFound,
    InsertFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based line number in the file, header included.
    pub row: usize,
    pub name: Option<String>,
    pub code: ImportErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total: usize,
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub row: usize,
    pub fields: Result<RawAthlete, String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawAthlete {
    pub name: String,
    pub gender: String,
    pub year: String,
    pub sport: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedRow {
    Insert { row: usize, athlete: NewAthlete },
    Rejected(RowError),
}

/// Parses the CSV text. The header row is required and must name every
/// column in `REQUIRED_COLUMNS` (any order, case-insensitive).
pub fn parse_csv(text: &str) -> Result<Vec<ImportRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("Could not read CSV header: {e}"))?
        .clone();
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase(), i))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !index.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(format!("CSV is missing columns: {}", missing.join(", ")));
    }

    let column = |record: &csv::StringRecord, name: &str| -> String {
        index
            .get(name)
            .and_then(|i| record.get(*i))
            .unwrap_or("")
            .to_string()
    };

    let rows = reader
        .records()
        .enumerate()
        .map(|(i, record)| ImportRow {
            row: i + 2,
            fields: record
                .map(|r| RawAthlete {
                    name: column(&r, "name"),
                    gender: column(&r, "gender"),
                    year: column(&r, "year"),
                    sport: column(&r, "sport"),
                })
                .map_err(|e| e.to_string()),
        })
        .collect();

    Ok(rows)
}

/// Lowercased sport name -> sport id.
pub fn sport_lookup(sports: &[Sport]) -> HashMap<String, Uuid> {
    sports
        .iter()
        .map(|s| (s.name.trim().to_lowercase(), s.id))
        .collect()
}

pub fn plan_rows(rows: Vec<ImportRow>, sports: &HashMap<String, Uuid>) -> Vec<PlannedRow> {
    rows.into_iter()
        .map(|ImportRow { row, fields }| {
            let raw = match fields {
                Ok(raw) => raw,
                Err(message) => {
                    return PlannedRow::Rejected(RowError {
                        row,
                        name: None,
                        code: ImportErrorCode::InvalidRow,
                        message,
                    })
                }
            };
            let name = (!raw.name.is_empty()).then(|| raw.name.clone());

            let missing: Vec<&str> = [
                ("name", &raw.name),
                ("gender", &raw.gender),
                ("year", &raw.year),
                ("sport", &raw.sport),
            ]
            .into_iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k)
            .collect();
            if !missing.is_empty() {
                return PlannedRow::Rejected(RowError {
                    row,
                    name,
                    code: ImportErrorCode::MissingFields,
                    message: format!("Missing required fields: {}", missing.join(", ")),
                });
            }

            match sports.get(&raw.sport.to_lowercase()) {
                Some(sport_id) => PlannedRow::Insert {
                    row,
                    athlete: NewAthlete {
                        name: raw.name,
                        gender: raw.gender,
                        year: raw.year,
                        sport_id: *sport_id,
                    },
                },
                None => PlannedRow::Rejected(RowError {
                    row,
                    name,
                    code: ImportErrorCode::SportNotFound,
                    message: format!("Sport '{}' not found", raw.sport),
                }),
            }
        })
        .collect()
}

/// Destination for imported athletes.
#[async_trait]
pub trait AthleteSink: Send + Sync {
    async fn insert_athlete(&self, organization_id: Uuid, athlete: &NewAthlete) -> Result<(), String>;
}

#[async_trait]
impl AthleteSink for sqlx::PgPool {
    async fn insert_athlete(&self, organization_id: Uuid, athlete: &NewAthlete) -> Result<(), String> {
        sqlx::query(
            "INSERT INTO athletes (id, name, gender, year, sport_id, organization_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(&athlete.name)
        .bind(&athlete.gender)
        .bind(&athlete.year)
        .bind(athlete.sport_id)
        .bind(organization_id)
        .execute(self)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
    }
}

pub async fn run_import<S: AthleteSink + ?Sized>(
    sink: &S,
    organization_id: Uuid,
    rows: Vec<ImportRow>,
    sports: &[Sport],
) -> ImportReport {
    let lookup = sport_lookup(sports);
    let mut report = ImportReport {
        total: rows.len(),
        ..Default::default()
    };

    for planned in plan_rows(rows, &lookup) {
        match planned {
            PlannedRow::Insert { row, athlete } => {
                match sink.insert_athlete(organization_id, &athlete).await {
                    Ok(()) => report.inserted += 1,
                    Err(message) => {
                        tracing::warn!(row, error = %message, "athlete import row failed");
                        report.errors.push(RowError {
                            row,
                            name: Some(athlete.name),
                            code: ImportErrorCode::InsertFailed,
                            message,
                        });
                    }
                }
            }
            PlannedRow::Rejected(err) => report.errors.push(err),
        }
    }

    report.failed = report.errors.len();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        inserted: Mutex<Vec<NewAthlete>>,
        fail_names: Vec<&'static str>,
    }

    #[async_trait]
    impl AthleteSink for RecordingSink {
        async fn insert_athlete(&self, _org: Uuid, athlete: &NewAthlete) -> Result<(), String> {
            if self.fail_names.contains(&athlete.name.as_str()) {
                return Err("duplicate key".to_string());
            }
            self.inserted.lock().unwrap().push(athlete.clone());
            Ok(())
        }
    }

    fn sport(name: &str) -> Sport {
        Sport {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    const CSV: &str = "Name,Gender,Year,Sport\n\
        Maya Cruz,Female,Junior,Soccer\n\
        Ben Ortiz,Male,Senior,Curling\n\
        ,Female,Freshman,Soccer\n\
        Ana Diaz,Female,Sophomore,basketball\n";

    #[tokio::test]
    async fn unknown_sport_is_reported_and_not_inserted() {
        let sink = RecordingSink::default();
        let rows = parse_csv(CSV).unwrap();
        let report = run_import(&sink, Uuid::new_v4(), rows, &[sport("Soccer"), sport("Basketball")]).await;

        assert_eq!(report.total, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total, report.inserted + report.failed);

        let not_found = report
            .errors
            .iter()
            .find(|e| e.code == ImportErrorCode::SportNotFound)
            .unwrap();
        assert_eq!(not_found.row, 3);
        assert_eq!(not_found.name.as_deref(), Some("Ben Ortiz"));

        let inserted = sink.inserted.lock().unwrap();
        assert!(inserted.iter().all(|a| a.name != "Ben Ortiz"));
    }

    #[tokio::test]
    async fn insert_failures_are_collected_without_aborting() {
        let sink = RecordingSink {
            fail_names: vec!["Maya Cruz"],
            ..Default::default()
        };
        let rows = parse_csv(CSV).unwrap();
        let report = run_import(&sink, Uuid::new_v4(), rows, &[sport("Soccer"), sport("Basketball")]).await;

        assert_eq!(report.total, 4);
        assert_eq!(report.inserted, 1);
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == ImportErrorCode::InsertFailed && e.row == 2));
    }

    #[test]
    fn missing_fields_are_named() {
        let rows = parse_csv(CSV).unwrap();
        let planned = plan_rows(rows, &sport_lookup(&[sport("Soccer")]));
        let missing = planned
            .iter()
            .find_map(|p| match p {
                PlannedRow::Rejected(e) if e.code == ImportErrorCode::MissingFields => Some(e),
                _ => None,
            })
            .unwrap();
        assert_eq!(missing.row, 4);
        assert!(missing.message.contains("name"));
    }

    #[test]
    fn header_row_must_name_required_columns() {
        let err = parse_csv("name,gender\nA,B\n").unwrap_err();
        assert!(err.contains("year"));
        assert!(err.contains("sport"));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        assert!(parse_csv("name,gender,year,sport\n").unwrap().is_empty());
    }
}
