//! Generic bulk upload: CSV or JSON array-of-objects, flat required-field
//! validation per record, chunked inserts.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{NewAthlete, NewPayment};

pub type Record = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Json,
}

impl UploadFormat {
    /// Explicit `format` wins, then the content type, then a sniff of the body.
    pub fn detect(format: Option<&str>, content_type: Option<&str>, body: &str) -> Self {
        match format.map(str::to_lowercase).as_deref() {
            Some("csv") => return UploadFormat::Csv,
            Some("json") => return UploadFormat::Json,
            _ => {}
        }
        if let Some(ct) = content_type {
            if ct.contains("csv") || ct.starts_with("text/plain") {
                return UploadFormat::Csv;
            }
            if ct.contains("json") {
                return UploadFormat::Json;
            }
        }
        if body.trim_start().starts_with('[') {
            UploadFormat::Json
        } else {
            UploadFormat::Csv
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Payments,
    Athletes,
}

impl UploadKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payments" => Some(UploadKind::Payments),
            "athletes" => Some(UploadKind::Athletes),
            _ => None,
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Payments => &["athlete_id", "amount", "date", "source"],
            UploadKind::Athletes => &["name", "gender", "year", "sport_id"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    /// 1-based position of the record in the upload.
    pub record: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub total: usize,
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<RecordError>,
}

impl UploadReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn reject(&mut self, record: usize, message: impl Into<String>) {
        self.errors.push(RecordError {
            record,
            message: message.into(),
        });
        self.failed = self.errors.len();
    }
}

fn json_scalar(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn parse_records(body: &str, format: UploadFormat) -> Result<Vec<Record>, String> {
    match format {
        UploadFormat::Json => {
            let value: Value =
                serde_json::from_str(body).map_err(|e| format!("Invalid JSON: {e}"))?;
            let items = value
                .as_array()
                .ok_or_else(|| "JSON upload must be an array of objects".to_string())?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let obj = item
                        .as_object()
                        .ok_or_else(|| format!("Record {} is not an object", i + 1))?;
                    Ok(obj
                        .iter()
                        .filter_map(|(k, v)| json_scalar(v).map(|s| (k.to_lowercase(), s.trim().to_string())))
                        .collect())
                })
                .collect()
        }
        UploadFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(body.as_bytes());
            let headers: Vec<String> = reader
                .headers()
                .map_err(|e| format!("Could not read CSV header: {e}"))?
                .iter()
                .map(|h| h.to_lowercase())
                .collect();
            if headers.iter().all(|h| h.is_empty()) {
                return Err("CSV header row is required".to_string());
            }
            reader
                .records()
                .map(|r| {
                    let r = r.map_err(|e| format!("Malformed CSV: {e}"))?;
                    Ok(headers
                        .iter()
                        .cloned()
                        .zip(r.iter().map(String::from))
                        .collect())
                })
                .collect()
        }
    }
}

/// Names of required fields that are absent or blank.
pub fn missing_fields<'a>(record: &Record, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|f| record.get(*f).map_or(true, |v| v.trim().is_empty()))
        .collect()
}

fn field<'r>(record: &'r Record, key: &str) -> &'r str {
    record.get(key).map(String::as_str).unwrap_or("").trim()
}

fn optional(record: &Record, key: &str) -> Option<String> {
    Some(field(record, key)).filter(|v| !v.is_empty()).map(String::from)
}

pub fn parse_amount(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let amount: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| format!("Invalid amount '{raw}'"))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err("Amount must be greater than zero".to_string());
    }
    Ok(amount)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| format!("Invalid date '{raw}', expected YYYY-MM-DD"))
}

/// Validates a payment record; `athletes` is the tenant's athlete id set.
pub fn validate_payment(record: &Record, athletes: &HashSet<Uuid>) -> Result<NewPayment, String> {
    let missing = missing_fields(record, UploadKind::Payments.required_fields());
    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }
    let athlete_id = Uuid::parse_str(field(record, "athlete_id"))
        .map_err(|_| "Invalid athlete_id".to_string())?;
    if !athletes.contains(&athlete_id) {
        return Err(format!("Athlete {athlete_id} not found"));
    }
    Ok(NewPayment {
        athlete_id,
        amount: parse_amount(field(record, "amount"))?,
        date: parse_date(field(record, "date"))?,
        source: field(record, "source").to_string(),
        activity_type: optional(record, "activity_type"),
        link: optional(record, "link"),
    })
}

pub fn validate_athlete(record: &Record, sports: &HashSet<Uuid>) -> Result<NewAthlete, String> {
    let missing = missing_fields(record, UploadKind::Athletes.required_fields());
    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }
    let sport_id =
        Uuid::parse_str(field(record, "sport_id")).map_err(|_| "Invalid sport_id".to_string())?;
    if !sports.contains(&sport_id) {
        return Err(format!("Sport {sport_id} not found"));
    }
    Ok(NewAthlete {
        name: field(record, "name").to_string(),
        gender: field(record, "gender").to_string(),
        year: field(record, "year").to_string(),
        sport_id,
    })
}

/// Splits validated rows into insert batches of at most `size` rows.
pub fn chunk<T>(items: Vec<(usize, T)>, size: usize) -> Vec<Vec<(usize, T)>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Destination for validated rows, written one chunk per statement.
/// Rows carry their 1-based record number.
#[async_trait]
pub trait ChunkSink<T: Send + Sync>: Send + Sync {
    async fn insert_chunk(&self, rows: &[(usize, T)]) -> Result<u64, String>;
}

pub struct PaymentRows<'a> {
    pub db: &'a PgPool,
}

#[async_trait]
impl ChunkSink<NewPayment> for PaymentRows<'_> {
    async fn insert_chunk(&self, rows: &[(usize, NewPayment)]) -> Result<u64, String> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO payments (id, athlete_id, amount, date, source, activity_type, link, created_at) ",
        );
        qb.push_values(rows, |mut b, (_, p)| {
            b.push_bind(Uuid::new_v4())
                .push_bind(p.athlete_id)
                .push_bind(p.amount)
                .push_bind(p.date)
                .push_bind(p.source.clone())
                .push_bind(p.activity_type.clone())
                .push_bind(p.link.clone())
                .push("NOW()");
        });
        qb.build()
            .execute(self.db)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.to_string())
    }
}

pub struct AthleteRows<'a> {
    pub db: &'a PgPool,
    pub organization_id: Uuid,
}

#[async_trait]
impl ChunkSink<NewAthlete> for AthleteRows<'_> {
    async fn insert_chunk(&self, rows: &[(usize, NewAthlete)]) -> Result<u64, String> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO athletes (id, name, gender, year, sport_id, organization_id, created_at) ",
        );
        qb.push_values(rows, |mut b, (_, a)| {
            b.push_bind(Uuid::new_v4())
                .push_bind(a.name.clone())
                .push_bind(a.gender.clone())
                .push_bind(a.year.clone())
                .push_bind(a.sport_id)
                .push_bind(self.organization_id)
                .push("NOW()");
        });
        qb.build()
            .execute(self.db)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.to_string())
    }
}

/// Inserts `valid` in chunks of `chunk_size`. A failed chunk marks each of its
/// records failed and later chunks still run.
pub async fn insert_chunked<T, S>(
    sink: &S,
    valid: Vec<(usize, T)>,
    chunk_size: usize,
    report: &mut UploadReport,
) where
    T: Send + Sync,
    S: ChunkSink<T> + ?Sized,
{
    for batch in chunk(valid, chunk_size) {
        match sink.insert_chunk(&batch).await {
            Ok(n) => report.inserted += n as usize,
            Err(e) => {
                tracing::warn!(error = %e, records = batch.len(), "upload chunk insert failed");
                for (record, _) in &batch {
                    report.reject(*record, format!("Insert failed: {e}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails any chunk containing one of `fail_records`.
    struct FlakySink {
        fail_records: Vec<usize>,
        written: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChunkSink<u8> for FlakySink {
        async fn insert_chunk(&self, rows: &[(usize, u8)]) -> Result<u64, String> {
            if rows.iter().any(|(r, _)| self.fail_records.contains(r)) {
                return Err("value violates check constraint".to_string());
            }
            self.written.lock().unwrap().extend(rows.iter().map(|(r, _)| *r));
            Ok(rows.len() as u64)
        }
    }

    #[tokio::test]
    async fn failed_chunk_rejects_its_records_and_later_chunks_continue() {
        let sink = FlakySink {
            fail_records: vec![3],
            written: Mutex::new(Vec::new()),
        };
        let mut report = UploadReport::new(6);
        report.reject(6, "Missing required fields: source");
        let valid: Vec<(usize, u8)> = (1..=5).map(|r| (r, 0u8)).collect();

        insert_chunked(&sink, valid, 2, &mut report).await;
        report.errors.sort_by_key(|e| e.record);

        assert_eq!(*sink.written.lock().unwrap(), vec![1, 2, 5]);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(report.inserted + report.failed, report.total);
        let failed: Vec<usize> = report.errors.iter().map(|e| e.record).collect();
        assert_eq!(failed, vec![3, 4, 6]);
        assert!(report.errors[0].message.starts_with("Insert failed"));
    }

    #[test]
    fn detects_format_from_hints() {
        assert_eq!(UploadFormat::detect(Some("CSV"), Some("application/json"), "[]"), UploadFormat::Csv);
        assert_eq!(UploadFormat::detect(None, Some("text/csv"), "[]"), UploadFormat::Csv);
        assert_eq!(UploadFormat::detect(None, Some("application/json"), "a,b"), UploadFormat::Json);
        assert_eq!(UploadFormat::detect(None, None, "  [{}]"), UploadFormat::Json);
        assert_eq!(UploadFormat::detect(None, None, "a,b\n1,2"), UploadFormat::Csv);
    }

    #[test]
    fn csv_and_json_yield_the_same_records() {
        let csv = "Athlete_ID,Amount,Date,Source\nabc,100,2024-01-02,Nike\n";
        let json = r#"[{"athlete_id": "abc", "amount": 100, "date": "2024-01-02", "source": "Nike"}]"#;
        let a = parse_records(csv, UploadFormat::Csv).unwrap();
        let b = parse_records(json, UploadFormat::Json).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn json_must_be_array_of_objects() {
        assert!(parse_records(r#"{"a": 1}"#, UploadFormat::Json).is_err());
        assert!(parse_records("[1, 2]", UploadFormat::Json).is_err());
    }

    #[test]
    fn required_fields_are_checked_per_record() {
        let record: Record = [("athlete_id", "x"), ("amount", " "), ("source", "Nike")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            missing_fields(&record, UploadKind::Payments.required_fields()),
            vec!["amount", "date"]
        );
    }

    #[test]
    fn payment_validation_checks_tenant_athletes() {
        let id = Uuid::new_v4();
        let mut record: Record = [
            ("athlete_id", id.to_string()),
            ("amount", "$1,250.50".to_string()),
            ("date", "03/15/2024".to_string()),
            ("source", "Local Dealership".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let known: HashSet<Uuid> = [id].into_iter().collect();
        let payment = validate_payment(&record, &known).unwrap();
        assert_eq!(payment.amount, 1250.5);
        assert_eq!(payment.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(payment.activity_type, None);

        assert!(validate_payment(&record, &HashSet::new()).is_err());
        record.insert("amount".into(), "-3".into());
        assert!(validate_payment(&record, &known).is_err());
    }

    #[test]
    fn chunks_never_exceed_size() {
        let items: Vec<(usize, u8)> = (0..250).map(|i| (i, 0u8)).collect();
        let chunks = chunk(items, 100);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![100, 100, 50]);
        assert!(chunk(Vec::<(usize, u8)>::new(), 100).is_empty());
    }
}
