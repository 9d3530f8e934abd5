use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Athlete {
    pub id: Uuid,
    pub name: String,
    pub gender: String,
    pub year: String,
    pub sport_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Athlete row joined with its sport name, as listed in the dashboard table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AthleteListItem {
    pub id: Uuid,
    pub name: String,
    pub gender: String,
    pub year: String,
    pub sport_id: Uuid,
    pub sport_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AthleteRequest {
    pub name: String,
    pub gender: String,
    pub year: String,
    pub sport_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAthlete {
    pub name: String,
    pub gender: String,
    pub year: String,
    pub sport_id: Uuid,
}

impl AthleteRequest {
    pub fn validate(&self) -> Result<NewAthlete, String> {
        let name = self.name.trim();
        let gender = self.gender.trim();
        let year = self.year.trim();
        if name.is_empty() || gender.is_empty() || year.is_empty() {
            return Err("Name, gender and year are required".to_string());
        }
        Ok(NewAthlete {
            name: name.to_string(),
            gender: gender.to_string(),
            year: year.to_string(),
            sport_id: self.sport_id,
        })
    }
}
