use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};

/// Inclusive bounds shared by creation-time validation and wire decoding.
pub const INTENSITY_MIN: i64 = 1;
pub const INTENSITY_MAX: i64 = 10;
pub const RESISTANCE_MIN: i64 = 0;
pub const RESISTANCE_MAX: i64 = 10;
pub const DESCRIPTION_MIN_LEN: usize = 3;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Craving entity - a single craving captured on the satellite device.
///
/// The id is minted client-side at creation so it stays stable across retries
/// and serves as the idempotency key on the primary device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CravingRecord {
    pub id: Uuid,
    pub description: String,
    pub intensity: i64,
    pub resistance: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CravingRecord {
    /// Helper to check if the record is tombstoned
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// NewCraving DTO - used when capturing a new craving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCraving {
    pub description: String,
    pub intensity: i64,
    pub resistance: Option<i64>,
}

impl NewCraving {
    /// Stamp identity and creation time, producing the domain entity.
    /// Assumes `validate()` has already passed.
    pub fn into_record(self) -> CravingRecord {
        CravingRecord {
            id: Uuid::new_v4(),
            description: self.description.trim().to_string(),
            intensity: self.intensity,
            resistance: self.resistance,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

impl Validate for NewCraving {
    fn validate(&self) -> DomainResult<()> {
        let trimmed = self.description.trim().to_string();
        ValidationBuilder::new("description", Some(trimmed))
            .required()
            .min_length(DESCRIPTION_MIN_LEN)
            .max_length(DESCRIPTION_MAX_LEN)
            .validate()?;

        ValidationBuilder::new("intensity", Some(self.intensity))
            .range(INTENSITY_MIN, INTENSITY_MAX)
            .validate()?;

        if let Some(resistance) = self.resistance {
            ValidationBuilder::new("resistance", Some(resistance))
                .range(RESISTANCE_MIN, RESISTANCE_MAX)
                .validate()?;
        }

        Ok(())
    }
}

/// CravingRow - SQLite row representation for mapping from the database
#[derive(Debug, Clone, FromRow)]
pub struct CravingRow {
    pub id: String,
    pub description: String,
    pub intensity: i64,
    pub resistance: Option<i64>,
    pub created_at: String,
    pub deleted_at: Option<String>,
}

impl CravingRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<CravingRecord> {
        let parse_uuid = |s: String, field_name: &str| {
            Uuid::from_str(&s).map_err(|_| {
                DomainError::Validation(ValidationError::format(
                    field_name,
                    &format!("Invalid UUID format: {}", s),
                ))
            })
        };
        let parse_datetime = |s: String, field_name: &str| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    DomainError::Validation(ValidationError::format(
                        field_name,
                        &format!("Invalid RFC3339 format: {}", s),
                    ))
                })
        };

        let deleted_at = match self.deleted_at {
            Some(s) => Some(parse_datetime(s, "deleted_at")?),
            None => None,
        };

        Ok(CravingRecord {
            id: parse_uuid(self.id, "id")?,
            description: self.description,
            intensity: self.intensity,
            resistance: self.resistance,
            created_at: parse_datetime(self.created_at, "created_at")?,
            deleted_at,
        })
    }
}

/// CravingResponse DTO - used for presentation-facing reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CravingResponse {
    pub id: Uuid,
    pub description: String,
    pub intensity: i64,
    pub resistance: Option<i64>,
    pub created_at: String,
}

impl From<CravingRecord> for CravingResponse {
    fn from(record: CravingRecord) -> Self {
        Self {
            id: record.id,
            description: record.description,
            intensity: record.intensity,
            resistance: record.resistance,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_craving(description: &str, intensity: i64, resistance: Option<i64>) -> NewCraving {
        NewCraving {
            description: description.to_string(),
            intensity,
            resistance,
        }
    }

    #[test]
    fn accepts_in_bounds_craving() {
        assert!(new_craving("Chocolate after dinner", 7, Some(3))
            .validate()
            .is_ok());
        assert!(new_craving("Coffee", 1, None).validate().is_ok());
        assert!(new_craving("Coffee", 10, Some(0)).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_intensity() {
        assert!(new_craving("Chocolate", 0, None).validate().is_err());
        assert!(new_craving("Chocolate", 11, None).validate().is_err());
    }

    #[test]
    fn rejects_out_of_bounds_resistance() {
        assert!(new_craving("Chocolate", 5, Some(-1)).validate().is_err());
        assert!(new_craving("Chocolate", 5, Some(11)).validate().is_err());
    }

    #[test]
    fn rejects_empty_or_short_description() {
        assert!(new_craving("", 5, None).validate().is_err());
        assert!(new_craving("  ", 5, None).validate().is_err());
        assert!(new_craving("ab", 5, None).validate().is_err());
    }

    #[test]
    fn into_record_stamps_identity_once() {
        let record = new_craving("Chocolate after dinner", 7, Some(3)).into_record();
        assert!(!record.is_deleted());
        assert_eq!(record.description, "Chocolate after dinner");

        let other = new_craving("Chocolate after dinner", 7, Some(3)).into_record();
        assert_ne!(record.id, other.id);
    }

    #[test]
    fn row_round_trips_to_entity() {
        let id = Uuid::new_v4();
        let row = CravingRow {
            id: id.to_string(),
            description: "Salty snacks".to_string(),
            intensity: 4,
            resistance: None,
            created_at: "2026-08-30T10:15:00+00:00".to_string(),
            deleted_at: None,
        };
        let entity = row.into_entity().unwrap();
        assert_eq!(entity.id, id);
        assert_eq!(entity.resistance, None);
        assert!(!entity.is_deleted());
    }

    #[test]
    fn row_with_bad_uuid_is_rejected() {
        let row = CravingRow {
            id: "not-a-uuid".to_string(),
            description: "Salty snacks".to_string(),
            intensity: 4,
            resistance: None,
            created_at: "2026-08-30T10:15:00+00:00".to_string(),
            deleted_at: None,
        };
        assert!(row.into_entity().is_err());
    }
}
