//! Wire envelope and the pure mapper between domain records and the
//! loosely-typed key/value payloads the transport carries.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

use crate::domains::craving::types::{
    CravingRecord, INTENSITY_MAX, INTENSITY_MIN, RESISTANCE_MAX, RESISTANCE_MIN,
};
use crate::errors::{SyncError, SyncResult};

/// What the transport actually moves: a flat string-keyed map of primitives.
pub type SyncPayload = serde_json::Map<String, Value>;

/// Message kinds carried over the device link. Adding a kind is a new variant
/// here plus a tag below; the compiler finds every site that must handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    LogCraving,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::LogCraving => "logCraving",
        }
    }
}

impl FromStr for SyncAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logCraving" => Ok(SyncAction::LogCraving),
            other => Err(SyncError::UnknownAction(other.to_string())),
        }
    }
}

/// A typed view of one wire message. Fields are already flattened to
/// transport-safe shapes: string identity, integers, epoch-seconds float.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEnvelope {
    LogCraving {
        id: String,
        description: String,
        intensity: i64,
        resistance: Option<i64>,
        /// Epoch seconds, millisecond precision.
        timestamp: f64,
    },
}

impl SyncEnvelope {
    pub fn action(&self) -> SyncAction {
        match self {
            SyncEnvelope::LogCraving { .. } => SyncAction::LogCraving,
        }
    }

    /// Pure mapper: domain record to wire envelope.
    pub fn from_record(record: &CravingRecord) -> Self {
        SyncEnvelope::LogCraving {
            id: record.id.to_string(),
            description: record.description.clone(),
            intensity: record.intensity,
            resistance: record.resistance,
            timestamp: record.created_at.timestamp_millis() as f64 / 1000.0,
        }
    }

    /// Pure mapper: wire envelope back to domain record. Re-validates bounds;
    /// malformed input rejection is the only error path.
    pub fn into_record(self) -> SyncResult<CravingRecord> {
        match self {
            SyncEnvelope::LogCraving {
                id,
                description,
                intensity,
                resistance,
                timestamp,
            } => {
                let id = Uuid::from_str(&id)
                    .map_err(|_| SyncError::MalformedEnvelope(format!("invalid id: {}", id)))?;
                if !(INTENSITY_MIN..=INTENSITY_MAX).contains(&intensity) {
                    return Err(SyncError::MalformedEnvelope(format!(
                        "intensity out of range: {}",
                        intensity
                    )));
                }
                if let Some(r) = resistance {
                    if !(RESISTANCE_MIN..=RESISTANCE_MAX).contains(&r) {
                        return Err(SyncError::MalformedEnvelope(format!(
                            "resistance out of range: {}",
                            r
                        )));
                    }
                }
                let created_at = epoch_seconds_to_datetime(timestamp)?;
                Ok(CravingRecord {
                    id,
                    description,
                    intensity,
                    resistance,
                    created_at,
                    deleted_at: None,
                })
            }
        }
    }

    /// Flatten to the key/value payload shape. Optional fields are encoded as
    /// an explicit null, never an omitted key: the transport does not reliably
    /// distinguish "missing" from "present but null" across implementations.
    pub fn to_payload(&self) -> SyncPayload {
        let mut payload = SyncPayload::new();
        payload.insert("action".to_string(), Value::from(self.action().as_str()));
        match self {
            SyncEnvelope::LogCraving {
                id,
                description,
                intensity,
                resistance,
                timestamp,
            } => {
                payload.insert("id".to_string(), Value::from(id.as_str()));
                payload.insert(
                    "description".to_string(),
                    Value::from(description.as_str()),
                );
                payload.insert("intensity".to_string(), Value::from(*intensity));
                payload.insert(
                    "resistance".to_string(),
                    match resistance {
                        Some(r) => Value::from(*r),
                        None => Value::Null,
                    },
                );
                payload.insert("timestamp".to_string(), Value::from(*timestamp));
            }
        }
        payload
    }

    /// Parse a payload back into a typed envelope.
    pub fn from_payload(payload: &SyncPayload) -> SyncResult<Self> {
        let action = require_str(payload, "action")?.parse::<SyncAction>()?;
        match action {
            SyncAction::LogCraving => Ok(SyncEnvelope::LogCraving {
                id: require_str(payload, "id")?.to_string(),
                description: require_str(payload, "description")?.to_string(),
                intensity: require_i64(payload, "intensity")?,
                resistance: optional_i64(payload, "resistance")?,
                timestamp: require_f64(payload, "timestamp")?,
            }),
        }
    }
}

fn epoch_seconds_to_datetime(seconds: f64) -> SyncResult<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(SyncError::MalformedEnvelope(format!(
            "non-finite timestamp: {}",
            seconds
        )));
    }
    DateTime::<Utc>::from_timestamp_millis((seconds * 1000.0).round() as i64)
        .ok_or_else(|| SyncError::MalformedEnvelope(format!("timestamp out of range: {}", seconds)))
}

fn require_field<'a>(payload: &'a SyncPayload, key: &str) -> SyncResult<&'a Value> {
    payload
        .get(key)
        .ok_or_else(|| SyncError::MalformedEnvelope(format!("missing field: {}", key)))
}

fn require_str<'a>(payload: &'a SyncPayload, key: &str) -> SyncResult<&'a str> {
    require_field(payload, key)?
        .as_str()
        .ok_or_else(|| SyncError::MalformedEnvelope(format!("field {} is not a string", key)))
}

fn require_i64(payload: &SyncPayload, key: &str) -> SyncResult<i64> {
    require_field(payload, key)?
        .as_i64()
        .ok_or_else(|| SyncError::MalformedEnvelope(format!("field {} is not an integer", key)))
}

fn require_f64(payload: &SyncPayload, key: &str) -> SyncResult<f64> {
    require_field(payload, key)?
        .as_f64()
        .ok_or_else(|| SyncError::MalformedEnvelope(format!("field {} is not a number", key)))
}

/// The key must be present; a null value is the explicit "absent" sentinel.
fn optional_i64(payload: &SyncPayload, key: &str) -> SyncResult<Option<i64>> {
    match require_field(payload, key)? {
        Value::Null => Ok(None),
        value => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| SyncError::MalformedEnvelope(format!("field {} is not an integer", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms_precise_record(resistance: Option<i64>) -> CravingRecord {
        CravingRecord {
            id: Uuid::new_v4(),
            description: "Chocolate after dinner".to_string(),
            intensity: 7,
            resistance,
            // Millisecond precision: the wire format carries no finer grain.
            created_at: DateTime::<Utc>::from_timestamp_millis(1_767_000_123_456).unwrap(),
            deleted_at: None,
        }
    }

    #[test]
    fn record_round_trips_through_envelope_and_payload() {
        for resistance in [Some(3), None] {
            let record = ms_precise_record(resistance);
            let payload = SyncEnvelope::from_record(&record).to_payload();
            let decoded = SyncEnvelope::from_payload(&payload)
                .unwrap()
                .into_record()
                .unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn payload_carries_action_tag_and_null_sentinel() {
        let payload = SyncEnvelope::from_record(&ms_precise_record(None)).to_payload();
        assert_eq!(payload.get("action"), Some(&Value::from("logCraving")));
        // The key is present even when the value is absent.
        assert_eq!(payload.get("resistance"), Some(&Value::Null));
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut payload = SyncEnvelope::from_record(&ms_precise_record(Some(3))).to_payload();
        payload.remove("intensity");
        assert!(matches!(
            SyncEnvelope::from_payload(&payload),
            Err(SyncError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut payload = SyncEnvelope::from_record(&ms_precise_record(Some(3))).to_payload();
        payload.insert("action".to_string(), Value::from("selfDestruct"));
        assert!(matches!(
            SyncEnvelope::from_payload(&payload),
            Err(SyncError::UnknownAction(_))
        ));
    }

    #[test]
    fn out_of_range_intensity_is_rejected_on_decode() {
        let envelope = SyncEnvelope::LogCraving {
            id: Uuid::new_v4().to_string(),
            description: "too strong".to_string(),
            intensity: 11,
            resistance: None,
            timestamp: 1_767_000_123.456,
        };
        assert!(matches!(
            envelope.into_record(),
            Err(SyncError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn bad_identity_is_rejected_on_decode() {
        let envelope = SyncEnvelope::LogCraving {
            id: "not-a-uuid".to_string(),
            description: "fine otherwise".to_string(),
            intensity: 5,
            resistance: Some(1),
            timestamp: 1_767_000_123.456,
        };
        assert!(matches!(
            envelope.into_record(),
            Err(SyncError::MalformedEnvelope(_))
        ));
    }
}
