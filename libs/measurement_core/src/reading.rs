use chrono::{DateTime, Utc};
use serde_json::Number;

use crate::error::ValidationError;
use crate::timestamp::parse_timestamp;

/// A stored measurement sample. Never mutated once the store hands it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Store-assigned, increasing with insertion order.
    pub id: i64,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub active_energy: i64,
    pub active_power: i64,
}

/// A validated reading waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub active_energy: i64,
    pub active_power: i64,
}

impl NewReading {
    pub fn into_reading(self, id: i64) -> Reading {
        Reading {
            id,
            device_id: self.device_id,
            timestamp: self.timestamp,
            active_energy: self.active_energy,
            active_power: self.active_power,
        }
    }
}

/// One entry of an ingest batch as received, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateReading {
    pub device_id: String,
    pub timestamp: String,
    pub active_energy: Number,
    pub active_power: Number,
}

impl CreateReading {
    /// Validates the entry at position `index` of its batch.
    pub fn validate(self, index: usize) -> Result<NewReading, ValidationError> {
        if self.device_id.is_empty() {
            return Err(ValidationError::entry(
                index,
                "idDispositivo",
                "must be a non-empty string",
            ));
        }

        let timestamp = parse_timestamp(&self.timestamp).map_err(|e| {
            ValidationError::entry(index, "timestamp", e.to_string())
        })?;

        let active_energy = coerce_integer(&self.active_energy)
            .map_err(|m| ValidationError::entry(index, "activeEnergy", m))?;
        let active_power = coerce_integer(&self.active_power)
            .map_err(|m| ValidationError::entry(index, "activePower", m))?;

        Ok(NewReading {
            device_id: self.device_id,
            timestamp,
            active_energy,
            active_power,
        })
    }
}

// Readings are stored as integers; fractional inputs round half away from zero.
fn coerce_integer(value: &Number) -> Result<i64, String> {
    if let Some(integer) = value.as_i64() {
        return Ok(integer);
    }
    if value.is_u64() {
        return Err(format!("{value} does not fit a 64-bit signed integer"));
    }

    match value.as_f64() {
        Some(float) if float.is_finite() => {
            let rounded = float.round();
            if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                Err(format!("{value} does not fit a 64-bit signed integer"))
            } else {
                Ok(rounded as i64)
            }
        }
        _ => Err(format!("{value} is not a finite number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn entry(device_id: &str, timestamp: &str, energy: Number) -> CreateReading {
        CreateReading {
            device_id: device_id.to_string(),
            timestamp: timestamp.to_string(),
            active_energy: energy,
            active_power: Number::from(7),
        }
    }

    #[test]
    fn test_validate_normalizes_timestamp_to_utc() {
        let reading = entry("meter-1", "2024-01-01 03:00:00+03", 10.into())
            .validate(0)
            .unwrap();

        assert_eq!(
            reading,
            NewReading {
                device_id: "meter-1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                active_energy: 10,
                active_power: 7,
            }
        );
    }

    #[test]
    fn test_validate_rejects_empty_device_id() {
        let err = entry("", "2024-01-01T00:00:00Z", 1.into())
            .validate(4)
            .unwrap_err();

        assert_eq!(err.index, Some(4));
        assert_eq!(err.field, "idDispositivo");
    }

    #[test]
    fn test_validate_rejects_unparsable_timestamp() {
        let err = entry("meter-1", "last tuesday", 1.into())
            .validate(1)
            .unwrap_err();

        assert_eq!(err.path(), "[1].timestamp");
    }

    #[test]
    fn test_fractional_values_round_half_away_from_zero() {
        let up = Number::from_f64(2.5).unwrap();
        let down = Number::from_f64(-2.5).unwrap();

        assert_eq!(coerce_integer(&up), Ok(3));
        assert_eq!(coerce_integer(&down), Ok(-3));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let huge = Number::from(u64::MAX);
        let err = entry("meter-1", "2024-01-01", huge).validate(2).unwrap_err();

        assert_eq!(err.path(), "[2].activeEnergy");

        let float = Number::from_f64(1e30).unwrap();
        assert!(coerce_integer(&float).is_err());
    }

    #[test]
    fn test_into_reading_keeps_fields() {
        let new = entry("meter-1", "2024-01-01", 5.into()).validate(0).unwrap();
        let reading = new.clone().into_reading(42);

        assert_eq!(reading.id, 42);
        assert_eq!(reading.device_id, new.device_id);
        assert_eq!(reading.timestamp, new.timestamp);
    }
}
