use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use measurement_core::{NewReading, Reading};

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::measurements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Measurement {
    pub id: i64,
    pub device_id: String,
    pub measured_at: DateTime<Utc>,
    pub active_energy: i64,
    pub active_power: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::measurements)]
pub struct NewMeasurement {
    pub device_id: String,
    pub measured_at: DateTime<Utc>,
    pub active_energy: i64,
    pub active_power: i64,
}

impl From<NewReading> for NewMeasurement {
    fn from(reading: NewReading) -> Self {
        Self {
            device_id: reading.device_id,
            measured_at: reading.timestamp,
            active_energy: reading.active_energy,
            active_power: reading.active_power,
        }
    }
}

impl Measurement {
    pub fn into_reading(self) -> Reading {
        Reading {
            id: self.id,
            device_id: self.device_id,
            timestamp: self.measured_at,
            active_energy: self.active_energy,
            active_power: self.active_power,
        }
    }

    /// Inserts the rows and returns them ordered by id, which follows the
    /// order of `rows`.
    pub async fn insert_batch(
        rows: &[NewMeasurement],
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Measurement>, diesel::result::Error> {
        use crate::schema::measurements::dsl::*;

        let mut inserted = diesel::insert_into(measurements)
            .values(rows)
            .returning(Measurement::as_returning())
            .get_results(conn)
            .await?;
        inserted.sort_by_key(|m: &Measurement| m.id);

        Ok(inserted)
    }

    /// Rows of one device with `start <= measured_at <= end`.
    pub async fn find_in_range(
        device: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Measurement>, diesel::result::Error> {
        use crate::schema::measurements::dsl::*;

        measurements
            .filter(device_id.eq(device))
            .filter(measured_at.between(start, end))
            .order((measured_at.asc(), id.asc()))
            .select(Measurement::as_select())
            .load(conn)
            .await
    }

    /// Count total rows in the table.
    pub async fn count(
        conn: &mut AsyncPgConnection,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::measurements::dsl::*;

        measurements.count().get_result(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_reading_maps_to_columns() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let row = NewMeasurement::from(NewReading {
            device_id: "meter-1".to_string(),
            timestamp: at,
            active_energy: 12,
            active_power: -3,
        });

        assert_eq!(
            row,
            NewMeasurement {
                device_id: "meter-1".to_string(),
                measured_at: at,
                active_energy: 12,
                active_power: -3,
            }
        );
    }

    #[test]
    fn test_measurement_into_reading() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let reading = Measurement {
            id: 7,
            device_id: "meter-1".to_string(),
            measured_at: at,
            active_energy: 5,
            active_power: 6,
            created_at: at,
        }
        .into_reading();

        assert_eq!(
            reading,
            Reading {
                id: 7,
                device_id: "meter-1".to_string(),
                timestamp: at,
                active_energy: 5,
                active_power: 6,
            }
        );
    }
}
