use anyhow::Context;
use measurement_core::{CreateReading, MeasurementService};
use serde::Deserialize;
use serde_json::Number;

/// One entry of the seed file. Older exports spell the device field
/// `id-dispositivo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRecord {
    #[serde(rename = "idDispositivo", alias = "id-dispositivo")]
    device_id: String,
    timestamp: String,
    active_energy: Number,
    active_power: Number,
}

impl From<SeedRecord> for CreateReading {
    fn from(record: SeedRecord) -> Self {
        CreateReading {
            device_id: record.device_id,
            timestamp: record.timestamp,
            active_energy: record.active_energy,
            active_power: record.active_power,
        }
    }
}

/// Imports the seed file into an empty store. A store that already holds
/// readings is left untouched.
pub async fn load_measurements(
    file_path: &str,
    service: &MeasurementService,
) -> anyhow::Result<()> {
    let existing_count = service
        .store()
        .count()
        .await
        .context("Failed to count stored measurements")?;
    if existing_count > 0 {
        tracing::info!(
            count = existing_count,
            "Measurements already loaded, skipping import"
        );
        return Ok(());
    }

    tracing::info!(file = %file_path, "Loading measurements from seed file");

    let contents = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read seed file {file_path}"))?;
    let records = parse_seed(&contents)?;

    tracing::info!(records = records.len(), "Parsed records from seed file");

    // One batch: every record is validated before any is stored, and the
    // store writes the rows in a single transaction.
    let total = records.len();
    let batch: Vec<CreateReading> =
        records.into_iter().map(CreateReading::from).collect();
    let total_inserted = service
        .save_measurements(batch)
        .await
        .context("Failed to import seed records")?
        .len();

    tracing::info!(
        inserted = total_inserted,
        total,
        "Measurements loaded into store"
    );

    Ok(())
}

fn parse_seed(contents: &str) -> anyhow::Result<Vec<SeedRecord>> {
    let deserializer = &mut serde_json::Deserializer::from_str(contents);
    serde_path_to_error::deserialize(deserializer)
        .map_err(|e| anyhow::anyhow!("Invalid seed file at {}: {}", e.path(), e.inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use measurement_core::{AggregationRequest, InMemoryMeasurementStore, Resolution};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;

    fn seed_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "measurements-seed-{}.json",
            uuid::Uuid::new_v4()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_accepts_both_device_spellings() {
        let records = parse_seed(
            r#"[
                {"id-dispositivo": "a", "timestamp": "2024-01-01T00:00:00Z", "activeEnergy": 1, "activePower": 1},
                {"idDispositivo": "b", "timestamp": "2024-01-01T00:00:00Z", "activeEnergy": 2, "activePower": 2}
            ]"#,
        )
        .unwrap();

        let devices: Vec<&str> = records.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(devices, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_reports_path() {
        let err = parse_seed(r#"[{"idDispositivo": "a", "timestamp": "x", "activeEnergy": "1", "activePower": 1}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("[0].activeEnergy"), "{err}");
    }

    #[tokio::test]
    async fn test_loads_into_empty_store_only() {
        let service =
            MeasurementService::new(Arc::new(InMemoryMeasurementStore::new()));
        let path = seed_file(
            r#"[
                {"id-dispositivo": "meter-1", "timestamp": "2024-01-01T00:00:00Z", "activeEnergy": 1, "activePower": 1},
                {"id-dispositivo": "meter-1", "timestamp": "2024-01-01T00:30:00Z", "activeEnergy": 1, "activePower": 1}
            ]"#,
        );
        let path = path.to_str().unwrap();

        load_measurements(path, &service).await.unwrap();
        load_measurements(path, &service).await.unwrap();

        assert_eq!(service.store().count().await.unwrap(), 2);

        let output = service
            .get_measurements(&AggregationRequest {
                device_id: "meter-1".to_string(),
                start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end_date: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                resolution: Resolution::Raw,
            })
            .await
            .unwrap();
        assert_eq!(output.measurements.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_record_imports_nothing() {
        let service =
            MeasurementService::new(Arc::new(InMemoryMeasurementStore::new()));
        let mut records: Vec<serde_json::Value> = (0..1001)
            .map(|i| {
                serde_json::json!({
                    "id-dispositivo": "meter-1",
                    "timestamp": format!("2024-01-01T00:00:{:02}Z", i % 60),
                    "activeEnergy": i,
                    "activePower": 1
                })
            })
            .collect();
        records[1000]["timestamp"] = "garbage".into();
        let path = seed_file(&serde_json::to_string(&records).unwrap());
        let path = path.to_str().unwrap();

        let err = load_measurements(path, &service).await.unwrap_err();
        assert!(format!("{err:#}").contains("[1000].timestamp"), "{err:#}");
        assert_eq!(service.store().count().await.unwrap(), 0);

        // The next start retries the whole file instead of skipping it.
        records[1000]["timestamp"] = "2024-01-01T01:00:00Z".into();
        std::fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
        load_measurements(path, &service).await.unwrap();
        assert_eq!(service.store().count().await.unwrap(), 1001);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let service =
            MeasurementService::new(Arc::new(InMemoryMeasurementStore::new()));

        let result = load_measurements("/nonexistent/seed.json", &service).await;
        assert!(result.is_err());
    }
}
