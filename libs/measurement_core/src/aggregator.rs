use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::reading::Reading;
use crate::resolution::Resolution;

/// One entry of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPoint {
    /// Sum of every reading inside a day or hour bucket.
    Bucket {
        date: DateTime<Utc>,
        accumulated_energy: i128,
        accumulated_power: i128,
    },
    /// A single reading, verbatim.
    Raw {
        date: DateTime<Utc>,
        active_energy: i64,
        active_power: i64,
    },
}

impl OutputPoint {
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            OutputPoint::Bucket { date, .. } | OutputPoint::Raw { date, .. } => {
                *date
            }
        }
    }
}

#[derive(Default)]
struct Totals {
    energy: i128,
    power: i128,
}

/// Turns the readings of one device and one range into ordered output
/// points.
///
/// The readings must already be filtered to the device and to the inclusive
/// range. Output never depends on the order the readings arrive in: raw
/// points are sorted by timestamp and then by id, buckets by their start.
pub fn aggregate(
    mut readings: Vec<Reading>,
    resolution: Resolution,
) -> Vec<OutputPoint> {
    if resolution == Resolution::Raw {
        readings.sort_by(|a, b| {
            a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id))
        });

        return readings
            .into_iter()
            .map(|r| OutputPoint::Raw {
                date: r.timestamp,
                active_energy: r.active_energy,
                active_power: r.active_power,
            })
            .collect();
    }

    let mut buckets: BTreeMap<DateTime<Utc>, Totals> = BTreeMap::new();
    for reading in &readings {
        let totals = buckets
            .entry(resolution.bucket_start(reading.timestamp))
            .or_default();
        totals.energy += i128::from(reading.active_energy);
        totals.power += i128::from(reading.active_power);
    }

    buckets
        .into_iter()
        .map(|(date, totals)| OutputPoint::Bucket {
            date,
            accumulated_energy: totals.energy,
            accumulated_power: totals.power,
        })
        .collect()
}
