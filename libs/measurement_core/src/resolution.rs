use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, TimeDelta, Timelike, Utc};

use crate::error::UnsupportedResolutionError;

/// Aggregation granularity of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    #[default]
    Day,
    Hour,
    Raw,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Day => "day",
            Resolution::Hour => "hour",
            Resolution::Raw => "raw",
        }
    }

    /// Truncates `instant` to the start of its UTC day or hour. Identity
    /// for [`Resolution::Raw`].
    pub fn bucket_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = instant.date_naive().and_time(NaiveTime::MIN);
        match self {
            Resolution::Day => midnight.and_utc(),
            Resolution::Hour => {
                (midnight + TimeDelta::hours(i64::from(instant.hour()))).and_utc()
            }
            Resolution::Raw => instant,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = UnsupportedResolutionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "day" => Ok(Resolution::Day),
            "hour" => Ok(Resolution::Hour),
            "raw" => Ok(Resolution::Raw),
            _ => Err(UnsupportedResolutionError(value.to_string())),
        }
    }
}
