use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SubsecRound, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Wall-clock format shared by every on-disk artifact.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One timestamped temperature/humidity sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "wall_clock")]
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(deserialize_with = "unix_seconds::deserialize")]
    pub unix_timestamp: i64,
}

impl Reading {
    pub fn new<Tz: TimeZone>(at: DateTime<Tz>, temperature: f64, humidity: f64) -> Self {
        let at = at.trunc_subsecs(0);
        Self {
            timestamp: at.naive_local(),
            temperature,
            humidity,
            unix_timestamp: at.timestamp(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Converts a naive wall-clock stamp back into a unix timestamp using the
    /// local zone. Used for legacy window lines that carry no unix column.
    pub fn unix_from_local(timestamp: &NaiveDateTime) -> i64 {
        Local
            .from_local_datetime(timestamp)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| timestamp.and_utc().timestamp())
    }
}

pub(crate) mod wall_clock {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Unix seconds as integers or with a fractional part, from numbers or text.
/// Fractions are truncated.
pub(crate) mod unix_seconds {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    pub fn parse(raw: &str) -> Option<i64> {
        let raw = raw.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(from_float))
    }

    fn from_float(secs: f64) -> Option<i64> {
        // i64::MAX as f64 rounds up, so the upper bound is exclusive.
        let secs = secs.trunc();
        (secs.is_finite() && secs >= i64::MIN as f64 && secs < i64::MAX as f64).then_some(secs as i64)
    }

    struct UnixSeconds;

    impl<'de> Visitor<'de> for UnixSeconds {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("unix seconds")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("unix timestamp {} out of range", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            from_float(v).ok_or_else(|| E::custom(format!("unix timestamp {} out of range", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            parse(v).ok_or_else(|| E::custom(format!("bad unix timestamp {:?}", v)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(UnixSeconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    CurrentConditions,
    CurrentConditionsRegistry,
    TrendSingleDay,
    TrendMultiDay,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::CurrentConditions => "current_conditions",
            AnalysisKind::CurrentConditionsRegistry => "current_conditions_registry",
            AnalysisKind::TrendSingleDay => "trend_single_day",
            AnalysisKind::TrendMultiDay => "trend_multi_day",
        }
    }

    pub fn for_trend(days: u32) -> Self {
        if days <= 1 {
            AnalysisKind::TrendSingleDay
        } else {
            AnalysisKind::TrendMultiDay
        }
    }

    pub fn all() -> &'static [AnalysisKind] {
        &[
            AnalysisKind::CurrentConditions,
            AnalysisKind::CurrentConditionsRegistry,
            AnalysisKind::TrendSingleDay,
            AnalysisKind::TrendMultiDay,
        ]
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown analysis kind: {}", s))
    }
}

/// One prompt/response cycle with the inference API.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub timestamp: NaiveDateTime,
    pub model: String,
    pub kind: AnalysisKind,
    pub prompt: String,
    pub response: String,
}

/// Row count of one daily log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub readings: usize,
}

/// An archived analysis together with where it lives.
#[derive(Debug, Clone)]
pub struct AnalysisEntry {
    pub path: PathBuf,
    pub record: AnalysisRecord,
}
