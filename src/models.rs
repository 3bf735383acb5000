use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::RegistryError;

/// Observed state of a feed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Offline => "offline",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Status::Online),
            "offline" => Ok(Status::Offline),
            other => Err(RegistryError::InvalidStatus(other.to_string())),
        }
    }
}

/// Descriptive data for a monitored feed. Never changes after registration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StreamInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub code: String,
}

/// A closed interval during which a feed held one status.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whole seconds, never negative.
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Downtime entries always carry `reason`, `null` when none was given.
fn serialize_downtime<S: Serializer>(
    history: &[Session],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Downtime<'a> {
        start: &'a DateTime<Utc>,
        end: &'a DateTime<Utc>,
        duration: u64,
        reason: &'a Option<String>,
    }

    serializer.collect_seq(history.iter().map(|s| Downtime {
        start: &s.start,
        end: &s.end,
        duration: s.duration,
        reason: &s.reason,
    }))
}

/// Stored availability state of one feed. Derived figures live in [`EnrichedRecord`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub status: Status,
    pub session_start: DateTime<Utc>,
    pub last_online: DateTime<Utc>,
    pub last_offline: Option<DateTime<Utc>>,
    #[serde(rename = "totalUptime")]
    pub total_uptime_seconds: u64,
    #[serde(rename = "totalDowntime")]
    pub total_downtime_seconds: u64,
    pub uptime_history: Vec<Session>,
    #[serde(serialize_with = "serialize_downtime")]
    pub downtime_history: Vec<Session>,
    pub error_count: u64,
    pub last_error: Option<String>,
    #[serde(rename = "startTime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationBreakdown {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

/// Stream info plus the stored record plus figures computed at read time.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub info: StreamInfo,
    #[serde(flatten)]
    pub record: AvailabilityRecord,
    pub current_duration_seconds: u64,
    pub current_duration_formatted: DurationBreakdown,
    pub uptime_percentage: f64,
    pub downtime_percentage: f64,
    pub avg_uptime_formatted: DurationBreakdown,
    pub avg_downtime_formatted: DurationBreakdown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamAnalytics {
    pub id: String,
    pub name: String,
    pub uptime_history: Vec<Session>,
    #[serde(serialize_with = "serialize_downtime")]
    pub downtime_history: Vec<Session>,
    pub total_uptime: u64,
    pub total_downtime: u64,
    pub error_count: u64,
}
