//! Maintenance window model and payload validation
//!
//! A [`MaintenanceWindow`] is a time-bounded interval during which a set of
//! switches, interfaces and links is administratively down. This module owns
//! the record itself, the client payloads used to create and patch it, and
//! the invariants every accepted window satisfies:
//!
//! - `end > start`
//! - `start` is not in the past when the window is submitted
//! - at least one switch, interface or link is listed
//!
//! Status changes are not made here; see [`lifecycle`].

pub mod lifecycle;
pub mod overlap;

pub use lifecycle::Transition;
pub use overlap::check_overlap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{MaintenanceError, Result};

pub type MaintenanceId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Running,
    Finished,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Finished => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = MaintenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "running" => Ok(Status::Running),
            "finished" => Ok(Status::Finished),
            other => Err(MaintenanceError::Store(format!(
                "Unknown maintenance status '{}'",
                other
            ))),
        }
    }
}

/// End used when a window is submitted without one
pub fn far_future() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn generate_id() -> MaintenanceId {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: MaintenanceId,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time_format")]
    pub start: DateTime<Utc>,
    #[serde(with = "time_format", default = "far_future")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub switches: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, with = "time_format::option")]
    pub inserted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "time_format::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MaintenanceWindow {
    /// New pending window with a generated id and no description
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            description: String::new(),
            start,
            end,
            switches: Vec::new(),
            interfaces: Vec::new(),
            links: Vec::new(),
            status: Status::Pending,
            inserted_at: None,
            updated_at: None,
        }
    }

    pub fn has_devices(&self) -> bool {
        !(self.switches.is_empty() && self.interfaces.is_empty() && self.links.is_empty())
    }

    /// True when both windows list at least one common switch, interface or link
    pub fn shares_devices(&self, other: &MaintenanceWindow) -> bool {
        fn intersects(a: &[String], b: &[String]) -> bool {
            let set: HashSet<&String> = a.iter().collect();
            b.iter().any(|id| set.contains(id))
        }

        intersects(&self.switches, &other.switches)
            || intersects(&self.interfaces, &other.interfaces)
            || intersects(&self.links, &other.links)
    }

    /// Structural invariants that hold for every stored window
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(MaintenanceError::Validation(
                "End before start not allowed".to_string(),
            ));
        }
        if !self.has_devices() {
            return Err(MaintenanceError::Validation(
                "At least one item must be provided".to_string(),
            ));
        }
        Ok(())
    }

    /// Invariants checked when a client submits a window
    pub fn validate_submission(&self, now: DateTime<Utc>) -> Result<()> {
        if self.start < now {
            return Err(MaintenanceError::Validation(
                "Start in the past not allowed".to_string(),
            ));
        }
        self.validate()
    }
}

impl fmt::Display for MaintenanceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'<{} to {}>", self.id, self.start, self.end)
    }
}

fn reject_server_field(name: &str, value: &Option<serde_json::Value>) -> Result<()> {
    if value.is_some() {
        return Err(MaintenanceError::Validation(format!(
            "Setting a maintenance {} is not allowed",
            name
        )));
    }
    Ok(())
}

/// Create payload: every window field except the server-owned ones
#[derive(Debug, Clone, Deserialize)]
pub struct NewWindow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "time_format")]
    pub start: DateTime<Utc>,
    #[serde(default, with = "time_format::option")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub switches: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    /// Relax the overlap check to windows that share devices
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub inserted_at: Option<serde_json::Value>,
    #[serde(default)]
    pub updated_at: Option<serde_json::Value>,
}

impl NewWindow {
    pub fn into_window(self, now: DateTime<Utc>) -> Result<MaintenanceWindow> {
        reject_server_field("status", &self.status)?;
        reject_server_field("inserted_at", &self.inserted_at)?;
        reject_server_field("updated_at", &self.updated_at)?;

        let id = match self.id {
            Some(id) if id.trim().is_empty() => {
                return Err(MaintenanceError::Validation(
                    "Maintenance id must not be empty".to_string(),
                ))
            }
            Some(id) => id,
            None => generate_id(),
        };

        let window = MaintenanceWindow {
            id,
            description: self.description.unwrap_or_default(),
            start: self.start,
            end: self.end.unwrap_or_else(far_future),
            switches: self.switches,
            interfaces: self.interfaces,
            links: self.links,
            status: Status::Pending,
            inserted_at: None,
            updated_at: None,
        };
        window.validate_submission(now)?;
        Ok(window)
    }
}

/// Partial update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "time_format::option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, with = "time_format::option")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub switches: Option<Vec<String>>,
    #[serde(default)]
    pub interfaces: Option<Vec<String>>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub inserted_at: Option<serde_json::Value>,
    #[serde(default)]
    pub updated_at: Option<serde_json::Value>,
}

impl WindowUpdate {
    pub fn changes_times(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Replacement window after applying this patch to `current`
    pub fn apply_to(
        &self,
        current: &MaintenanceWindow,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceWindow> {
        reject_server_field("status", &self.status)?;
        reject_server_field("inserted_at", &self.inserted_at)?;
        reject_server_field("updated_at", &self.updated_at)?;
        if let Some(id) = &self.id {
            if id.as_str() != Some(current.id.as_str()) {
                return Err(MaintenanceError::Validation(
                    "Maintenance id can not be changed".to_string(),
                ));
            }
        }

        let mut window = current.clone();
        if let Some(description) = &self.description {
            window.description = description.clone();
        }
        if let Some(start) = self.start {
            window.start = start;
        }
        if let Some(end) = self.end {
            window.end = end;
        }
        if let Some(switches) = &self.switches {
            window.switches = switches.clone();
        }
        if let Some(interfaces) = &self.interfaces {
            window.interfaces = interfaces.clone();
        }
        if let Some(links) = &self.links {
            window.links = links.clone();
        }

        if self.changes_times() {
            window.validate_submission(now)?;
        } else {
            window.validate()?;
        }
        Ok(window)
    }
}

/// Serde adapter for [`crate::constants::TIME_FMT`] timestamps.
///
/// Accepts RFC 3339 as well on input; always writes `TIME_FMT`.
pub mod time_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::constants::TIME_FMT;

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_str(value, TIME_FMT)
            .or_else(|_| DateTime::parse_from_rfc3339(value))
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.format(TIME_FMT).to_string()
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|raw| {
                super::parse(&raw)
                    .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
            })
            .transpose()
        }
    }
}
