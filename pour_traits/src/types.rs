//! Data shared across the device, store, and coordinator crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operating state reported by the dispenser.
///
/// Unknown strings are preserved so they round-trip back to clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Idle,
    Busy,
    Offline,
    Other(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Idle => "idle",
            DeviceState::Busy => "busy",
            DeviceState::Offline => "offline",
            DeviceState::Other(s) => s,
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, DeviceState::Idle)
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState::Other("unknown".to_string())
    }
}

impl From<String> for DeviceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "idle" => DeviceState::Idle,
            "busy" => DeviceState::Busy,
            "offline" => DeviceState::Offline,
            _ => DeviceState::Other(s),
        }
    }
}

impl From<&str> for DeviceState {
    fn from(s: &str) -> Self {
        DeviceState::from(s.to_string())
    }
}

impl From<DeviceState> for String {
    fn from(s: DeviceState) -> Self {
        match s {
            DeviceState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status snapshot as reported by the device's `/status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceReading {
    #[serde(default)]
    pub state: DeviceState,
    #[serde(default)]
    pub glass_present: bool,
    #[serde(default)]
    pub last_pour_ml: u32,
    /// Seconds since the device booted.
    #[serde(default)]
    pub uptime: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome column of a dispense event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Started,
    Failed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Started => "started",
            EventStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(EventStatus::Started),
            "failed" => Ok(EventStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One recorded dispense attempt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseEvent {
    pub timestamp: DateTime<Utc>,
    pub user_token: String,
    pub amount_ml: i64,
    pub status: EventStatus,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_state_round_trips_verbatim() {
        let r: DeviceReading =
            serde_json::from_str(r#"{"state":"cleaning","glass_present":true}"#).unwrap();
        assert_eq!(r.state, DeviceState::Other("cleaning".into()));
        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["state"], "cleaning");
        assert_eq!(back["last_pour_ml"], 0);
        assert!(back.get("error").is_none());
    }

    #[test]
    fn missing_fields_are_not_idle_and_have_no_glass() {
        let r: DeviceReading = serde_json::from_str("{}").unwrap();
        assert!(!r.state.is_idle());
        assert!(!r.glass_present);
    }

    #[test]
    fn event_status_parses_its_own_output() {
        for s in [EventStatus::Started, EventStatus::Failed] {
            assert_eq!(s.as_str().parse::<EventStatus>().unwrap(), s);
        }
        assert!("pending".parse::<EventStatus>().is_err());
    }
}
