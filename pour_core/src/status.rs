//! Results returned by the coordinator.

use pour_traits::{DeviceReading, DeviceState};
use serde::{Serialize, Serializer};

use crate::error::DispenseError;

/// What the relay knows about the device right now.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSnapshot {
    /// A genuine reading from the device.
    Online(DeviceReading),
    /// The device could not be reached; no reading exists.
    Unavailable { error: String },
}

impl DeviceSnapshot {
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceSnapshot::Online(_))
    }

    /// The reading, or the offline placeholder clients expect in its place.
    pub fn to_reading(&self) -> DeviceReading {
        match self {
            DeviceSnapshot::Online(r) => r.clone(),
            DeviceSnapshot::Unavailable { error } => DeviceReading {
                state: DeviceState::Offline,
                glass_present: false,
                last_pour_ml: 0,
                uptime: 0,
                error: Some(error.clone()),
            },
        }
    }
}

impl Serialize for DeviceSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeviceSnapshot::Online(r) => r.serialize(serializer),
            DeviceSnapshot::Unavailable { .. } => self.to_reading().serialize(serializer),
        }
    }
}

/// Reply to a status query. Wire names are the ones the ESP32 frontend reads.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub server_online: bool,
    #[serde(rename = "esp_online")]
    pub device_online: bool,
    #[serde(rename = "esp_status")]
    pub device: DeviceSnapshot,
    /// Unix seconds.
    pub timestamp: f64,
    pub is_pouring: bool,
}

/// Result of one dispense attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DispenseOutcome {
    /// The device accepted the command and is pouring.
    Accepted { request_id: String },
    /// Turned down before or by the device; nothing is pouring.
    Rejected(DispenseError),
}

impl DispenseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DispenseOutcome::Accepted { .. })
    }

    pub fn into_result(self) -> Result<String, DispenseError> {
        match self {
            DispenseOutcome::Accepted { request_id } => Ok(request_id),
            DispenseOutcome::Rejected(e) => Err(e),
        }
    }
}
