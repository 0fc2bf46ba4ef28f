//! Test doubles for pour_core

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pour_traits::{BoxError, Device, DeviceReading, DeviceState, DispenseEvent, EventLog};

/// An event log whose every call fails, for exercising best-effort logging.
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn record(&self, _event: &DispenseEvent) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("event log unavailable")))
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<DispenseEvent>, BoxError> {
        Err(Box::new(std::io::Error::other("event log unavailable")))
    }
}

/// A device with scripted answers that counts its calls.
pub struct ScriptedDevice {
    status: Mutex<Result<DeviceReading, String>>,
    dispense: Mutex<Result<bool, String>>,
    status_calls: AtomicUsize,
    dispense_calls: AtomicUsize,
    last_dispense: Mutex<Option<(u32, String, Duration)>>,
}

impl ScriptedDevice {
    pub fn new(status: Result<DeviceReading, String>, dispense: Result<bool, String>) -> Self {
        Self {
            status: Mutex::new(status),
            dispense: Mutex::new(dispense),
            status_calls: AtomicUsize::new(0),
            dispense_calls: AtomicUsize::new(0),
            last_dispense: Mutex::new(None),
        }
    }

    /// Idle, glass in place, accepts every command.
    pub fn ready() -> Self {
        Self::new(
            Ok(DeviceReading {
                state: DeviceState::Idle,
                glass_present: true,
                ..DeviceReading::default()
            }),
            Ok(true),
        )
    }

    /// Every call fails with the given transport message.
    pub fn unreachable(msg: &str) -> Self {
        Self::new(Err(msg.to_string()), Err(msg.to_string()))
    }

    pub fn set_status(&self, status: Result<DeviceReading, String>) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }

    pub fn set_dispense(&self, dispense: Result<bool, String>) {
        if let Ok(mut d) = self.dispense.lock() {
            *d = dispense;
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn dispense_calls(&self) -> usize {
        self.dispense_calls.load(Ordering::SeqCst)
    }

    /// Total calls of either kind.
    pub fn calls(&self) -> usize {
        self.status_calls() + self.dispense_calls()
    }

    /// `(amount_ml, request_id, timeout)` of the last dispense command.
    pub fn last_dispense(&self) -> Option<(u32, String, Duration)> {
        self.last_dispense.lock().ok().and_then(|l| l.clone())
    }
}

#[async_trait]
impl Device for ScriptedDevice {
    async fn status(&self, _timeout: Duration) -> Result<DeviceReading, BoxError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .status
            .lock()
            .map_err(|_| std::io::Error::other("script poisoned"))?
            .clone();
        scripted.map_err(|msg| Box::new(std::io::Error::other(msg)) as BoxError)
    }

    async fn dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        timeout: Duration,
    ) -> Result<bool, BoxError> {
        self.dispense_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_dispense.lock() {
            *last = Some((amount_ml, request_id.to_string(), timeout));
        }
        let scripted = self
            .dispense
            .lock()
            .map_err(|_| std::io::Error::other("script poisoned"))?
            .clone();
        scripted.map_err(|msg| Box::new(std::io::Error::other(msg)) as BoxError)
    }
}
