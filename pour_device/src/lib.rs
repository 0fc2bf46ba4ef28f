pub mod error;
pub mod http;

pub use error::DeviceError;
pub use http::HttpDevice;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pour_traits::{BoxError, Device, DeviceReading, DeviceState};

struct SimState {
    busy_until: Option<Instant>,
    last_pour_ml: u32,
    glass_present: bool,
    reachable: bool,
}

/// Simulated dispenser implementation
///
/// Starts idle with a glass in place. A pour keeps it busy for
/// `amount_ml * ms_per_ml`, after which it reports idle again.
pub struct SimulatedDevice {
    state: Mutex<SimState>,
    booted: Instant,
    ms_per_ml: u64,
}

impl SimulatedDevice {
    pub fn new(ms_per_ml: u64) -> Self {
        SimulatedDevice {
            state: Mutex::new(SimState {
                busy_until: None,
                last_pour_ml: 0,
                glass_present: true,
                reachable: true,
            }),
            booted: Instant::now(),
            ms_per_ml,
        }
    }

    pub fn set_glass_present(&self, present: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.glass_present = present;
        }
    }

    /// Simulate the device dropping off the network.
    pub fn set_reachable(&self, reachable: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.reachable = reachable;
        }
    }

    fn snapshot(&self) -> Result<DeviceReading, DeviceError> {
        let s = self
            .state
            .lock()
            .map_err(|_| DeviceError::Http("simulated device state poisoned".into()))?;
        if !s.reachable {
            return Err(DeviceError::Connect("simulated device unreachable".into()));
        }
        let busy = s.busy_until.is_some_and(|t| Instant::now() < t);
        Ok(DeviceReading {
            state: if busy {
                DeviceState::Busy
            } else {
                DeviceState::Idle
            },
            glass_present: s.glass_present,
            last_pour_ml: s.last_pour_ml,
            uptime: self.booted.elapsed().as_secs(),
            error: None,
        })
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl Device for SimulatedDevice {
    async fn status(&self, _timeout: Duration) -> Result<DeviceReading, BoxError> {
        Ok(self.snapshot()?)
    }

    async fn dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        _timeout: Duration,
    ) -> Result<bool, BoxError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| DeviceError::Http("simulated device state poisoned".into()))?;
        if !s.reachable {
            return Err(Box::new(DeviceError::Connect(
                "simulated device unreachable".into(),
            )));
        }
        let now = Instant::now();
        if !s.glass_present || s.busy_until.is_some_and(|t| now < t) {
            tracing::warn!(amount_ml, request_id, "simulated device declined dispense");
            return Ok(false);
        }
        let pour = Duration::from_millis(self.ms_per_ml.saturating_mul(u64::from(amount_ml)));
        s.busy_until = Some(now + pour);
        s.last_pour_ml = amount_ml;
        tracing::info!(amount_ml, request_id, pour_ms = pour.as_millis() as u64, "simulated pour");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn simulated_device_goes_busy_then_idle() {
        let dev = SimulatedDevice::new(2);
        let before = dev.status(T).await.unwrap();
        assert!(before.state.is_idle());
        assert!(before.glass_present);

        assert!(dev.dispense(10, "req_1", T).await.unwrap());
        let during = dev.status(T).await.unwrap();
        assert_eq!(during.state, DeviceState::Busy);
        assert_eq!(during.last_pour_ml, 10);

        // busy for 20ms
        assert!(!dev.dispense(10, "req_2", T).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(dev.status(T).await.unwrap().state.is_idle());
    }

    #[tokio::test]
    async fn simulated_device_declines_without_glass() {
        let dev = SimulatedDevice::new(0);
        dev.set_glass_present(false);
        assert!(!dev.status(T).await.unwrap().glass_present);
        assert!(!dev.dispense(5, "req_1", T).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_simulated_device_errors() {
        let dev = SimulatedDevice::new(0);
        dev.set_reachable(false);
        let err = dev.status(T).await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
        assert!(dev.dispense(5, "req_1", T).await.is_err());
    }
}
