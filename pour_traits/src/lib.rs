pub mod clock;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{DeviceReading, DeviceState, DispenseEvent, EventStatus};

/// Error type used at trait boundaries; callers map it to typed errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The dispensing device, reached over some request/response transport.
///
/// Every call carries its own timeout. Implementations must not retry.
#[async_trait]
pub trait Device: Send + Sync {
    async fn status(&self, timeout: Duration) -> Result<DeviceReading, BoxError>;

    /// Ask the device to pour. `Ok(false)` means the device answered but declined.
    async fn dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        timeout: Duration,
    ) -> Result<bool, BoxError>;
}

/// Append-only store of dispense attempts.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn record(&self, event: &DispenseEvent) -> Result<(), BoxError>;

    /// At most `limit` events, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<DispenseEvent>, BoxError>;
}

#[async_trait]
impl<T: Device + ?Sized> Device for Arc<T> {
    async fn status(&self, timeout: Duration) -> Result<DeviceReading, BoxError> {
        (**self).status(timeout).await
    }

    async fn dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        timeout: Duration,
    ) -> Result<bool, BoxError> {
        (**self).dispense(amount_ml, request_id, timeout).await
    }
}

#[async_trait]
impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    async fn record(&self, event: &DispenseEvent) -> Result<(), BoxError> {
        (**self).record(event).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DispenseEvent>, BoxError> {
        (**self).recent(limit).await
    }
}
