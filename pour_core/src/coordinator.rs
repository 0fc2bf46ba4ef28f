//! The dispense coordinator: validation, single-flight guard, device command, event log.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pour_traits::{Clock, Device, DispenseEvent, EventLog, EventStatus};

use crate::config::{DeviceTimeouts, Limits};
use crate::device_error::map_device_error;
use crate::error::{DispenseError, Result};
use crate::status::{DeviceSnapshot, DispenseOutcome, SystemStatus};

/// Clears its flag on drop, so early returns and cancelled futures release it too.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Take the flag only if nobody holds it.
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard(flag))
    }

    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        FlagGuard(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone, Copy)]
enum Requested<'a> {
    Ml(i64),
    Unparsed(&'a str),
}

impl Requested<'_> {
    fn logged_ml(self) -> i64 {
        match self {
            Requested::Ml(ml) => ml,
            Requested::Unparsed(_) => 0,
        }
    }
}

/// Relays dispense requests to a single device.
///
/// Two flags are kept:
/// - `in_flight`: the single-flight slot, held from the first check until the
///   device command returns. A second attempt arriving meanwhile is rejected
///   with "Already pouring" without touching the device.
/// - `pouring`: raised only around the dispense command itself. This is what
///   status queries report; it tracks the call, not the physical pour.
pub struct Coordinator {
    pub(crate) device: Arc<dyn Device>,
    pub(crate) log: Arc<dyn EventLog>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) limits: Limits,
    pub(crate) timeouts: DeviceTimeouts,
    pub(crate) in_flight: AtomicBool,
    pub(crate) pouring: AtomicBool,
    pub(crate) dropped_events: AtomicU64,
}

impl core::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coordinator")
            .field("limits", &self.limits)
            .field("timeouts", &self.timeouts)
            .field("is_pouring", &self.is_pouring())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

impl Coordinator {
    /// True only while a dispense command is outstanding.
    pub fn is_pouring(&self) -> bool {
        self.pouring.load(Ordering::Acquire)
    }

    /// Event-log writes that failed and were skipped.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn timeouts(&self) -> &DeviceTimeouts {
        &self.timeouts
    }

    /// Current relay and device status. Never fails: an unreachable device is
    /// reported as `DeviceSnapshot::Unavailable`.
    pub async fn query_status(&self) -> SystemStatus {
        let device = match self.device.status(self.timeouts.status()).await {
            Ok(reading) => DeviceSnapshot::Online(reading),
            Err(e) => {
                tracing::debug!(error = %e, "device status unavailable");
                DeviceSnapshot::Unavailable {
                    error: e.to_string(),
                }
            }
        };
        SystemStatus {
            server_online: true,
            device_online: device.is_online(),
            device,
            timestamp: self.clock.unix_secs_f64(),
            is_pouring: self.is_pouring(),
        }
    }

    /// Validate and forward one dispense request; every attempt is logged.
    pub async fn request_dispense(&self, amount_ml: i64, user_token: &str) -> DispenseOutcome {
        self.handle(Requested::Ml(amount_ml), user_token).await
    }

    /// A request whose amount could not be read as whole millilitres
    /// (a fraction, a string). It is rejected as an invalid amount and logged
    /// with `amount_ml = 0`; an attempt already in flight still takes precedence.
    pub async fn request_dispense_unparsed(&self, raw: &str, user_token: &str) -> DispenseOutcome {
        self.handle(Requested::Unparsed(raw), user_token).await
    }

    async fn handle(&self, requested: Requested<'_>, user_token: &str) -> DispenseOutcome {
        let amount_ml = requested.logged_ml();
        match self.attempt(requested).await {
            Ok(request_id) => {
                tracing::info!(amount_ml, user_token, %request_id, "dispense started");
                self.record(user_token, amount_ml, EventStatus::Started, None)
                    .await;
                DispenseOutcome::Accepted { request_id }
            }
            Err(e) => {
                let reason = e.log_reason();
                tracing::warn!(amount_ml, user_token, %reason, "dispense rejected");
                self.record(user_token, amount_ml, EventStatus::Failed, Some(reason))
                    .await;
                DispenseOutcome::Rejected(e)
            }
        }
    }

    async fn attempt(&self, requested: Requested<'_>) -> std::result::Result<String, DispenseError> {
        let _slot = FlagGuard::try_acquire(&self.in_flight).ok_or(DispenseError::AlreadyPouring)?;

        let amount = match requested {
            Requested::Ml(amount_ml) => self.validate_amount(amount_ml)?,
            Requested::Unparsed(raw) => {
                return Err(DispenseError::UnparsableAmount {
                    raw: raw.to_string(),
                    max_ml: self.limits.max_dispense_ml,
                });
            }
        };

        let reading = self
            .device
            .status(self.timeouts.status())
            .await
            .map_err(|e| map_device_error(&*e))?;
        if !reading.glass_present {
            return Err(DispenseError::NoGlass);
        }
        if !reading.state.is_idle() {
            return Err(DispenseError::DeviceBusy {
                state: reading.state.to_string(),
            });
        }

        let request_id = format!("req_{}", self.clock.unix_secs());
        let pouring = FlagGuard::raise(&self.pouring);
        let sent = self
            .device
            .dispense(amount, &request_id, self.timeouts.dispense())
            .await;
        // Cleared as soon as the call returns; the device may still be pouring.
        drop(pouring);

        match sent {
            Ok(true) => Ok(request_id),
            Ok(false) => Err(DispenseError::DeviceRejected),
            Err(e) => Err(map_device_error(&*e)),
        }
    }

    fn validate_amount(&self, amount_ml: i64) -> std::result::Result<u32, DispenseError> {
        let max_ml = self.limits.max_dispense_ml;
        if amount_ml <= 0 || amount_ml > i64::from(max_ml) {
            return Err(DispenseError::InvalidAmount { amount_ml, max_ml });
        }
        u32::try_from(amount_ml).map_err(|_| DispenseError::InvalidAmount { amount_ml, max_ml })
    }

    /// Best-effort append; a failed write is traced and counted, never returned.
    async fn record(
        &self,
        user_token: &str,
        amount_ml: i64,
        status: EventStatus,
        reason: Option<String>,
    ) {
        let event = DispenseEvent {
            timestamp: self.clock.now(),
            user_token: user_token.to_string(),
            amount_ml,
            status,
            reason,
        };
        if let Err(e) = self.log.record(&event).await {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, %status, amount_ml, "event log write failed; continuing");
        }
    }

    /// Most recent events, newest first. `None` uses the default limit;
    /// anything above the configured cap is clamped.
    pub async fn recent_events(&self, limit: Option<i64>) -> Result<Vec<DispenseEvent>> {
        let limit = self.clamp_log_limit(limit);
        self.log
            .recent(limit)
            .await
            .map_err(|e| eyre::eyre!("read event log: {e}"))
    }

    fn clamp_log_limit(&self, limit: Option<i64>) -> u32 {
        match limit {
            None => self.limits.default_log_limit,
            Some(n) if n <= 0 => 0,
            Some(n) => u32::try_from(n)
                .unwrap_or(u32::MAX)
                .min(self.limits.max_log_limit),
        }
    }
}
