//! Type-state builder for `Coordinator`.
//!
//! `build()` only exists once a device and an event log are set; `try_build()`
//! is always available and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

use pour_traits::{Clock, Device, EventLog, SystemClock};

use crate::config::{DeviceTimeouts, Limits};
use crate::coordinator::Coordinator;
use crate::error::{BuildError, Result};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Coordinator`. All fields are validated on `build()`.
pub struct CoordinatorBuilder<D, L> {
    device: Option<Arc<dyn Device>>,
    log: Option<Arc<dyn EventLog>>,
    clock: Option<Arc<dyn Clock>>,
    limits: Option<Limits>,
    timeouts: Option<DeviceTimeouts>,
    _d: PhantomData<D>,
    _l: PhantomData<L>,
}

impl Default for CoordinatorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            device: None,
            log: None,
            clock: None,
            limits: None,
            timeouts: None,
            _d: PhantomData,
            _l: PhantomData,
        }
    }
}

impl Coordinator {
    /// Start building a Coordinator.
    pub fn builder() -> CoordinatorBuilder<Missing, Missing> {
        CoordinatorBuilder::default()
    }
}

impl<D, L> CoordinatorBuilder<D, L> {
    fn retag<D2, L2>(self) -> CoordinatorBuilder<D2, L2> {
        CoordinatorBuilder {
            device: self.device,
            log: self.log,
            clock: self.clock,
            limits: self.limits,
            timeouts: self.timeouts,
            _d: PhantomData,
            _l: PhantomData,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_timeouts(mut self, timeouts: DeviceTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Coordinator> {
        let device = self
            .device
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDevice))?;
        let log = self
            .log
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEventLog))?;
        let limits = self.limits.unwrap_or_default();
        let timeouts = self.timeouts.unwrap_or_default();

        // ── Validation ───────────────────────────────────────────────────────
        if limits.max_dispense_ml == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_dispense_ml must be >= 1",
            )));
        }
        if limits.default_log_limit > limits.max_log_limit {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "default log limit exceeds max log limit",
            )));
        }
        if timeouts.status_ms == 0 || timeouts.dispense_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "device timeouts must be >= 1ms",
            )));
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(c) => c,
            None => Arc::new(SystemClock::new()),
        };

        Ok(Coordinator {
            device,
            log,
            clock,
            limits,
            timeouts,
            in_flight: AtomicBool::new(false),
            pouring: AtomicBool::new(false),
            dropped_events: AtomicU64::new(0),
        })
    }
}

impl<L> CoordinatorBuilder<Missing, L> {
    pub fn with_device(mut self, device: impl Device + 'static) -> CoordinatorBuilder<Set, L> {
        self.device = Some(Arc::new(device));
        self.retag()
    }

    /// Use a device that is already shared elsewhere.
    pub fn with_shared_device(mut self, device: Arc<dyn Device>) -> CoordinatorBuilder<Set, L> {
        self.device = Some(device);
        self.retag()
    }
}

impl<D> CoordinatorBuilder<D, Missing> {
    pub fn with_event_log(mut self, log: impl EventLog + 'static) -> CoordinatorBuilder<D, Set> {
        self.log = Some(Arc::new(log));
        self.retag()
    }

    pub fn with_shared_event_log(mut self, log: Arc<dyn EventLog>) -> CoordinatorBuilder<D, Set> {
        self.log = Some(log);
        self.retag()
    }
}

impl CoordinatorBuilder<Set, Set> {
    pub fn build(self) -> Result<Coordinator> {
        self.try_build()
    }
}
