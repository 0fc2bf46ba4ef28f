#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core dispense logic (transport-agnostic).
//!
//! All device and storage access goes through the `pour_traits::Device` and
//! `pour_traits::EventLog` traits.
//!
//! ## Architecture
//!
//! - **Coordinator**: validation, single-flight guard, device command (`coordinator`)
//! - **Builder**: type-state construction with validation (`builder`)
//! - **Configuration**: runtime limits and timeouts (`config`, `conversions`)
//! - **Errors**: typed rejections and their log/caller reasons (`error`, `device_error`)
//! - **Status**: status snapshot and dispense outcome (`status`)
//! - **Event log**: in-process store for runs without a database (`memory_log`)
//!
//! ## Dispense sequence
//!
//! 1. take the single-flight slot, or reject "Already pouring"
//! 2. check `0 < amount_ml <= max_dispense_ml`
//! 3. read device status (short timeout)
//! 4. require a glass and an idle device
//! 5. send the command (long timeout) with `is_pouring` raised around the call
//! 6. record the outcome in the event log, best-effort

pub mod builder;
pub mod config;
pub mod conversions;
pub mod coordinator;
pub mod device_error;
pub mod error;
pub mod memory_log;
pub mod mocks;
pub mod status;

pub use builder::{CoordinatorBuilder, Missing, Set};
pub use config::{DeviceTimeouts, Limits};
pub use coordinator::Coordinator;
pub use error::{BuildError, DispenseError, ErrorKind};
pub use memory_log::MemoryEventLog;
pub use status::{DeviceSnapshot, DispenseOutcome, SystemStatus};
