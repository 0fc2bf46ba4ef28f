use thiserror::Error;

/// Why a dispense attempt was turned down.
///
/// `Display` is the caller-facing reason; `log_reason()` is what lands in the event log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispenseError {
    #[error("Already pouring")]
    AlreadyPouring,
    #[error("Invalid amount (max {max_ml}ml)")]
    InvalidAmount { amount_ml: i64, max_ml: u32 },
    /// The amount was not a whole number of millilitres.
    #[error("Invalid amount (max {max_ml}ml)")]
    UnparsableAmount { raw: String, max_ml: u32 },
    #[error("No glass present")]
    NoGlass,
    #[error("Device is busy")]
    DeviceBusy { state: String },
    #[error("Connection error: {0}")]
    Unreachable(String),
    #[error("ESP32 rejected request")]
    DeviceRejected,
}

/// Coarse classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller's fault (bad amount, already pouring); retrying the same request won't help.
    Validation,
    /// Device not ready (no glass, busy); may succeed later.
    Precondition,
    /// Device unreachable or timed out.
    Transport,
    /// Device answered but declined the command.
    Rejected,
}

impl ErrorKind {
    /// Failures on our side of the wire rather than the caller's.
    pub fn is_server_side(self) -> bool {
        matches!(self, ErrorKind::Transport | ErrorKind::Rejected)
    }
}

impl DispenseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispenseError::AlreadyPouring
            | DispenseError::InvalidAmount { .. }
            | DispenseError::UnparsableAmount { .. } => ErrorKind::Validation,
            DispenseError::NoGlass | DispenseError::DeviceBusy { .. } => ErrorKind::Precondition,
            DispenseError::Unreachable(_) => ErrorKind::Transport,
            DispenseError::DeviceRejected => ErrorKind::Rejected,
        }
    }

    pub fn reason(&self) -> String {
        self.to_string()
    }

    pub fn log_reason(&self) -> String {
        match self {
            DispenseError::InvalidAmount { amount_ml, .. } => {
                format!("Invalid amount: {amount_ml}ml")
            }
            DispenseError::UnparsableAmount { raw, .. } => format!("Invalid amount: {raw}"),
            DispenseError::DeviceBusy { state } => format!("ESP32 not idle: {state}"),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing device")]
    MissingDevice,
    #[error("missing event log")]
    MissingEventLog,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
