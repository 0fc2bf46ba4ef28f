use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("device answered with HTTP {0}")]
    Status(u16),
    #[error("invalid status payload: {0}")]
    Payload(String),
    #[error("http: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
