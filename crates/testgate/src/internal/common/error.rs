use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Admission coordinator is not running")]
    CoordinatorStopped,
    #[error("Admission coordinator is shutting down")]
    ShuttingDown,
    #[error("Admission of '{identity}' timed out after {}", humantime::format_duration(*timeout))]
    AdmissionTimeout { identity: String, timeout: Duration },
    #[error("Pending admission of '{identity}' was replaced by a request with the same identity")]
    Displaced { identity: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
