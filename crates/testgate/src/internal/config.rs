use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;

use crate::internal::common::error::GateError;

/// Declared capacity, e.g. `cpu=16,memory=64`.
pub const RESOURCES_ENV: &str = "TESTGATE_RESOURCES";
/// `unordered` or `fifo`.
pub const QUEUE_ORDER_ENV: &str = "TESTGATE_QUEUE_ORDER";
/// Human readable duration, e.g. `90s` or `5m`.
pub const ADMISSION_TIMEOUT_ENV: &str = "TESTGATE_ADMISSION_TIMEOUT";

/// Order in which an admission pass visits pending requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueOrder {
    /// Hash map iteration order. Small requests may repeatedly overtake a large one.
    #[default]
    Unordered,
    /// Enqueue order. A request that does not fit does not block later ones,
    /// but older requests get the first chance at released capacity.
    Fifo,
}

impl FromStr for QueueOrder {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unordered" => Ok(QueueOrder::Unordered),
            "fifo" => Ok(QueueOrder::Fifo),
            other => Err(GateError::ConfigError(format!(
                "Unknown queue order '{other}', expected 'unordered' or 'fifo'"
            ))),
        }
    }
}

#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
#[builder(pattern = "owned")]
pub struct CoordinatorConfig {
    #[builder(default)]
    pub queue_order: QueueOrder,
    /// When set, a request that is still pending after this duration is withdrawn.
    /// Without it, a request that never fits waits forever.
    #[builder(default)]
    pub admission_timeout: Option<Duration>,
}

impl CoordinatorConfig {
    pub fn from_env() -> crate::Result<Self> {
        let mut config = CoordinatorConfig::default();
        if let Some(order) = read_env(QUEUE_ORDER_ENV)? {
            config.queue_order = order.parse()?;
        }
        if let Some(timeout) = read_env(ADMISSION_TIMEOUT_ENV)? {
            let timeout = humantime::parse_duration(timeout.trim()).map_err(|e| {
                GateError::ConfigError(format!("Invalid value of {ADMISSION_TIMEOUT_ENV}: {e}"))
            })?;
            config.admission_timeout = Some(timeout);
        }
        Ok(config)
    }
}

fn read_env(var: &str) -> crate::Result<Option<String>> {
    match std::env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(GateError::ConfigError(format!("Cannot read {var}: {e}"))),
    }
}
