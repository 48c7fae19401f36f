use std::future::Future;

use tokio::sync::mpsc::unbounded_channel;

use crate::internal::client::facade::AdmissionClient;
use crate::internal::common::error::GateError;
use crate::internal::common::resources::ResourceSet;
use crate::internal::config::{CoordinatorConfig, RESOURCES_ENV};
use crate::internal::coordinator::core::Coordinator;
use crate::internal::coordinator::reactor::coordinator_loop;

/// Creates a coordinator with capacity `total`.
///
/// Returns a client handle and the control loop future. The future has to be
/// spawned (or awaited) on a tokio runtime; it finishes once all clients and
/// outstanding grants are dropped.
pub fn start_coordinator(
    total: ResourceSet,
    config: CoordinatorConfig,
) -> (AdmissionClient, impl Future<Output = ()>) {
    let (sender, receiver) = unbounded_channel();
    let core = Coordinator::new(total.clone(), config, sender.downgrade());
    let client = AdmissionClient::new(total, sender);
    (client, coordinator_loop(core, receiver))
}

/// Runs the coordinator on a dedicated thread with its own runtime, so that
/// it can be used from tests that do not run inside tokio.
pub fn spawn_coordinator(
    total: ResourceSet,
    config: CoordinatorConfig,
) -> crate::Result<AdmissionClient> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let (client, future) = start_coordinator(total, config);
    std::thread::Builder::new()
        .name("testgate-coordinator".to_string())
        .spawn(move || runtime.block_on(future))?;
    Ok(client)
}

/// Like [`spawn_coordinator`], with the capacity taken from `TESTGATE_RESOURCES`
/// and the configuration from [`CoordinatorConfig::from_env`].
pub fn spawn_coordinator_from_env() -> crate::Result<AdmissionClient> {
    let total = ResourceSet::from_env(RESOURCES_ENV)?
        .ok_or_else(|| GateError::ConfigError(format!("{RESOURCES_ENV} is not set")))?;
    let config = CoordinatorConfig::from_env()?;
    spawn_coordinator(total, config)
}
