#[macro_use]
pub mod internal;

pub use crate::internal::common::setup::setup_logging;
pub use crate::internal::common::Map;

pub type Error = internal::common::error::GateError;
pub type Result<T> = std::result::Result<T, Error>;

pub mod resources {
    pub use crate::internal::common::resources::amount::ResourceAmount;
    pub use crate::internal::common::resources::pool::{
        InfeasibleDemand, ResourcePool, check_feasibility,
    };
    pub use crate::internal::common::resources::set::ResourceSet;
}

pub mod config {
    pub use crate::internal::config::{
        ADMISSION_TIMEOUT_ENV, CoordinatorConfig, CoordinatorConfigBuilder, QUEUE_ORDER_ENV,
        QueueOrder, RESOURCES_ENV,
    };
}

pub mod coordinator {
    pub use crate::internal::coordinator::core::{Phase, PoolSnapshot};
    pub use crate::internal::coordinator::start::{
        spawn_coordinator, spawn_coordinator_from_env, start_coordinator,
    };
}

pub mod client {
    pub use crate::internal::client::facade::{Admission, AdmissionClient, AdmissionGuard};
    pub use crate::internal::client::host::{LibtestHost, NamedTask, TaskHost};
}
