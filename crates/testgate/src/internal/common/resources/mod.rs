pub mod amount;
pub mod pool;
pub mod set;

pub use amount::ResourceAmount;
pub use pool::{InfeasibleDemand, ResourcePool, check_feasibility};
pub use set::ResourceSet;

pub type ResourceName = String;
