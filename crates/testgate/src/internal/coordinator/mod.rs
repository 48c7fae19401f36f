pub mod core;
pub(crate) mod events;
pub(crate) mod queue;
pub(crate) mod reactor;
pub mod start;
