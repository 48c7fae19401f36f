#[macro_use]
pub(crate) mod trace;

pub(crate) mod data_structures;
pub(crate) mod error;
pub(crate) mod parser;
pub mod resources;
pub(crate) mod setup;

pub use data_structures::Map;
