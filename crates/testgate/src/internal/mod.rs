#[macro_use]
pub(crate) mod common;
pub mod client;
pub mod config;
pub mod coordinator;

#[cfg(test)]
pub mod tests;
