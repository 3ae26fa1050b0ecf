pub mod contracts;
pub mod engine;
pub mod engine_client;
pub mod facade;
pub mod revert;

#[cfg(test)]
pub(crate) mod mock;
