pub mod app_state;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod execution;
pub mod logging;
pub mod session;
pub mod types;

pub use app_state::{AppState, Notice};
pub use client::{ClientSettings, StableFiClient};
pub use errors::{ClientError, ErrorKind};
