//! System orchestration, configuration, startup and shutdown.

pub mod config;
pub mod demo;
pub mod error;
pub mod storefront_system;
pub mod telemetry;

pub use config::*;
pub use demo::*;
pub use error::*;
pub use storefront_system::*;
pub use telemetry::*;
