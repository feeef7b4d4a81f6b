//! Order lifecycle and inventory-consistency core of a storefront, running
//! over a REST document store or an in-process one.

pub mod actor_framework;
pub mod app_system;
pub mod clients;
pub mod clock;
pub mod domain;
pub mod error;
pub mod session;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod mock_framework;
