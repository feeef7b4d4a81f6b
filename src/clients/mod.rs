//! Service clients of the order core, leaves first: the inventory ledger,
//! the cart, checkout, the lifecycle controller and the cleanup scheduler.

mod macros;
pub mod cart_client;
pub mod checkout_client;
pub mod cleanup_scheduler;
pub mod inventory_client;
pub mod lifecycle_client;
pub mod notification_client;

pub use cart_client::*;
pub use checkout_client::*;
pub use cleanup_scheduler::*;
pub use inventory_client::*;
pub use lifecycle_client::*;
pub use notification_client::*;
