use thiserror::Error;

use crate::domain::OrderStatus;

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Store transport error: {0}")]
    Transport(String),
    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("Document decode error: {0}")]
    Decode(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart item not found: {0}")]
    ItemNotFound(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while placing an order.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid payment details: {0}")]
    InvalidPayment(String),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Order {order_number} was written but could not be read back")]
    PersistenceVerificationFailed { order_number: String },
    #[error(transparent)]
    Cart(#[from] CartError),
}

impl From<InventoryError> for CheckoutError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::ProductNotFound(id) => Self::ProductNotFound(id),
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => Self::Cart(CartError::Inventory(other)),
        }
    }
}

/// Errors that can occur while driving an order through its lifecycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LifecycleError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Invalid status transition: {from} -> {to}. Allowed transitions: {}", join_statuses(.allowed))]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        allowed: Vec<OrderStatus>,
    },
    #[error("Order cannot be cancelled while {0}")]
    CancellationNotAllowed(OrderStatus),
    #[error("A cancellation reason is required")]
    MissingReason,
    #[error("No customer is logged in")]
    NotAuthenticated,
    #[error("Order {0} does not belong to the current customer")]
    NotOrderOwner(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NotificationError {
    #[error("Notification rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A fatal step of a multi-step workflow failed; later steps did not run.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{workflow} aborted at step `{step}`: {message}")]
pub struct WorkflowError {
    pub workflow: &'static str,
    pub step: &'static str,
    pub message: String,
}

fn join_statuses(statuses: &[OrderStatus]) -> String {
    if statuses.is_empty() {
        return "none".to_string();
    }
    statuses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_lists_allowed_statuses() {
        let err = LifecycleError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Processing,
            allowed: vec![OrderStatus::Delivered],
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition: shipped -> processing. Allowed transitions: delivered"
        );
    }

    #[test]
    fn terminal_transition_message_says_none() {
        let err = LifecycleError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
            allowed: vec![],
        };
        assert!(err.to_string().ends_with("Allowed transitions: none"));
    }
}
