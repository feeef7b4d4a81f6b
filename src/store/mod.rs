//! Document-store contract shared by the HTTP backend and the in-process
//! actor, plus the typed [`Collection`] view the clients work through.

mod http;
mod memory;
mod typed;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;
pub use typed::{Collection, Entity};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub const PRODUCTS: &str = "products";
pub const CART: &str = "cart";
pub const ORDERS: &str = "orders";
pub const NOTIFICATIONS: &str = "notifications";
pub const PROCESSING_LOCATIONS: &str = "processingLocations";

/// Single-field equality filter, the only query the store understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Matches string fields verbatim and scalar fields by their JSON text,
    /// the way a query-string comparison would.
    pub fn matches(&self, document: &Value) -> bool {
        match document.get(&self.field) {
            Some(Value::String(text)) => *text == self.value,
            Some(Value::Number(number)) => number.to_string() == self.value,
            Some(Value::Bool(flag)) => flag.to_string() == self.value,
            _ => false,
        }
    }
}

/// A remote collection API with get/list/create/replace/patch/delete verbs.
/// No transactions and no server-side validation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str, filter: Option<Filter>) -> Result<Vec<Value>, StoreError>;

    /// `Ok(None)` when the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Creates a document; the store assigns `id` unless one is supplied.
    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError>;

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<Value, StoreError>;

    async fn patch(&self, collection: &str, id: &str, fields: Value) -> Result<Value, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
