use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{DocumentStore, Filter};
use crate::actor_framework::{DocumentActor, DocumentClient, DocumentRequest};
use crate::error::StoreError;

/// [`DocumentStore`] backed by an in-process [`DocumentActor`]. Used when no
/// remote store is configured, and throughout the tests.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    client: DocumentClient,
}

impl MemoryDocumentStore {
    /// Starts a fresh actor on the current runtime.
    pub fn spawn(buffer_size: usize) -> (Self, JoinHandle<()>) {
        let (actor, client) = DocumentActor::new(buffer_size);
        let handle = tokio::spawn(actor.run());
        (Self { client }, handle)
    }

    /// Wraps an existing client, e.g. one whose requests a test answers by hand.
    pub fn from_client(client: DocumentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str, filter: Option<Filter>) -> Result<Vec<Value>, StoreError> {
        let collection = collection.to_string();
        self.client
            .request(|respond_to| DocumentRequest::List {
                collection,
                filter,
                respond_to,
            })
            .await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.client
            .request(|respond_to| DocumentRequest::Get {
                collection,
                id,
                respond_to,
            })
            .await
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError> {
        let collection = collection.to_string();
        self.client
            .request(|respond_to| DocumentRequest::Create {
                collection,
                document,
                respond_to,
            })
            .await
    }

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<Value, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.client
            .request(|respond_to| DocumentRequest::Replace {
                collection,
                id,
                document,
                respond_to,
            })
            .await
    }

    async fn patch(&self, collection: &str, id: &str, fields: Value) -> Result<Value, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.client
            .request(|respond_to| DocumentRequest::Patch {
                collection,
                id,
                fields,
                respond_to,
            })
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.client
            .request(|respond_to| DocumentRequest::Delete {
                collection,
                id,
                respond_to,
            })
            .await
    }
}
