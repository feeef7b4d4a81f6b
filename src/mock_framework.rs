//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_store`] to get a store whose requests arrive on a
//! receiver you control, then answer them with helpers like [`expect_get`]
//! or [`expect_patch`]. When a test only cares about end state, use
//! [`seeded_store`] for a real in-memory store instead.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::actor_framework::{DocumentClient, DocumentRequest};
use crate::clients::NotificationSink;
use crate::clock::FixedClock;
use crate::domain::{Notification, NotificationKind, Product, Recipient};
use crate::error::{NotificationError, StoreError};
use crate::session::{SessionUser, StaticSession};
use crate::store::{Collection, DocumentStore, Entity, MemoryDocumentStore};

type Responder<T> = oneshot::Sender<Result<T, StoreError>>;

/// Creates a mock store and a receiver for asserting requests.
///
/// The store sends every call to a channel the test drains, so the test
/// decides what each store call returns, including failures.
pub fn create_mock_store(buffer_size: usize) -> (Arc<dyn DocumentStore>, mpsc::Receiver<DocumentRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let store = MemoryDocumentStore::from_client(DocumentClient::new(sender));
    (Arc::new(store), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, String, Responder<Option<Value>>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Get { collection, id, respond_to }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, Responder<Vec<Value>>)> {
    match receiver.recv().await {
        Some(DocumentRequest::List { collection, respond_to, .. }) => Some((collection, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, Value, Responder<Value>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Create { collection, document, respond_to }) => {
            Some((collection, document, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next message is a Replace request
pub async fn expect_replace(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, String, Value, Responder<Value>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Replace { collection, id, document, respond_to }) => {
            Some((collection, id, document, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next message is a Patch request
pub async fn expect_patch(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, String, Value, Responder<Value>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Patch { collection, id, fields, respond_to }) => {
            Some((collection, id, fields, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next message is a Delete request
pub async fn expect_delete(
    receiver: &mut mpsc::Receiver<DocumentRequest>,
) -> Option<(String, String, Responder<()>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Delete { collection, id, respond_to }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

// =============================================================================
// Seeding
// =============================================================================

/// In-memory store pre-loaded with `products`.
pub async fn seeded_store(products: &[Product]) -> (Arc<dyn DocumentStore>, JoinHandle<()>) {
    let (store, handle) = MemoryDocumentStore::spawn(64);
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    seed(&store, products).await;
    (store, handle)
}

pub async fn seed<T: Entity>(store: &Arc<dyn DocumentStore>, records: &[T]) -> Vec<T> {
    let collection = Collection::<T>::new(Arc::clone(store));
    let mut created = Vec::with_capacity(records.len());
    for record in records {
        created.push(collection.create(record).await.unwrap());
    }
    created
}

pub async fn stock_of(store: &Arc<dyn DocumentStore>, product_id: &str) -> u32 {
    Collection::<Product>::new(Arc::clone(store))
        .get(product_id)
        .await
        .unwrap()
        .map(|p| p.stock)
        .unwrap()
}

// =============================================================================
// Collaborators
// =============================================================================

/// Sink that keeps every notification it is handed.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, recipient: Recipient, kind: NotificationKind) -> usize {
        self.sent()
            .iter()
            .filter(|n| n.recipient == recipient && n.kind == kind)
            .count()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Sink whose every send fails.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn send(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected("sink offline".to_string()))
    }
}

pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(test_epoch()))
}

/// Session for the customer used by `sample_address`.
pub fn customer_session() -> Arc<StaticSession> {
    Arc::new(StaticSession::logged_in(SessionUser::new(
        "u1",
        "alice@example.com",
        "Alice Doe",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_store() {
        let (store, mut receiver) = create_mock_store(10);

        let create_task = tokio::spawn(async move { store.create("orders", json!({"total": 5})).await });

        let (collection, document, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(collection, "orders");
        assert_eq!(document["total"], 5);
        responder.send(Ok(json!({"id": "1", "total": 5}))).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok(json!({"id": "1", "total": 5})));
    }
}
