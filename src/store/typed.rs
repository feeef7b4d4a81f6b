use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{DocumentStore, Filter, CART, NOTIFICATIONS, ORDERS, PROCESSING_LOCATIONS, PRODUCTS};
use crate::domain::{CartItem, Notification, Order, ProcessingLocation, Product};
use crate::error::StoreError;

/// A record type that lives in one store collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Store-assigned id, absent before the first write.
    fn id(&self) -> Option<&str>;
}

impl Entity for Product {
    const COLLECTION: &'static str = PRODUCTS;
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl Entity for CartItem {
    const COLLECTION: &'static str = CART;
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Entity for Order {
    const COLLECTION: &'static str = ORDERS;
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Entity for Notification {
    const COLLECTION: &'static str = NOTIFICATIONS;
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Entity for ProcessingLocation {
    const COLLECTION: &'static str = PROCESSING_LOCATIONS;
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T: Entity> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        debug!("Sending request");
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        debug!("Sending request");
        decode_all(self.store.list(T::COLLECTION, None).await?)
    }

    /// Like [`list`](Self::list), but documents that fail to decode are
    /// skipped with a warning instead of failing the whole listing.
    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn list_decodable(&self) -> Result<Vec<T>, StoreError> {
        debug!("Sending request");
        let documents = self.store.list(T::COLLECTION, None).await?;
        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let id = document.get("id").map(ToString::to_string);
                match serde_json::from_value(document) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(id = id.as_deref().unwrap_or("?"), error = %e, "Skipping undecodable document");
                        None
                    }
                }
            })
            .collect())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn list_where(&self, field: &str, value: &str) -> Result<Vec<T>, StoreError> {
        debug!("Sending request");
        let filter = Filter::new(field, value);
        decode_all(self.store.list(T::COLLECTION, Some(filter)).await?)
    }

    #[instrument(skip(self, record), fields(collection = T::COLLECTION))]
    pub async fn create(&self, record: &T) -> Result<T, StoreError> {
        debug!("Sending request");
        let document = serde_json::to_value(record)?;
        decode(self.store.create(T::COLLECTION, document).await?)
    }

    #[instrument(skip(self, record), fields(collection = T::COLLECTION))]
    pub async fn replace(&self, id: &str, record: &T) -> Result<T, StoreError> {
        debug!("Sending request");
        let document = serde_json::to_value(record)?;
        decode(self.store.replace(T::COLLECTION, id, document).await?)
    }

    #[instrument(skip(self, fields), fields(collection = T::COLLECTION))]
    pub async fn patch(&self, id: &str, fields: Value) -> Result<T, StoreError> {
        debug!("Sending request");
        decode(self.store.patch(T::COLLECTION, id, fields).await?)
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        debug!("Sending request");
        self.store.delete(T::COLLECTION, id).await
    }
}

fn decode<T: Entity>(document: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(document)?)
}

fn decode_all<T: Entity>(documents: Vec<Value>) -> Result<Vec<T>, StoreError> {
    documents.into_iter().map(decode).collect()
}
