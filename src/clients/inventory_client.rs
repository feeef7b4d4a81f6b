use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{AvailabilityStatus, Product};
use crate::error::InventoryError;
use crate::impl_entity_lookup;
use crate::store::{Collection, DocumentStore};

/// The only component allowed to change `Product.stock`.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn product(&self, product_id: &str) -> Result<Product, InventoryError>;

    /// Applies `delta` to the stored stock. A change that would take stock
    /// below zero is dropped and the unmodified product returned.
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Product, InventoryError>;

    /// Takes `quantity` units, or fails with `InsufficientStock` leaving
    /// stock untouched.
    async fn reserve(&self, product_id: &str, quantity: u32) -> Result<Product, InventoryError> {
        let product = self.product(product_id).await?;
        if product.stock < quantity {
            return Err(InventoryError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
                available: product.stock,
            });
        }
        self.adjust_stock(product_id, -i64::from(quantity)).await
    }

    async fn restock(&self, product_id: &str, quantity: u32) -> Result<Product, InventoryError> {
        self.adjust_stock(product_id, i64::from(quantity)).await
    }
}

// =============================================================================
// Read-modify-write ledger
// =============================================================================

/// Reads the product, computes the new level and PATCHes it back. Two
/// concurrent writers on one product can lose an update.
#[derive(Clone)]
pub struct ReadModifyWriteInventory {
    products: Collection<Product>,
}

impl ReadModifyWriteInventory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            products: Collection::new(store),
        }
    }
}

impl_entity_lookup!(ReadModifyWriteInventory, products, Product, InventoryError, product, InventoryError::ProductNotFound);

#[async_trait]
impl InventoryStore for ReadModifyWriteInventory {
    async fn product(&self, product_id: &str) -> Result<Product, InventoryError> {
        self.get_product(product_id).await
    }

    #[instrument(skip(self))]
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Product, InventoryError> {
        let product = self.get_product(product_id).await?;
        let next = i64::from(product.stock) + delta;
        if next < 0 {
            warn!(stock = product.stock, "Stock adjustment would go negative, ignoring");
            return Ok(product);
        }
        let stock = u32::try_from(next).unwrap_or(u32::MAX);
        let status = AvailabilityStatus::for_stock(stock);

        debug!("Sending request");
        let updated = self
            .products
            .patch(product_id, json!({ "stock": stock, "availabilityStatus": status }))
            .await?;
        info!(stock = updated.stock, "Stock updated");
        Ok(updated)
    }
}

// =============================================================================
// Serialized ledger
// =============================================================================

/// Wraps another ledger with one async lock per product, so reservations and
/// adjustments issued through this process never interleave on a product.
pub struct SerializedInventory<I> {
    inner: I,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<I: InventoryStore> SerializedInventory<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, product_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(product_id.to_string()).or_default())
    }
}

#[async_trait]
impl<I: InventoryStore> InventoryStore for SerializedInventory<I> {
    async fn product(&self, product_id: &str) -> Result<Product, InventoryError> {
        self.inner.product(product_id).await
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Product, InventoryError> {
        let lock = self.lock_for(product_id);
        let _guard = lock.lock().await;
        self.inner.adjust_stock(product_id, delta).await
    }

    async fn reserve(&self, product_id: &str, quantity: u32) -> Result<Product, InventoryError> {
        let lock = self.lock_for(product_id);
        let _guard = lock.lock().await;
        self.inner.reserve(product_id, quantity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::{create_mock_store, expect_get, expect_patch, seeded_store};
    use proptest::prelude::*;

    #[tokio::test]
    async fn reserve_decrements_and_recomputes_status() {
        let (store, _handle) = seeded_store(&[Product::new("1", "Lamp", 10.0, 12)]).await;
        let inventory = ReadModifyWriteInventory::new(store);

        let product = inventory.reserve("1", 3).await.unwrap();
        assert_eq!(product.stock, 9);
        assert_eq!(product.availability_status, AvailabilityStatus::LowStock);
    }

    #[tokio::test]
    async fn reserve_beyond_stock_fails_without_writing() {
        let (store, mut rx) = create_mock_store(10);
        let inventory = ReadModifyWriteInventory::new(store);

        let task = tokio::spawn(async move { inventory.reserve("1", 5).await });

        let (collection, id, responder) = expect_get(&mut rx).await.expect("Expected product Get");
        assert_eq!((collection.as_str(), id.as_str()), ("products", "1"));
        let doc = serde_json::to_value(Product::new("1", "Lamp", 10.0, 2)).unwrap();
        responder.send(Ok(Some(doc))).unwrap();

        assert_eq!(
            task.await.unwrap(),
            Err(InventoryError::InsufficientStock {
                product_id: "1".into(),
                requested: 5,
                available: 2
            })
        );
        assert!(rx.try_recv().is_err(), "no write may follow a failed reservation");
    }

    #[tokio::test]
    async fn adjustment_writes_stock_and_status_as_a_patch() {
        let (store, mut rx) = create_mock_store(10);
        let inventory = ReadModifyWriteInventory::new(store);

        let task = tokio::spawn(async move { inventory.restock("1", 3).await });

        let (_, _, responder) = expect_get(&mut rx).await.expect("Expected product Get");
        let doc = serde_json::to_value(Product::new("1", "Lamp", 10.0, 0)).unwrap();
        responder.send(Ok(Some(doc.clone()))).unwrap();

        let (_, id, fields, responder) = expect_patch(&mut rx).await.expect("Expected product Patch");
        assert_eq!(id, "1");
        assert_eq!(fields, json!({"stock": 3, "availabilityStatus": "Low Stock"}));
        let mut patched = doc;
        patched["stock"] = json!(3);
        patched["availabilityStatus"] = json!("Low Stock");
        responder.send(Ok(patched)).unwrap();

        assert_eq!(task.await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (store, _handle) = seeded_store(&[]).await;
        let inventory = ReadModifyWriteInventory::new(store);
        assert_eq!(
            inventory.adjust_stock("404", 1).await,
            Err(InventoryError::ProductNotFound("404".into()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serialized_ledger_never_oversells() {
        let (store, _handle) = seeded_store(&[Product::new("1", "Lamp", 10.0, 10)]).await;
        let inventory = Arc::new(SerializedInventory::new(ReadModifyWriteInventory::new(store)));

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let inventory = Arc::clone(&inventory);
                tokio::spawn(async move { inventory.reserve("1", 1).await.is_ok() })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        assert_eq!(inventory.product("1").await.unwrap().stock, 0);
    }

    #[derive(Debug, Clone)]
    enum StockOp {
        Reserve(u32),
        Adjust(i64),
    }

    fn stock_op() -> impl Strategy<Value = StockOp> {
        prop_oneof![
            (0u32..15).prop_map(StockOp::Reserve),
            (-15i64..15).prop_map(StockOp::Adjust),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn stock_stays_non_negative_and_reservations_are_all_or_nothing(
            initial in 0u32..20,
            ops in proptest::collection::vec(stock_op(), 1..12),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async move {
                let (store, _handle) = seeded_store(&[Product::new("1", "Lamp", 1.0, initial)]).await;
                let inventory = ReadModifyWriteInventory::new(store);

                for op in ops {
                    let before = inventory.product("1").await.unwrap().stock;
                    match op {
                        StockOp::Reserve(quantity) => {
                            let after = match inventory.reserve("1", quantity).await {
                                Ok(product) => product.stock,
                                Err(InventoryError::InsufficientStock { .. }) => {
                                    inventory.product("1").await.unwrap().stock
                                }
                                Err(e) => panic!("unexpected error {e}"),
                            };
                            if quantity <= before {
                                assert_eq!(after, before - quantity);
                            } else {
                                assert_eq!(after, before);
                            }
                        }
                        StockOp::Adjust(delta) => {
                            let after = inventory.adjust_stock("1", delta).await.unwrap().stock;
                            let expected = i64::from(before) + delta;
                            if expected < 0 {
                                assert_eq!(after, before);
                            } else {
                                assert_eq!(i64::from(after), expected);
                            }
                        }
                    }
                }
            });
        }
    }
}
