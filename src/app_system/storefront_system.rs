use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{StorefrontConfig, SystemError};
use crate::clients::{
    AutoCleanup, CartClient, CheckoutClient, CleanupHandle, InventoryStore, LifecycleClient,
    NotificationSink, ReadModifyWriteInventory, SerializedInventory, StoreNotificationSink,
};
use crate::clock::{Clock, SystemClock};
use crate::session::StaticSession;
use crate::store::{DocumentStore, HttpDocumentStore, MemoryDocumentStore};

const STORE_BUFFER: usize = 64;

/// Wires the store, the inventory ledger and every client together, and
/// owns the background tasks.
pub struct StorefrontSystem {
    pub store: Arc<dyn DocumentStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub cart: CartClient,
    pub checkout: CheckoutClient,
    pub lifecycle: LifecycleClient,
    pub inbox: StoreNotificationSink,
    pub cleanup: AutoCleanup,
    pub session: Arc<StaticSession>,
    cleanup_handle: Option<CleanupHandle>,
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    pub fn new(config: &StorefrontConfig) -> Result<Self, SystemError> {
        let (store, handles): (Arc<dyn DocumentStore>, Vec<JoinHandle<()>>) = match &config.store_url {
            Some(url) => {
                info!(url = %url, "Using REST document store");
                (Arc::new(HttpDocumentStore::new(url.as_str(), config.request_timeout)?), Vec::new())
            }
            None => {
                info!("Using in-memory document store");
                let (store, handle) = MemoryDocumentStore::spawn(STORE_BUFFER);
                (Arc::new(store), vec![handle])
            }
        };

        let notifications: Arc<dyn NotificationSink> = Arc::new(StoreNotificationSink::new(Arc::clone(&store)));
        let mut system = Self::with_collaborators(
            config,
            store,
            notifications,
            Arc::new(StaticSession::anonymous()),
            Arc::new(SystemClock),
        );
        system.handles = handles;
        Ok(system)
    }

    /// Builds the clients over an existing store with the given sink, session
    /// and clock.
    pub fn with_collaborators(
        config: &StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        notifications: Arc<dyn NotificationSink>,
        session: Arc<StaticSession>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = ReadModifyWriteInventory::new(Arc::clone(&store));
        let inventory: Arc<dyn InventoryStore> = if config.serialize_stock_writes {
            Arc::new(SerializedInventory::new(ledger))
        } else {
            Arc::new(ledger)
        };

        let cart = CartClient::new(config.cart_owner.clone(), Arc::clone(&store), Arc::clone(&inventory))
            .with_restock_on_clear(config.restock_on_clear);
        let checkout = CheckoutClient::new(
            cart.clone(),
            Arc::clone(&store),
            Arc::clone(&inventory),
            Arc::clone(&notifications),
            session.clone(),
            Arc::clone(&clock),
        )
        .with_payment_delay(config.payment_delay);
        let lifecycle = LifecycleClient::new(
            Arc::clone(&store),
            Arc::clone(&inventory),
            notifications,
            session.clone(),
            Arc::clone(&clock),
        )
        .with_retention(config.retention);
        let cleanup = AutoCleanup::new(Arc::clone(&store), clock).with_interval(config.cleanup_interval);

        Self {
            inbox: StoreNotificationSink::new(Arc::clone(&store)),
            store,
            inventory,
            cart,
            checkout,
            lifecycle,
            cleanup,
            session,
            cleanup_handle: None,
            handles: Vec::new(),
        }
    }

    /// Starts the periodic cleanup sweep. Calling it twice is a no-op.
    pub fn start_cleanup(&mut self) {
        if self.cleanup_handle.is_none() {
            self.cleanup_handle = Some(self.cleanup.spawn());
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        let Self {
            store,
            inventory,
            cart,
            checkout,
            lifecycle,
            inbox,
            cleanup,
            session,
            cleanup_handle,
            handles,
        } = self;

        if let Some(handle) = cleanup_handle {
            handle.shutdown().await?;
        }

        // The in-memory store actor exits once every client handle is gone.
        drop((store, inventory, cart, checkout, lifecycle, inbox, cleanup, session));

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(format!("Store task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use crate::mock_framework::seed;

    #[tokio::test]
    async fn in_memory_system_starts_and_shuts_down() {
        let mut system = StorefrontSystem::new(&StorefrontConfig::default()).unwrap();
        seed(&system.store, &[Product::new("1", "Lamp", 10.0, 5)]).await;

        system.cart.add_to_cart("1", 2).await.unwrap();
        assert_eq!(system.inventory.product("1").await.unwrap().stock, 3);

        system.start_cleanup();
        system.start_cleanup();
        assert_eq!(system.shutdown().await, Ok(()));
    }

    #[tokio::test]
    async fn serialized_ledger_is_used_when_configured() {
        let config = StorefrontConfig {
            serialize_stock_writes: true,
            ..StorefrontConfig::default()
        };
        let system = StorefrontSystem::new(&config).unwrap();
        seed(&system.store, &[Product::new("1", "Lamp", 10.0, 4)]).await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let inventory = Arc::clone(&system.inventory);
                tokio::spawn(async move { inventory.reserve("1", 1).await.is_ok() })
            })
            .collect();
        let mut granted = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 4);
        assert_eq!(system.inventory.product("1").await.unwrap().stock, 0);
        assert_eq!(system.shutdown().await, Ok(()));
    }

    #[tokio::test]
    async fn remote_store_runs_no_background_task() {
        let config = StorefrontConfig {
            store_url: Some("http://127.0.0.1:9".to_string()),
            ..StorefrontConfig::default()
        };
        let system = StorefrontSystem::new(&config).unwrap();
        assert!(system.handles.is_empty());
        assert_eq!(system.shutdown().await, Ok(()));
    }
}
