use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::clients::InventoryStore;
use crate::domain::{CartItem, CartSnapshot};
use crate::error::CartError;
use crate::impl_entity_lookup;
use crate::store::{Collection, DocumentStore};

/// One shopper's cart. Every line is stamped with `owner_id` and every
/// query is scoped by it.
///
/// Adding or growing a line reserves stock immediately; shrinking or
/// removing a line gives it back. After each mutation the cart is reloaded
/// and the new [`CartSnapshot`] is published to subscribers.
#[derive(Clone)]
pub struct CartClient {
    owner_id: String,
    items: Collection<CartItem>,
    inventory: Arc<dyn InventoryStore>,
    restock_on_clear: bool,
    updates: Arc<watch::Sender<CartSnapshot>>,
}

impl CartClient {
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        inventory: Arc<dyn InventoryStore>,
    ) -> Self {
        let (updates, _) = watch::channel(CartSnapshot::default());
        Self {
            owner_id: owner_id.into(),
            items: Collection::new(store),
            inventory,
            restock_on_clear: false,
            updates: Arc::new(updates),
        }
    }

    /// Return stock for every line removed by [`clear_cart`](Self::clear_cart).
    pub fn with_restock_on_clear(mut self, restock: bool) -> Self {
        self.restock_on_clear = restock;
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Receives every snapshot published after a reload.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.updates.subscribe()
    }

    /// Last published snapshot, without a store round trip.
    pub fn snapshot(&self) -> CartSnapshot {
        self.updates.borrow().clone()
    }

    async fn owned_items(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(self.items.list_where("ownerId", &self.owner_id).await?)
    }

    async fn owned_item(&self, cart_item_id: &str) -> Result<CartItem, CartError> {
        let item = self.get_cart_item(cart_item_id).await?;
        if item.owner_id != self.owner_id {
            return Err(CartError::ItemNotFound(cart_item_id.to_string()));
        }
        Ok(item)
    }

    /// Reloads the owner's lines, joins each with its product and publishes
    /// the recomputed snapshot.
    #[instrument(skip(self), fields(owner_id = %self.owner_id))]
    pub async fn load_cart(&self) -> Result<CartSnapshot, CartError> {
        let mut items = self.owned_items().await?;
        for item in &mut items {
            match self.inventory.product(&item.product_id).await {
                Ok(product) => item.product = Some(product),
                Err(e) => warn!(product_id = %item.product_id, error = %e, "Could not join cart line with product"),
            }
        }
        let snapshot = CartSnapshot::from_items(items);
        self.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    #[instrument(skip(self), fields(owner_id = %self.owner_id))]
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<CartSnapshot, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let product = self.inventory.reserve(product_id, quantity).await?;

        let existing = self
            .owned_items()
            .await?
            .into_iter()
            .find(|item| item.product_id == product_id);

        let written = match existing {
            Some(line) => {
                let merged = line.with_quantity(line.quantity + quantity, product.price);
                match &line.id {
                    Some(id) => self.items.replace(id, &merged).await,
                    None => self.items.create(&merged).await,
                }
            }
            None => {
                self.items
                    .create(&CartItem::new(&self.owner_id, &product, quantity))
                    .await
            }
        };
        if let Err(e) = written {
            error!(error = %e, quantity, "Cart write failed after stock was reserved");
            return Err(e.into());
        }

        info!(quantity, "Added to cart");
        self.load_cart().await
    }

    /// Sets a line's quantity. Zero or less removes the line.
    #[instrument(skip(self), fields(owner_id = %self.owner_id))]
    pub async fn update_quantity(&self, cart_item_id: &str, new_quantity: i64) -> Result<CartSnapshot, CartError> {
        if new_quantity <= 0 {
            return self.remove_from_cart(cart_item_id).await;
        }
        let quantity = u32::try_from(new_quantity).map_err(|_| CartError::InvalidQuantity(new_quantity))?;
        let line = self.owned_item(cart_item_id).await?;

        let product = if quantity > line.quantity {
            self.inventory
                .reserve(&line.product_id, quantity - line.quantity)
                .await?
        } else if quantity < line.quantity {
            self.inventory
                .restock(&line.product_id, line.quantity - quantity)
                .await?
        } else {
            self.inventory.product(&line.product_id).await?
        };

        self.items
            .replace(cart_item_id, &line.with_quantity(quantity, product.price))
            .await?;
        info!(from = line.quantity, to = quantity, "Cart quantity updated");
        self.load_cart().await
    }

    #[instrument(skip(self), fields(owner_id = %self.owner_id))]
    pub async fn remove_from_cart(&self, cart_item_id: &str) -> Result<CartSnapshot, CartError> {
        let line = self.owned_item(cart_item_id).await?;
        self.items.delete(cart_item_id).await?;

        if let Err(e) = self.inventory.restock(&line.product_id, line.quantity).await {
            warn!(product_id = %line.product_id, error = %e, "Restock after cart removal failed");
        }
        info!(product_id = %line.product_id, "Removed from cart");
        self.load_cart().await
    }

    /// Deletes every line. Stock comes back only when the cart was built
    /// with `with_restock_on_clear(true)`.
    #[instrument(skip(self), fields(owner_id = %self.owner_id))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot, CartError> {
        self.delete_all(self.restock_on_clear).await
    }

    /// Empties the cart once its contents became an order. The stock now
    /// belongs to the order, so it is never returned.
    #[instrument(skip(self))]
    pub async fn clear_after_checkout(&self) -> Result<CartSnapshot, CartError> {
        self.delete_all(false).await
    }

    async fn delete_all(&self, restock: bool) -> Result<CartSnapshot, CartError> {
        for line in self.owned_items().await? {
            let Some(id) = line.id.as_deref() else { continue };
            self.items.delete(id).await?;
            if restock {
                if let Err(e) = self.inventory.restock(&line.product_id, line.quantity).await {
                    warn!(product_id = %line.product_id, error = %e, "Restock on clear failed");
                }
            }
        }
        info!(restock, "Cart cleared");
        self.load_cart().await
    }

    // -------------------------------------------------------------------------
    // Queries over the last snapshot
    // -------------------------------------------------------------------------

    /// Number of distinct products in the cart.
    pub fn item_count(&self) -> usize {
        self.updates.borrow().items.len()
    }

    pub fn is_product_in_cart(&self, product_id: &str) -> bool {
        self.updates
            .borrow()
            .items
            .iter()
            .any(|item| item.product_id == product_id)
    }

    pub fn quantity_in_cart(&self, product_id: &str) -> u32 {
        self.updates
            .borrow()
            .items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    pub fn cart_total(&self) -> f64 {
        self.updates.borrow().total_price
    }
}

impl_entity_lookup!(CartClient, items, CartItem, CartError, cart_item, CartError::ItemNotFound);
