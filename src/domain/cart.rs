use serde::{Deserialize, Serialize};

use super::{round2, Product};

/// One product line in a shopper's cart.
///
/// Field names follow the stored document (`ProductID`, `Quantity`,
/// `TotalPrice`). `product` is the joined catalog entry, filled in when the
/// cart is loaded and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(
        default,
        deserialize_with = "super::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    #[serde(rename = "ProductID", deserialize_with = "super::id_from_string_or_number")]
    pub product_id: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "TotalPrice")]
    pub total_price: f64,
    #[serde(rename = "Product", default, skip_serializing)]
    pub product: Option<Product>,
}

impl CartItem {
    pub fn new(owner_id: impl Into<String>, product: &Product, quantity: u32) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            product_id: product.id.clone(),
            quantity,
            total_price: product.price * f64::from(quantity),
            product: None,
        }
    }

    /// Copy of this line with a new quantity, priced at `unit_price`.
    pub fn with_quantity(&self, quantity: u32, unit_price: f64) -> Self {
        Self {
            quantity,
            total_price: unit_price * f64::from(quantity),
            product: None,
            ..self.clone()
        }
    }

    /// Unit price derived from the joined product, falling back to the
    /// stored line total.
    pub fn unit_price(&self) -> f64 {
        match &self.product {
            Some(product) => product.price,
            None if self.quantity > 0 => self.total_price / f64::from(self.quantity),
            None => 0.0,
        }
    }
}

/// Recomputed view of a cart after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: f64,
}

impl CartSnapshot {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let total_items = items.iter().map(|item| item.quantity).sum();
        let total_price = round2(items.iter().map(|item| item.total_price).sum());
        Self {
            items,
            total_items,
            total_price,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
