use serde::{Deserialize, Serialize};

/// Stock level at or below which a product is shown as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Represents a product in the catalog. Only the fields the order core reads
/// or writes are modelled; everything else in the stored document is left
/// untouched because stock writes are partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "super::id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub availability_status: AvailabilityStatus,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            stock,
            availability_status: AvailabilityStatus::for_stock(stock),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[default]
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl AvailabilityStatus {
    pub fn for_stock(stock: u32) -> Self {
        match stock {
            0 => Self::OutOfStock,
            s if s <= LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::InStock,
        }
    }
}
