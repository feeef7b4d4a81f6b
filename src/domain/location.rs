use serde::{Deserialize, Serialize};

/// A warehouse or shipping site an order can be attributed to while it is
/// being fulfilled. Reference data; never written by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingLocation {
    #[serde(deserialize_with = "super::id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
}

impl ProcessingLocation {
    /// Human form used in tracking entries.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.city)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    ProcessingCenter,
    ShippingCenter,
}
