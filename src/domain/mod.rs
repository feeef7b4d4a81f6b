pub mod cart;
pub mod location;
pub mod notification;
pub mod order;
pub mod product;

pub use cart::*;
pub use location::*;
pub use notification::*;
pub use order::*;
pub use product::*;

use serde::{Deserialize, Deserializer};

/// Store ids arrive as JSON strings or numbers depending on who created the
/// document. Both decode to a `String`.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

pub(crate) fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id_from_string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

/// Rounds a money amount to cents.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Formats a money amount the way customer-facing messages show it.
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}
