//! Cart model and its remote mirror encoding.
//!
//! The store itself lives in [`store`]. This module holds the line-item type,
//! the `cartUpdated` channel, and the pure list operations the store applies
//! optimistically.

pub mod store;

pub use store::{CartStore, RefreshFailurePolicy, StoreConfig, SyncOutcome};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::string_or_number;
use crate::events::Channel;

/// Metadata key the cart is stored under on the customer record.
pub const CART_META_KEY: &str = "cart";

/// One product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            quantity,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "id": self.id, "quantity": self.quantity })
    }
}

/// Published after every successful persist, carrying the full cart.
pub struct CartUpdated;

impl Channel for CartUpdated {
    const NAME: &'static str = "cartUpdated";
    type Payload = Vec<CartItem>;
}

/// Increase the quantity of `id`, or append a new line if it is not present.
pub fn add_item(items: &mut Vec<CartItem>, id: &str, quantity: u32) {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => item.quantity = item.quantity.saturating_add(quantity),
        None => items.push(CartItem::new(id, quantity)),
    }
}

/// Drop the line for `id`. Returns whether anything was removed.
pub fn remove_item(items: &mut Vec<CartItem>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id != id);
    items.len() != before
}

/// Replace the quantity of `id`. Absent ids are left alone.
pub fn set_quantity(items: &mut [CartItem], id: &str, quantity: u32) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.quantity = quantity;
            true
        }
        None => false,
    }
}

/// Encode a cart as the metadata value written to the customer record.
pub fn encode_cart(items: &[CartItem]) -> Value {
    Value::Array(items.iter().map(CartItem::to_json).collect())
}

/// Decode the `"cart"` metadata value read from the customer record.
///
/// Anything other than a list decodes as an empty cart. Entries that are not
/// valid lines are skipped, and repeated ids are folded into their first
/// occurrence so the result never holds two lines for one product.
pub fn decode_cart(value: Option<&Value>) -> Vec<CartItem> {
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            tracing::warn!(kind = json_kind(other), "cart metadata is not a list");
            return Vec::new();
        }
        None => return Vec::new(),
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match CartItem::deserialize(entry) {
            Ok(item) if item.quantity > 0 => add_item(&mut items, &item.id, item.quantity),
            Ok(item) => {
                tracing::warn!(product_id = %item.id, "skipping cart line with zero quantity");
            }
            Err(e) => tracing::warn!(error = %e, "skipping undecodable cart line"),
        }
    }
    items
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
