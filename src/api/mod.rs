//! Customer-record collaborator: the two remote operations the cart depends on.
//!
//! [`CustomerApi`] is the seam. [`rest::RestCustomerApi`] talks to a
//! WooCommerce-style REST backend; [`mock::MockCustomerApi`] keeps records in
//! memory for tests.

pub mod mock;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One `{ key, value }` entry of a customer's extensible metadata list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// The parts of a remote customer record the client reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub meta_data: Vec<MetaData>,
}

impl Customer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta_data: Vec::new(),
        }
    }

    /// Value of the first metadata entry with `key`, if any.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta_data
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Upsert a metadata entry the way the backend does: an existing key is
    /// overwritten in place, a new key is appended.
    pub fn merge_meta(&mut self, entry: MetaData) {
        match self.meta_data.iter_mut().find(|m| m.key == entry.key) {
            Some(existing) => existing.value = entry.value,
            None => self.meta_data.push(entry),
        }
    }
}

/// Body of a metadata write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub meta_data: Vec<MetaData>,
}

impl CustomerUpdate {
    /// An update that writes a single metadata key.
    pub fn meta(key: impl Into<String>, value: Value) -> Self {
        Self {
            meta_data: vec![MetaData {
                key: key.into(),
                value,
            }],
        }
    }
}

/// Remote customer records.
#[async_trait]
pub trait CustomerApi: Send + Sync {
    async fn get_customer_by_id(&self, id: &str) -> Result<Customer>;
    async fn update_customer_by_id(&self, id: &str, update: &CustomerUpdate) -> Result<()>;
}

/// Accept an identifier encoded either as a JSON string or a JSON number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
