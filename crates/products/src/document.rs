//! Wire/storage shape of a product.
//!
//! This is exactly the nine public attributes, camelCase, with `null` for an
//! absent description or deletion time. It is what HTTP callers see and what
//! document backends persist. Internal bookkeeping (the revision counter) is
//! deliberately not part of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::ProductId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDocument {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
