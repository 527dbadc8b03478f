use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{
    truncate_to_micros, DomainError, DomainResult, Entity, EntityId, ValidationErrors,
};

use crate::document::ProductDocument;
use crate::rules;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub EntityId);

impl ProductId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }

    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(EntityId::new())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        self.0.as_uuid()
    }
}

impl From<EntityId> for ProductId {
    fn from(value: EntityId) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Lifecycle state, derived from `deleted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductState {
    Active,
    /// Terminal. No further transition is allowed.
    Deleted,
}

/// Caller-supplied fields for a new product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub stock: i64,
}

/// Partial update. Absent fields are left untouched.
///
/// A description cannot be cleared through a patch; `None` means "keep".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            rules::check_name(name, &mut errors);
        }
        rules::check_patch_description(self.description.as_deref(), &mut errors);
        if let Some(category) = &self.category {
            rules::check_category(category, &mut errors);
        }
        if let Some(price) = self.price {
            rules::check_price(price, &mut errors);
        }
        if let Some(stock) = self.stock {
            rules::check_stock(stock, &mut errors);
        }
        errors.into_result()
    }
}

/// Entity: Product.
///
/// Fields are private; every new state comes out of [`Product::create`],
/// [`Product::apply_update`] or [`Product::mark_deleted`], each of which
/// returns a new value and leaves `self` untouched.
///
/// Invariants:
/// - `created_at <= updated_at`, and `created_at` never changes.
/// - `updated_at` never decreases.
/// - once `deleted_at` is set it is `>= updated_at` and never cleared.
/// - `version` starts at 1 and grows by exactly one per transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "ProductDocument")]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    category: String,
    price: f64,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Product {
    /// Validate `input` and build a new active product.
    ///
    /// All violated fields are reported together.
    pub fn create(input: NewProduct, id: ProductId, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();
        rules::check_name(&input.name, &mut errors);
        rules::check_description(input.description.as_deref(), &mut errors);
        rules::check_category(&input.category, &mut errors);
        rules::check_price(input.price, &mut errors);
        rules::check_stock(input.stock, &mut errors);
        errors.into_result()?;

        let at = truncate_to_micros(at);
        Ok(Self {
            id,
            name: input.name,
            description: input.description,
            category: input.category,
            price: input.price,
            stock: input.stock,
            created_at: at,
            updated_at: at,
            deleted_at: None,
            version: 1,
        })
    }

    /// Apply a partial update, producing the next revision.
    ///
    /// Deleted products are rejected before the patch is looked at. An empty
    /// patch is valid and only moves `updated_at`.
    pub fn apply_update(&self, patch: ProductPatch, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_active()?;
        patch.validate()?;

        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(stock) = patch.stock {
            next.stock = stock;
        }
        next.updated_at = self.not_before_updated(at);
        next.version += 1;
        Ok(next)
    }

    /// Soft-delete. Deleting twice is an error, not a no-op.
    ///
    /// `updated_at` is left alone; `deleted_at` records when the product was
    /// removed.
    pub fn mark_deleted(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_active()?;

        let mut next = self.clone();
        next.deleted_at = Some(self.not_before_updated(at));
        next.version += 1;
        Ok(next)
    }

    /// Rebuild a product from its stored document.
    ///
    /// Stored records are re-checked against the field rules and timestamp
    /// ordering; a record that fails is reported as corrupt rather than
    /// silently served.
    pub fn from_document(doc: ProductDocument, version: u64) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();
        rules::check_name(&doc.name, &mut errors);
        rules::check_description(doc.description.as_deref(), &mut errors);
        rules::check_category(&doc.category, &mut errors);
        rules::check_price(doc.price, &mut errors);
        rules::check_stock(doc.stock, &mut errors);
        if !errors.is_empty() {
            return Err(DomainError::invariant(format!(
                "stored product {} has invalid fields: {errors}",
                doc.id
            )));
        }

        if doc.created_at > doc.updated_at {
            return Err(DomainError::invariant(format!(
                "stored product {} has createdAt after updatedAt",
                doc.id
            )));
        }
        if let Some(deleted_at) = doc.deleted_at {
            if deleted_at < doc.updated_at {
                return Err(DomainError::invariant(format!(
                    "stored product {} has deletedAt before updatedAt",
                    doc.id
                )));
            }
        }
        if version == 0 {
            return Err(DomainError::invariant(format!(
                "stored product {} has version 0",
                doc.id
            )));
        }

        Ok(Self {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            category: doc.category,
            price: doc.price,
            stock: doc.stock,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            deleted_at: doc.deleted_at,
            version,
        })
    }

    pub fn to_document(&self) -> ProductDocument {
        ProductDocument {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            price: self.price,
            stock: self.stock,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn state(&self) -> ProductState {
        if self.deleted_at.is_some() {
            ProductState::Deleted
        } else {
            ProductState::Active
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state() == ProductState::Deleted
    }

    pub fn is_active(&self) -> bool {
        self.state() == ProductState::Active
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if self.is_deleted() {
            return Err(DomainError::gone(format!(
                "product {} has been deleted",
                self.id
            )));
        }
        Ok(())
    }

    fn not_before_updated(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        truncate_to_micros(at).max(self.updated_at)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl From<Product> for ProductDocument {
    fn from(value: Product) -> Self {
        ProductDocument {
            id: value.id,
            name: value.name,
            description: value.description,
            category: value.category,
            price: value.price,
            stock: value.stock,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        }
    }
}
