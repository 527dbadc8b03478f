//! Products domain module.
//!
//! This crate contains the catalog's product lifecycle, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Callers supply
//! identifiers and timestamps; the entity decides whether a transition is
//! allowed and what the next state looks like.

pub mod document;
pub mod product;
pub mod rules;

pub use document::ProductDocument;
pub use product::{NewProduct, Product, ProductId, ProductPatch, ProductState};
pub use rules::{CATEGORY_MAX_CHARS, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
