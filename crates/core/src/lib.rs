//! `catalog-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the timestamp policy, optimistic version expectations and the
//! domain error model.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod validation;
pub mod version;

pub use clock::{Clock, ManualClock, SystemClock, truncate_to_micros};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, IdGenerator, RandomIds};
pub use validation::{FieldViolation, ValidationErrors};
pub use version::ExpectedVersion;
