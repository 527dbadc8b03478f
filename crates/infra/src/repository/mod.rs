//! Product storage boundary.
//!
//! The service talks to storage only through [`ProductRepository`]; backends
//! are swappable without touching lifecycle rules.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryProductRepository;
pub use postgres::PostgresProductRepository;
pub use r#trait::{ProductRepository, RepoResult, RepositoryError};
