//! Infrastructure layer: storage backends, the product service and
//! configuration.

pub mod config;
pub mod repository;
pub mod service;

pub use config::{Settings, StorageBackend, StorageSettings};
pub use repository::{
    InMemoryProductRepository, PostgresProductRepository, ProductRepository, RepoResult,
    RepositoryError,
};
pub use service::{ProductService, ServiceError, ServiceResult};
