use std::sync::Arc;

use thiserror::Error;

use catalog_core::ExpectedVersion;
use catalog_products::{Product, ProductId};

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository operation error.
///
/// These are **storage-level** outcomes; lifecycle rules (deleted vs active)
/// are decided by the service, not here.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("product already exists: {0}")]
    DuplicateId(ProductId),

    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// The stored record is soft-deleted; it can no longer be replaced.
    #[error("product is deleted: {0}")]
    Deleted(ProductId),

    /// The stored revision moved since the caller read it.
    #[error("optimistic concurrency check failed for {id} (expected: {expected}, actual: v{actual})")]
    Conflict {
        id: ProductId,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// A stored record could not be decoded or breaks entity invariants.
    #[error("invalid stored product: {0}")]
    InvalidData(String),

    /// Backend unreachable or the operation failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable product storage.
///
/// ## Semantics
///
/// - `insert` fails with `DuplicateId` if the id is already stored.
/// - `find_by_id` returns the record whatever its deletion state.
/// - `find_all_active` returns a snapshot of records with no `deletedAt`, in
///   insertion order.
/// - `replace` swaps the whole record keyed by id. It is version-checked: the
///   stored revision must be exactly one behind `product`'s revision, so two
///   writers that read the same revision cannot both win. A stored record
///   that is already deleted is never replaced (`Deleted`), so `deletedAt`
///   cannot be cleared or moved through storage.
///
/// Implementations must be `Send + Sync`; one instance is shared by all
/// concurrent requests.
#[async_trait::async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> RepoResult<()>;

    async fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>>;

    async fn find_all_active(&self) -> RepoResult<Vec<Product>>;

    /// Active products in one category, insertion order.
    async fn find_by_category(&self, category: &str) -> RepoResult<Vec<Product>>;

    async fn replace(&self, product: &Product) -> RepoResult<()>;

    async fn exists(&self, id: ProductId) -> RepoResult<bool>;
}

#[async_trait::async_trait]
impl<R> ProductRepository for Arc<R>
where
    R: ProductRepository + ?Sized,
{
    async fn insert(&self, product: &Product) -> RepoResult<()> {
        (**self).insert(product).await
    }

    async fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        (**self).find_by_id(id).await
    }

    async fn find_all_active(&self) -> RepoResult<Vec<Product>> {
        (**self).find_all_active().await
    }

    async fn find_by_category(&self, category: &str) -> RepoResult<Vec<Product>> {
        (**self).find_by_category(category).await
    }

    async fn replace(&self, product: &Product) -> RepoResult<()> {
        (**self).replace(product).await
    }

    async fn exists(&self, id: ProductId) -> RepoResult<bool> {
        (**self).exists(id).await
    }
}
