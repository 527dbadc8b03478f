//! Product service: lifecycle orchestration over a [`ProductRepository`].
//!
//! The service owns the "now" and "new id" sources and turns repository
//! outcomes into caller-facing errors. The one rule it adds on top of the
//! entity is the NotFound/Gone split: an id that was never stored is
//! `NotFound`, an id whose product was soft-deleted is `Gone`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use catalog_core::{Clock, DomainError, IdGenerator, RandomIds, SystemClock, ValidationErrors};
use catalog_products::{NewProduct, Product, ProductId, ProductPatch};

use crate::repository::{ProductRepository, RepositoryError};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing service error.
///
/// `Storage` deliberately carries no detail; the underlying cause is logged
/// where it is mapped.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Product with id '{0}' not found")]
    NotFound(ProductId),

    #[error("Product with id '{0}' has been deleted")]
    Gone(ProductId),

    #[error("could not allocate a unique id (last tried '{0}')")]
    DuplicateId(ProductId),

    #[error("Product with id '{0}' was modified concurrently")]
    Conflict(ProductId),

    #[error("storage operation failed")]
    Storage,
}

impl ServiceError {
    /// Short machine-readable code, used for error bodies and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Gone(_) => "gone",
            ServiceError::DuplicateId(_) => "duplicate_id",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Storage => "storage_error",
        }
    }
}

fn storage_failure(operation: &'static str, err: RepositoryError) -> ServiceError {
    error!(operation, error = %err, "product storage failure");
    ServiceError::Storage
}

fn entity_failure(id: ProductId, err: DomainError) -> ServiceError {
    match err {
        DomainError::Validation(errors) => ServiceError::Validation(errors),
        DomainError::Gone(_) => ServiceError::Gone(id),
        other => {
            error!(product_id = %id, error = %other, "unexpected entity failure");
            ServiceError::Storage
        }
    }
}

/// Product lifecycle service.
///
/// Holds no state of its own besides its collaborators; share it behind an
/// `Arc` and call it from any number of tasks.
pub struct ProductService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<R> ProductService<R>
where
    R: ProductRepository,
{
    /// Service with the wall clock and random ids.
    pub fn new(repo: R) -> Self {
        Self::with_parts(repo, Arc::new(SystemClock::new()), Arc::new(RandomIds))
    }

    pub fn with_parts(repo: R, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { repo, clock, ids }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validate and store a new product.
    ///
    /// A generated id that collides with a stored one is replaced by a fresh
    /// id once; a second collision fails with [`ServiceError::DuplicateId`].
    #[instrument(level = "debug", skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewProduct) -> ServiceResult<Product> {
        let mut attempts_left = 2;
        loop {
            attempts_left -= 1;
            let id = ProductId::new(self.ids.next_id());
            let product =
                Product::create(input.clone(), id, self.clock.now()).map_err(|e| entity_failure(id, e))?;

            match self.repo.insert(&product).await {
                Ok(()) => {
                    info!(product_id = %id, category = %product.category(), "product created");
                    return Ok(product);
                }
                Err(RepositoryError::DuplicateId(dup)) if attempts_left > 0 => {
                    warn!(product_id = %dup, "generated id already stored; retrying with a fresh id");
                }
                Err(RepositoryError::DuplicateId(dup)) => {
                    error!(product_id = %dup, "generated id collided twice");
                    return Err(ServiceError::DuplicateId(dup));
                }
                Err(e) => return Err(storage_failure("create", e)),
            }
        }
    }

    /// Fetch one active product.
    #[instrument(level = "debug", skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> ServiceResult<Product> {
        self.load_active(id).await
    }

    /// Snapshot of every active product, in insertion order.
    #[instrument(level = "debug", skip(self))]
    pub async fn list(&self) -> ServiceResult<Vec<Product>> {
        self.repo
            .find_all_active()
            .await
            .map_err(|e| storage_failure("list", e))
    }

    /// Active products in one category.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_by_category(&self, category: &str) -> ServiceResult<Vec<Product>> {
        self.repo
            .find_by_category(category)
            .await
            .map_err(|e| storage_failure("list_by_category", e))
    }

    /// Apply a partial update to an active product.
    #[instrument(level = "debug", skip(self, patch), fields(product_id = %id))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        let current = self.load_active(id).await?;
        let next = current
            .apply_update(patch, self.clock.now())
            .map_err(|e| entity_failure(id, e))?;

        self.store_transition(&next, "update").await?;
        info!(product_id = %id, "product updated");
        Ok(next)
    }

    /// Soft-delete an active product and return it in its deleted state.
    #[instrument(level = "debug", skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> ServiceResult<Product> {
        let current = self.load_active(id).await?;
        let deleted = current
            .mark_deleted(self.clock.now())
            .map_err(|e| entity_failure(id, e))?;

        self.store_transition(&deleted, "delete").await?;
        info!(product_id = %id, "product deleted");
        Ok(deleted)
    }

    async fn load_active(&self, id: ProductId) -> ServiceResult<Product> {
        match self.repo.find_by_id(id).await {
            Ok(Some(product)) if product.is_deleted() => Err(ServiceError::Gone(id)),
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(ServiceError::NotFound(id)),
            Err(e) => Err(storage_failure("find_by_id", e)),
        }
    }

    /// Version-checked replace. A lost race against a delete reads as `Gone`,
    /// against any other write as `Conflict`.
    async fn store_transition(&self, next: &Product, operation: &'static str) -> ServiceResult<()> {
        let id = next.id();
        match self.repo.replace(next).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict { expected, actual, .. }) => {
                warn!(product_id = %id, ?expected, actual, operation, "concurrent modification");
                match self.repo.find_by_id(id).await {
                    Ok(Some(stored)) if stored.is_deleted() => Err(ServiceError::Gone(id)),
                    Ok(Some(_)) => Err(ServiceError::Conflict(id)),
                    Ok(None) => Err(ServiceError::NotFound(id)),
                    Err(e) => Err(storage_failure(operation, e)),
                }
            }
            Err(RepositoryError::Deleted(_)) => {
                warn!(product_id = %id, operation, "write against a deleted product");
                Err(ServiceError::Gone(id))
            }
            Err(RepositoryError::NotFound(_)) => Err(ServiceError::NotFound(id)),
            Err(e) => Err(storage_failure(operation, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use catalog_core::{EntityId, ManualClock};
    use chrono::{DateTime, Duration, Utc};

    use crate::repository::InMemoryProductRepository;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_770_000_000, 0).unwrap()
    }

    fn mouse() -> NewProduct {
        NewProduct {
            name: "Wireless Mouse".to_string(),
            description: Some("Ergonomic wireless mouse".to_string()),
            category: "Electronics".to_string(),
            price: 29.99,
            stock: 150,
        }
    }

    fn service() -> (ProductService<Arc<InMemoryProductRepository>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let svc = ProductService::with_parts(
            Arc::new(InMemoryProductRepository::new()),
            clock.clone(),
            Arc::new(RandomIds),
        );
        (svc, clock)
    }

    /// Hands out a scripted sequence of ids, then random ones.
    struct ScriptedIds(Mutex<Vec<EntityId>>);

    impl IdGenerator for ScriptedIds {
        fn next_id(&self) -> EntityId {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(EntityId::new)
        }
    }

    #[tokio::test]
    async fn wireless_mouse_lifecycle() {
        let (svc, clock) = service();

        let created = svc.create(mouse()).await.unwrap();
        assert!(created.is_active());
        assert_eq!(created.created_at(), t0());
        assert_eq!(created.updated_at(), t0());
        assert_eq!(created.deleted_at(), None);

        clock.advance(Duration::seconds(5));
        let updated = svc
            .update(
                created.id(),
                ProductPatch { price: Some(24.99), stock: Some(140), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.price(), 24.99);
        assert_eq!(updated.stock(), 140);
        assert_eq!(updated.name(), "Wireless Mouse");
        assert_eq!(updated.created_at(), t0());
        assert!(updated.updated_at() > created.updated_at());

        clock.advance(Duration::seconds(5));
        let deleted = svc.delete(created.id()).await.unwrap();
        assert!(deleted.is_deleted());
        assert!(deleted.deleted_at().unwrap() >= deleted.updated_at());

        assert!(matches!(svc.get(created.id()).await, Err(ServiceError::Gone(id)) if id == created.id()));
        assert!(svc.list().await.unwrap().is_empty());

        let unknown = ProductId::generate();
        assert!(matches!(svc.get(unknown).await, Err(ServiceError::NotFound(id)) if id == unknown));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_storage() {
        let (svc, _) = service();
        let mut input = mouse();
        input.price = 0.0;
        input.name = "   ".to_string();

        let err = svc.create(input).await.unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.contains_field("price"));
                assert!(errors.contains_field("name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(svc.repository().is_empty());
    }

    #[tokio::test]
    async fn deleting_twice_is_gone() {
        let (svc, _) = service();
        let p = svc.create(mouse()).await.unwrap();
        svc.delete(p.id()).await.unwrap();

        assert!(matches!(svc.delete(p.id()).await, Err(ServiceError::Gone(_))));
        assert!(matches!(
            svc.delete(ProductId::generate()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_after_delete_is_gone_and_leaves_record_alone() {
        let (svc, clock) = service();
        let p = svc.create(mouse()).await.unwrap();
        let deleted = svc.delete(p.id()).await.unwrap();

        clock.advance(Duration::minutes(1));
        let err = svc
            .update(p.id(), ProductPatch { stock: Some(1), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Gone(_)));

        let stored = svc.repository().find_by_id(p.id()).await.unwrap().unwrap();
        assert_eq!(stored, deleted);
    }

    #[tokio::test]
    async fn update_validation_failure_keeps_stored_state() {
        let (svc, _) = service();
        let p = svc.create(mouse()).await.unwrap();

        let err = svc
            .update(p.id(), ProductPatch { stock: Some(-1), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.contains_field("stock")));
        assert_eq!(svc.get(p.id()).await.unwrap(), p);
    }

    #[tokio::test]
    async fn empty_patch_only_touches_updated_at() {
        let (svc, clock) = service();
        let p = svc.create(mouse()).await.unwrap();

        clock.advance(Duration::seconds(1));
        let touched = svc.update(p.id(), ProductPatch::default()).await.unwrap();

        assert_eq!(touched.to_document().updated_at, t0() + Duration::seconds(1));
        let mut before = p.to_document();
        before.updated_at = touched.updated_at();
        assert_eq!(touched.to_document(), before);
    }

    #[tokio::test]
    async fn list_counts_active_only() {
        let (svc, _) = service();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut input = mouse();
            input.name = format!("Mouse {i}");
            ids.push(svc.create(input).await.unwrap().id());
        }
        svc.delete(ids[0]).await.unwrap();
        svc.delete(ids[3]).await.unwrap();

        let listed: Vec<ProductId> = svc.list().await.unwrap().iter().map(|p| p.id()).collect();
        assert_eq!(listed, vec![ids[1], ids[2], ids[4]]);
    }

    #[tokio::test]
    async fn list_by_category_filters_active() {
        let (svc, _) = service();
        let a = svc.create(mouse()).await.unwrap();
        let mut book = mouse();
        book.category = "Books".to_string();
        svc.create(book).await.unwrap();

        assert_eq!(svc.list_by_category("Electronics").await.unwrap().len(), 1);
        svc.delete(a.id()).await.unwrap();
        assert!(svc.list_by_category("Electronics").await.unwrap().is_empty());
        assert!(svc.list_by_category("Toys").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_ids_are_unique() {
        let (svc, _) = service();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(svc.create(mouse()).await.unwrap().id()));
        }
    }

    #[tokio::test]
    async fn duplicate_id_is_retried_once_with_a_fresh_id() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let first = ProductService::new(repo.clone()).create(mouse()).await.unwrap();

        // Popped from the back: the colliding id comes out first.
        let ids = ScriptedIds(Mutex::new(vec![first.id().0]));
        let svc = ProductService::with_parts(
            repo.clone(),
            Arc::new(ManualClock::new(t0())),
            Arc::new(ids),
        );

        let second = svc.create(mouse()).await.unwrap();
        assert_ne!(second.id(), first.id());
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn second_collision_fails_with_duplicate_id() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let existing = ProductService::new(repo.clone()).create(mouse()).await.unwrap();

        let ids = ScriptedIds(Mutex::new(vec![existing.id().0, existing.id().0]));
        let svc = ProductService::with_parts(
            repo.clone(),
            Arc::new(ManualClock::new(t0())),
            Arc::new(ids),
        );

        let err = svc.create(mouse()).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateId(id) if id == existing.id()));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_disjoint_updates_apply_atomically() {
        let svc = Arc::new(ProductService::new(Arc::new(InMemoryProductRepository::new())));
        let p = svc.create(mouse()).await.unwrap();

        let price_svc = svc.clone();
        let stock_svc = svc.clone();
        let id = p.id();
        let price = tokio::spawn(async move {
            price_svc
                .update(id, ProductPatch { price: Some(19.99), ..Default::default() })
                .await
        });
        let stock = tokio::spawn(async move {
            stock_svc
                .update(id, ProductPatch { stock: Some(7), ..Default::default() })
                .await
        });
        let price = price.await.unwrap();
        let stock = stock.await.unwrap();

        for outcome in [&price, &stock] {
            assert!(matches!(outcome, Ok(_) | Err(ServiceError::Conflict(_))));
        }
        assert!(price.is_ok() || stock.is_ok());

        let stored = svc.get(id).await.unwrap();
        assert_eq!(stored.price() == 19.99, price.is_ok());
        assert_eq!(stored.stock() == 7, stock.is_ok());
        assert_eq!(stored.name(), "Wireless Mouse");
    }

    #[tokio::test]
    async fn stale_write_against_a_delete_reads_as_gone() {
        let (svc, _) = service();
        let p = svc.create(mouse()).await.unwrap();

        // Read, then lose the race to a delete.
        let stale = p
            .apply_update(ProductPatch { stock: Some(3), ..Default::default() }, t0())
            .unwrap();
        svc.delete(p.id()).await.unwrap();

        let err = svc.store_transition(&stale, "update").await.unwrap_err();
        assert!(matches!(err, ServiceError::Gone(_)));
    }

    #[test]
    fn storage_errors_are_opaque() {
        let err = storage_failure("list", RepositoryError::Storage("password=hunter2".to_string()));
        assert_eq!(err.to_string(), "storage operation failed");
        assert_eq!(err.code(), "storage_error");
    }
}
