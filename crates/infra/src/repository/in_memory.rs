use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use catalog_core::{Entity, ExpectedVersion};
use catalog_products::{Product, ProductId};

use super::r#trait::{ProductRepository, RepoResult, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    /// Records in insertion order.
    records: Vec<Product>,
    /// Unique index: id -> position in `records`.
    by_id: HashMap<ProductId, usize>,
    /// Ids whose record carries a `deletedAt`.
    deleted: HashSet<ProductId>,
    /// category -> positions in `records`.
    by_category: HashMap<String, Vec<usize>>,
}

impl Tables {
    fn is_active(&self, product: &Product) -> bool {
        !self.deleted.contains(&product.id())
    }

    fn unindex_category(&mut self, category: &str, pos: usize) {
        if let Some(positions) = self.by_category.get_mut(category) {
            positions.retain(|p| *p != pos);
            if positions.is_empty() {
                self.by_category.remove(category);
            }
        }
    }

    fn index_category(&mut self, category: &str, pos: usize) {
        let positions = self.by_category.entry(category.to_string()).or_default();
        // Keep positions sorted so category scans stay in insertion order.
        if let Err(at) = positions.binary_search(&pos) {
            positions.insert(at, pos);
        }
    }
}

/// In-memory product store.
///
/// Intended for tests/dev. All reads and writes go through one lock, so every
/// operation (index maintenance included) is atomic per call.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    tables: RwLock<Tables>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, deleted ones included.
    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: &Product) -> RepoResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let id = product.id();
        if tables.by_id.contains_key(&id) {
            return Err(RepositoryError::DuplicateId(id));
        }

        let pos = tables.records.len();
        tables.records.push(product.clone());
        tables.by_id.insert(id, pos);
        if product.is_deleted() {
            tables.deleted.insert(id);
        }
        tables.index_category(product.category(), pos);
        Ok(())
    }

    async fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.by_id.get(&id).map(|pos| tables.records[*pos].clone()))
    }

    async fn find_all_active(&self) -> RepoResult<Vec<Product>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .records
            .iter()
            .filter(|p| tables.is_active(p))
            .cloned()
            .collect())
    }

    async fn find_by_category(&self, category: &str) -> RepoResult<Vec<Product>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(positions) = tables.by_category.get(category) else {
            return Ok(vec![]);
        };
        Ok(positions
            .iter()
            .map(|pos| &tables.records[*pos])
            .filter(|p| tables.is_active(p))
            .cloned()
            .collect())
    }

    async fn replace(&self, product: &Product) -> RepoResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let id = product.id();
        let pos = *tables.by_id.get(&id).ok_or(RepositoryError::NotFound(id))?;
        if tables.deleted.contains(&id) {
            return Err(RepositoryError::Deleted(id));
        }

        let expected = ExpectedVersion::preceding(product.version());
        let actual = tables.records[pos].version();
        if !expected.matches(actual) {
            return Err(RepositoryError::Conflict {
                id,
                expected,
                actual,
            });
        }

        let old_category = tables.records[pos].category().to_string();
        if old_category != product.category() {
            tables.unindex_category(&old_category, pos);
            tables.index_category(product.category(), pos);
        }
        if product.is_deleted() {
            tables.deleted.insert(id);
        }
        tables.records[pos] = product.clone();
        Ok(())
    }

    async fn exists(&self, id: ProductId) -> RepoResult<bool> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.by_id.contains_key(&id))
    }
}
