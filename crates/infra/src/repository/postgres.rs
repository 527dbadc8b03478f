//! Postgres-backed product store.
//!
//! Products are kept as JSON documents: one row per product keyed by `id`,
//! with the nine public attributes in a `document JSONB` column. Two columns
//! live beside the document and never leave this module:
//!
//! - `version`: revision counter used for version-checked replace.
//! - `seq`: insertion order for listing.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation) | `23505` | `DuplicateId` | id already stored |
//! | Database (other) | Any other | `Storage` | Constraint or query failures |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! Decoding failures of stored documents map to `InvalidData`.
//!
//! Rows whose document carries a `deletedAt` are never rewritten; `replace`
//! reports them as `Deleted`.
//!
//! The tests in `live` need a reachable database in `DATABASE_URL` and skip
//! otherwise.
//!
//! ## Thread Safety
//!
//! `PostgresProductRepository` is `Send + Sync` and can be shared across
//! tasks. The SQLx pool handles its own connection concurrency.

use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

use catalog_core::{Entity, ExpectedVersion};
use catalog_products::{Product, ProductDocument, ProductId};

use super::r#trait::{ProductRepository, RepoResult, RepositoryError};

/// Index and table setup, run once at startup by [`PostgresProductRepository::ensure_schema`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        version BIGINT NOT NULL CHECK (version > 0),
        document JSONB NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS products_seq_idx ON products (seq)",
    "CREATE INDEX IF NOT EXISTS products_deleted_at_idx ON products ((document->>'deletedAt'))",
    "CREATE INDEX IF NOT EXISTS products_active_idx ON products (seq) WHERE (document->>'deletedAt') IS NULL",
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products ((document->>'category'))",
];

/// Postgres-backed product repository.
#[derive(Debug, Clone)]
pub struct PostgresProductRepository {
    pool: Arc<PgPool>,
}

impl PostgresProductRepository {
    /// Create a repository over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the table and its indexes if they do not exist yet.
    ///
    /// Call once at process startup, not per request.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> RepoResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        info!("product schema ready");
        Ok(())
    }

    /// Stored revision and deletion flag, `None` if the id is unknown.
    async fn stored_state(&self, id: ProductId) -> RepoResult<Option<StoredState>> {
        let row = sqlx::query(
            r#"
            SELECT version, (document->>'deletedAt') IS NOT NULL AS deleted
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stored_state", e))?;

        row.map(|r| {
            let version: i64 = r
                .try_get("version")
                .map_err(|e| RepositoryError::InvalidData(format!("failed to read version: {e}")))?;
            let deleted: bool = r
                .try_get("deleted")
                .map_err(|e| RepositoryError::InvalidData(format!("failed to read deleted flag: {e}")))?;
            Ok(StoredState {
                version: version_from_db(version)?,
                deleted,
            })
        })
        .transpose()
    }
}

#[derive(Debug, Clone, Copy)]
struct StoredState {
    version: u64,
    deleted: bool,
}

#[async_trait::async_trait]
impl ProductRepository for PostgresProductRepository {
    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn insert(&self, product: &Product) -> RepoResult<()> {
        let document = encode_document(product)?;

        sqlx::query("INSERT INTO products (id, version, document) VALUES ($1, $2, $3)")
            .bind(*product.id().as_uuid())
            .bind(version_to_db(product.version())?)
            .bind(&document)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::DuplicateId(product.id())
                } else {
                    map_sqlx_error("insert", e)
                }
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let row = sqlx::query("SELECT document, version FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(decode_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_all_active(&self) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT document, version
            FROM products
            WHERE (document->>'deletedAt') IS NULL
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_all_active", e))?;

        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn find_by_category(&self, category: &str) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT document, version
            FROM products
            WHERE (document->>'category') = $1
                AND (document->>'deletedAt') IS NULL
            ORDER BY seq ASC
            "#,
        )
        .bind(category)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_category", e))?;

        rows.iter().map(decode_row).collect()
    }

    /// Single conditional `UPDATE`: the row changes only if its version is
    /// still the one the caller read and it is not deleted yet. When nothing
    /// changed, a follow-up read classifies the row as missing, deleted or stale.
    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn replace(&self, product: &Product) -> RepoResult<()> {
        let id = product.id();
        let document = encode_document(product)?;
        let expected = ExpectedVersion::preceding(product.version());

        let result = sqlx::query(
            r#"
            UPDATE products
            SET document = $2, version = $3
            WHERE id = $1
                AND version = $4
                AND (document->>'deletedAt') IS NULL
            "#,
        )
        .bind(*id.as_uuid())
        .bind(&document)
        .bind(version_to_db(product.version())?)
        .bind(version_to_db(expected.get())?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.stored_state(id).await? {
            None => Err(RepositoryError::NotFound(id)),
            Some(state) if state.deleted => Err(RepositoryError::Deleted(id)),
            Some(state) => Err(RepositoryError::Conflict {
                id,
                expected,
                actual: state.version,
            }),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn exists(&self, id: ProductId) -> RepoResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1) AS present")
            .bind(*id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?;

        row.try_get::<bool, _>("present")
            .map_err(|e| map_sqlx_error("exists", e))
    }
}

fn encode_document(product: &Product) -> RepoResult<serde_json::Value> {
    serde_json::to_value(product.to_document()).map_err(|e| {
        RepositoryError::InvalidData(format!(
            "failed to encode product {}: {e}",
            product.id()
        ))
    })
}

fn decode_row(row: &PgRow) -> RepoResult<Product> {
    let document: serde_json::Value = row
        .try_get("document")
        .map_err(|e| RepositoryError::InvalidData(format!("failed to read document: {e}")))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| RepositoryError::InvalidData(format!("failed to read version: {e}")))?;

    let doc: ProductDocument = serde_json::from_value(document)
        .map_err(|e| RepositoryError::InvalidData(format!("failed to decode document: {e}")))?;
    Product::from_document(doc, version_from_db(version)?)
        .map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

fn version_to_db(version: u64) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::InvalidData(format!("version {version} out of range")))
}

fn version_from_db(version: i64) -> RepoResult<u64> {
    u64::try_from(version)
        .map_err(|_| RepositoryError::InvalidData(format!("negative version {version}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            RepositoryError::Storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
