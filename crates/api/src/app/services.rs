//! Infrastructure wiring: picks the storage backend and builds the service.

use std::sync::Arc;

use anyhow::Context;

use catalog_infra::{
    InMemoryProductRepository, PostgresProductRepository, ProductRepository, ProductService,
    Settings, StorageBackend,
};

pub type DynProductRepository = Arc<dyn ProductRepository>;

/// Everything a handler needs, shared through an `Extension`.
pub struct AppServices {
    pub settings: Settings,
    pub products: ProductService<DynProductRepository>,
}

impl AppServices {
    pub fn new(settings: Settings, repo: DynProductRepository) -> Self {
        Self {
            settings,
            products: ProductService::new(repo),
        }
    }

    /// Services over a fresh in-memory store, whatever `settings.storage` says.
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(settings, Arc::new(InMemoryProductRepository::new()))
    }
}

/// Build services for the configured backend.
///
/// For Postgres this opens the pool and creates the schema, so it runs once
/// at startup.
pub async fn build_services(settings: Settings) -> anyhow::Result<AppServices> {
    let repo: DynProductRepository = match settings.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory product storage; data is lost on restart");
            Arc::new(InMemoryProductRepository::new())
        }
        StorageBackend::Postgres => {
            let url = settings
                .storage
                .database_url
                .as_deref()
                .context("storage.database_url is required for the postgres backend")?;
            let repo = PostgresProductRepository::connect(url, settings.storage.max_connections)
                .await
                .context("failed to connect to postgres")?;
            repo.ensure_schema()
                .await
                .context("failed to prepare product schema")?;
            tracing::info!(max_connections = settings.storage.max_connections, "postgres storage ready");
            Arc::new(repo)
        }
    };

    Ok(AppServices::new(settings, repo))
}
