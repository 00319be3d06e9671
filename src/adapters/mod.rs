// Adapters layer: concrete implementations of the domain ports (catalog, storage).

pub mod catalog;
pub mod postgrest;
pub mod storage;

pub use catalog::{CatalogFixture, InMemoryCatalog};
pub use postgrest::PostgrestCatalog;
pub use storage::LocalStorage;

use crate::domain::model::{CogsScheduleEntry, CogsSku, RevenueSkuRule};
use crate::domain::ports::SkuCatalog;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Catalog selected at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredCatalog {
    Postgrest(PostgrestCatalog),
    Memory(InMemoryCatalog),
}

impl ConfiguredCatalog {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfiguredCatalog::Postgrest(_) => "postgrest",
            ConfiguredCatalog::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl SkuCatalog for ConfiguredCatalog {
    async fn get_revenue_sku(&self, sku_id: &str) -> Result<RevenueSkuRule> {
        match self {
            ConfiguredCatalog::Postgrest(catalog) => catalog.get_revenue_sku(sku_id).await,
            ConfiguredCatalog::Memory(catalog) => catalog.get_revenue_sku(sku_id).await,
        }
    }

    async fn get_cogs_schedule(&self, cogs_sku_id: &str) -> Result<Vec<CogsScheduleEntry>> {
        match self {
            ConfiguredCatalog::Postgrest(catalog) => catalog.get_cogs_schedule(cogs_sku_id).await,
            ConfiguredCatalog::Memory(catalog) => catalog.get_cogs_schedule(cogs_sku_id).await,
        }
    }

    async fn list_revenue_skus(&self) -> Result<Vec<RevenueSkuRule>> {
        match self {
            ConfiguredCatalog::Postgrest(catalog) => catalog.list_revenue_skus().await,
            ConfiguredCatalog::Memory(catalog) => catalog.list_revenue_skus().await,
        }
    }

    async fn list_cogs_skus(&self) -> Result<Vec<CogsSku>> {
        match self {
            ConfiguredCatalog::Postgrest(catalog) => catalog.list_cogs_skus().await,
            ConfiguredCatalog::Memory(catalog) => catalog.list_cogs_skus().await,
        }
    }
}
