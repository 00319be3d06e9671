use crate::domain::model::{CogsBreakdownRow, CogsScheduleEntry, CogsSku, RevenueSkuRule};
use crate::domain::ports::SkuCatalog;
use crate::utils::error::{Result, WaterfallError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Catalog contents as stored in a fixture file, one list per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub revenue_skus: Vec<RevenueSkuRule>,
    #[serde(default)]
    pub cogs_skus: Vec<CogsSku>,
    #[serde(default)]
    pub cogs_breakdown: Vec<CogsBreakdownRow>,
}

/// SKU catalog held in memory. Used for fixtures, tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    revenue_skus: HashMap<String, RevenueSkuRule>,
    cogs_skus: HashMap<String, CogsSku>,
    schedules: HashMap<String, Vec<CogsScheduleEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revenue_sku(mut self, rule: RevenueSkuRule) -> Self {
        self.revenue_skus.insert(rule.sku_id.clone(), rule);
        self
    }

    pub fn with_cogs_sku(mut self, sku_id: &str, sku_name: &str) -> Self {
        self.cogs_skus.insert(
            sku_id.to_string(),
            CogsSku {
                sku_id: sku_id.to_string(),
                sku_name: sku_name.to_string(),
                description: None,
                created_at: None,
            },
        );
        self
    }

    /// Adds schedule rows for a COGS SKU, registering the SKU if unknown.
    pub fn with_cogs_schedule(mut self, cogs_sku_id: &str, entries: Vec<CogsScheduleEntry>) -> Self {
        if !self.cogs_skus.contains_key(cogs_sku_id) {
            self = self.with_cogs_sku(cogs_sku_id, "");
        }
        self.schedules
            .entry(cogs_sku_id.to_string())
            .or_default()
            .extend(entries);
        self
    }

    pub fn from_fixture(fixture: CatalogFixture) -> Self {
        let mut catalog = Self::new();
        for rule in fixture.revenue_skus {
            catalog = catalog.with_revenue_sku(rule);
        }
        for sku in fixture.cogs_skus {
            catalog.cogs_skus.insert(sku.sku_id.clone(), sku);
        }
        for row in fixture.cogs_breakdown {
            catalog = catalog.with_cogs_schedule(&row.cogs_sku_id, vec![row.entry()]);
        }
        catalog
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let fixture: CatalogFixture = serde_json::from_str(content)?;
        Ok(Self::from_fixture(fixture))
    }

    /// 從 JSON fixture 檔案載入目錄
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let catalog = Self::from_json_str(&content)?;
        tracing::debug!(
            "Loaded catalog fixture {}: {} revenue SKUs, {} COGS SKUs",
            path.as_ref().display(),
            catalog.revenue_skus.len(),
            catalog.cogs_skus.len()
        );
        Ok(catalog)
    }
}

#[async_trait]
impl SkuCatalog for InMemoryCatalog {
    async fn get_revenue_sku(&self, sku_id: &str) -> Result<RevenueSkuRule> {
        self.revenue_skus
            .get(sku_id)
            .cloned()
            .ok_or_else(|| WaterfallError::RevenueSkuNotFound {
                sku_id: sku_id.to_string(),
            })
    }

    async fn get_cogs_schedule(&self, cogs_sku_id: &str) -> Result<Vec<CogsScheduleEntry>> {
        let mut entries = self.schedules.get(cogs_sku_id).cloned().unwrap_or_default();
        entries.sort_by_key(|entry| entry.month_number);
        Ok(entries)
    }

    async fn list_revenue_skus(&self) -> Result<Vec<RevenueSkuRule>> {
        let mut skus: Vec<_> = self.revenue_skus.values().cloned().collect();
        skus.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.sku_id.cmp(&b.sku_id)));
        Ok(skus)
    }

    async fn list_cogs_skus(&self) -> Result<Vec<CogsSku>> {
        let mut skus: Vec<_> = self.cogs_skus.values().cloned().collect();
        skus.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.sku_id.cmp(&b.sku_id)));
        Ok(skus)
    }
}
