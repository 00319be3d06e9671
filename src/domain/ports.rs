use crate::domain::model::{CogsScheduleEntry, CogsSku, RevenueSkuRule};
use crate::utils::error::{Result, WaterfallError};
use async_trait::async_trait;

/// Read-only access to SKU master data.
#[async_trait]
pub trait SkuCatalog: Send + Sync {
    async fn get_revenue_sku(&self, sku_id: &str) -> Result<RevenueSkuRule>;

    /// Schedule rows of a COGS SKU ordered by `month_number`; empty when it has none.
    async fn get_cogs_schedule(&self, cogs_sku_id: &str) -> Result<Vec<CogsScheduleEntry>>;

    /// Distinguishes an unknown revenue SKU (`RevenueSkuNotFound`) from a
    /// revenue SKU without a COGS link (`CogsLinkNotFound`). An existing link
    /// with no rows returns an empty list.
    async fn get_cogs_schedule_for_revenue_sku(
        &self,
        revenue_sku_id: &str,
    ) -> Result<Vec<CogsScheduleEntry>> {
        let rule = self.get_revenue_sku(revenue_sku_id).await?;
        let cogs_sku_id = rule
            .cogs_sku_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WaterfallError::CogsLinkNotFound {
                sku_id: revenue_sku_id.to_string(),
            })?;
        self.get_cogs_schedule(&cogs_sku_id).await
    }

    /// All revenue SKUs, newest first.
    async fn list_revenue_skus(&self) -> Result<Vec<RevenueSkuRule>>;

    /// All COGS SKUs, newest first.
    async fn list_cogs_skus(&self) -> Result<Vec<CogsSku>>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn catalog_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn concurrent_requests(&self) -> usize;
    /// ZIP archive name when the report should be bundled.
    fn archive_name(&self) -> Option<&str>;
}
