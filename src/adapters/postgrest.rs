use crate::domain::model::{CogsScheduleEntry, CogsSku, RevenueSkuRule};
use crate::domain::ports::SkuCatalog;
use crate::utils::error::{Result, WaterfallError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REVENUE_SKUS_TABLE: &str = "revenue_skus";
const COGS_SKUS_TABLE: &str = "cogs_skus";
const COGS_BREAKDOWN_TABLE: &str = "cogs_breakdown";

/// SKU catalog backed by a PostgREST endpoint (e.g. `https://<project>.supabase.co/rest/v1`).
///
/// Reads the `revenue_skus`, `cogs_skus` and `cogs_breakdown` tables. Any
/// non-success status is reported as `UpstreamFailure`; retries are left to
/// the caller.
#[derive(Debug, Clone)]
pub struct PostgrestCatalog {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl PostgrestCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        // 未展開的 ${VAR} 視為沒有設定
        if !api_key.is_empty() && !api_key.starts_with("${") {
            self.api_key = Some(api_key);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, table);
        tracing::debug!("Making catalog request to: {} {:?}", url, query);

        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header("Accept", "application/json");

        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Catalog response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WaterfallError::UpstreamFailure {
                status: status.as_u16(),
                message: error_message(table, &body),
            });
        }

        Ok(response.json::<Vec<T>>().await?)
    }
}

/// PostgREST errors carry a JSON body with a `message` field.
fn error_message(table: &str, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        format!("Failed to fetch {}", table)
    } else {
        format!("Failed to fetch {}: {}", table, detail)
    }
}

#[async_trait]
impl SkuCatalog for PostgrestCatalog {
    async fn get_revenue_sku(&self, sku_id: &str) -> Result<RevenueSkuRule> {
        let rows: Vec<RevenueSkuRule> = self
            .fetch_rows(
                REVENUE_SKUS_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("sku_id", format!("eq.{}", sku_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| WaterfallError::RevenueSkuNotFound {
                sku_id: sku_id.to_string(),
            })
    }

    async fn get_cogs_schedule(&self, cogs_sku_id: &str) -> Result<Vec<CogsScheduleEntry>> {
        self.fetch_rows(
            COGS_BREAKDOWN_TABLE,
            &[
                ("select", "month_number,cogs_amount,phase".to_string()),
                ("cogs_sku_id", format!("eq.{}", cogs_sku_id)),
                ("order", "month_number.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_revenue_skus(&self) -> Result<Vec<RevenueSkuRule>> {
        self.fetch_rows(
            REVENUE_SKUS_TABLE,
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn list_cogs_skus(&self) -> Result<Vec<CogsSku>> {
        self.fetch_rows(
            COGS_SKUS_TABLE,
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }
}
