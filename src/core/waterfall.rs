use crate::core::cogs::{
    accumulate_cogs, accumulate_cogs_for_schedule, resolve_cogs_schedule, CogsResolution,
};
use crate::core::expander::expand;
use crate::core::metrics::derive;
use crate::core::revenue::{accumulate_revenue, accumulate_revenue_for_rule};
use crate::domain::model::{
    CogsScheduleEntry, Cohort, ExpandedCohort, MarginDetail, MonthSeries, MonthlyDetail,
    RevenueSkuRule, ScenarioRequest, WaterfallReport, DEFAULT_HORIZON, MAX_HORIZON,
};
use crate::domain::ports::SkuCatalog;
use crate::utils::currency::{format_currency, format_margin};
use crate::utils::error::{Result, WaterfallError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const FIXED_SCENARIO_SKU: &str = "R10";
pub const FIXED_SCENARIO_NAME: &str = "R10 waterfall";
/// `(start_month, quantity)` cohorts of the fixed scenario.
pub const FIXED_SCENARIO_COHORTS: [(u32, i64); 4] = [(1, 10), (2, 20), (3, 0), (4, 40)];

const DEFAULT_CONCURRENT_REQUESTS: usize = 4;

type ResolvedSku = (RevenueSkuRule, Vec<CogsScheduleEntry>);

pub struct WaterfallEngine<C: SkuCatalog> {
    catalog: Arc<C>,
    concurrent_requests: usize,
}

impl<C: SkuCatalog + 'static> WaterfallEngine<C> {
    pub fn new(catalog: C) -> Self {
        Self::from_shared(Arc::new(catalog))
    }

    pub fn from_shared(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
        }
    }

    /// Upper bound on catalog lookups in flight during a dynamic run.
    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The built-in R10 scenario over 36 months. Missing COGS data is an error here.
    pub async fn run_fixed_scenario(&self) -> Result<WaterfallReport> {
        tracing::info!("🚀 Running fixed scenario for revenue SKU {}", FIXED_SCENARIO_SKU);

        let rule = self.catalog.get_revenue_sku(FIXED_SCENARIO_SKU).await?;
        let schedule =
            resolve_cogs_schedule(self.catalog.as_ref(), &rule, CogsResolution::Strict).await?;

        let cohorts: Vec<Cohort> = FIXED_SCENARIO_COHORTS
            .iter()
            .map(|&(start_month, quantity)| Cohort::new(FIXED_SCENARIO_SKU, start_month, quantity))
            .collect();

        let revenue = accumulate_revenue_for_rule(&cohorts, &rule, DEFAULT_HORIZON);
        let cogs = accumulate_cogs_for_schedule(&cohorts, &schedule, DEFAULT_HORIZON);

        tracing::info!(
            "✅ Fixed scenario complete: revenue {}, COGS {}",
            format_currency(revenue.total()),
            format_currency(cogs.total())
        );

        Ok(build_report(FIXED_SCENARIO_NAME, &revenue, &cogs, vec![rule]))
    }

    /// A caller-defined multi-SKU scenario. SKUs without COGS data contribute zero cost.
    pub async fn run_dynamic_scenario(&self, request: &ScenarioRequest) -> Result<WaterfallReport> {
        let horizon = request.horizon();
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(WaterfallError::ValidationError {
                message: format!("horizon must be between 1 and {} (got {})", MAX_HORIZON, horizon),
            });
        }
        let sku_ids: BTreeSet<&str> = request.skus.iter().map(|item| item.sku_id.as_str()).collect();

        tracing::info!(
            "🚀 Running scenario '{}': {} items, {} distinct SKUs, {} months",
            request.name,
            request.skus.len(),
            sku_ids.len(),
            horizon
        );

        let resolved = self
            .resolve_skus(sku_ids.into_iter().map(str::to_string).collect())
            .await?;

        let mut rules = HashMap::with_capacity(resolved.len());
        let mut schedules = HashMap::with_capacity(resolved.len());
        let mut revenue_skus = Vec::with_capacity(resolved.len());
        for (rule, schedule) in resolved {
            schedules.insert(rule.sku_id.clone(), schedule);
            rules.insert(rule.sku_id.clone(), rule.clone());
            revenue_skus.push(rule);
        }

        let cohorts: Vec<Cohort> = request
            .skus
            .iter()
            .flat_map(|item| expand(item, horizon))
            .map(ExpandedCohort::into_cohort)
            .collect();
        tracing::debug!("Expanded {} request items into {} cohorts", request.skus.len(), cohorts.len());

        let revenue = accumulate_revenue(&cohorts, &rules, horizon);
        let cogs = accumulate_cogs(&cohorts, &schedules, horizon);

        tracing::info!(
            "✅ Scenario '{}' complete: revenue {}, COGS {}",
            request.name,
            format_currency(revenue.total()),
            format_currency(cogs.total())
        );

        Ok(build_report(&request.name, &revenue, &cogs, revenue_skus))
    }

    /// Fetches rules and schedules concurrently; all lookups finish before any result is used.
    /// Returning early drops the `JoinSet`, which aborts the remaining lookups.
    async fn resolve_skus(&self, sku_ids: Vec<String>) -> Result<Vec<ResolvedSku>> {
        let permits = Arc::new(Semaphore::new(self.concurrent_requests));
        let mut lookups = JoinSet::new();

        for sku_id in sku_ids {
            let catalog = Arc::clone(&self.catalog);
            let permits = Arc::clone(&permits);
            lookups.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    WaterfallError::ProcessingError {
                        message: format!("catalog lookup permit closed: {}", e),
                    }
                })?;

                tracing::debug!("Resolving revenue SKU {}", sku_id);
                let rule = catalog.get_revenue_sku(&sku_id).await?;
                let schedule =
                    resolve_cogs_schedule(catalog.as_ref(), &rule, CogsResolution::Tolerant)
                        .await?;
                Ok::<ResolvedSku, WaterfallError>((rule, schedule))
            });
        }

        let mut resolved = Vec::with_capacity(lookups.len());
        while let Some(joined) = lookups.join_next().await {
            let sku = joined.map_err(|e| WaterfallError::ProcessingError {
                message: format!("catalog lookup task failed: {}", e),
            })??;
            resolved.push(sku);
        }

        resolved.sort_by(|(a, _), (b, _)| a.sku_id.cmp(&b.sku_id));
        tracing::info!("📦 Resolved {} revenue SKUs", resolved.len());
        Ok(resolved)
    }
}

/// Pairs the raw and derived series with their display strings.
pub fn build_report(
    scenario_name: &str,
    revenue: &MonthSeries,
    cogs: &MonthSeries,
    revenue_skus: Vec<RevenueSkuRule>,
) -> WaterfallReport {
    let metrics = derive(revenue, cogs);

    WaterfallReport {
        scenario_name: scenario_name.to_string(),
        horizon: revenue.horizon(),
        monthly_totals: revenue.values().to_vec(),
        formatted_totals: revenue.values().iter().map(|v| format_currency(*v)).collect(),
        monthly_details: monthly_details(revenue),
        monthly_cogs_details: monthly_details(cogs),
        monthly_gross_income_details: monthly_details(&metrics.gross_income),
        monthly_profit_margin_details: metrics
            .margin
            .iter()
            .map(|(month, margin_percent)| MarginDetail {
                month,
                margin_percent,
                formatted_margin: format_margin(margin_percent),
            })
            .collect(),
        monthly_cumulative_gross_profit_details: monthly_details(&metrics.cumulative_gross_profit),
        revenue_skus,
    }
}

fn monthly_details(series: &MonthSeries) -> Vec<MonthlyDetail> {
    series
        .iter()
        .map(|(month, total)| MonthlyDetail {
            month,
            total,
            formatted_total: format_currency(total),
        })
        .collect()
}
