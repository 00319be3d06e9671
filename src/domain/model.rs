use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HORIZON: u32 = 36;
pub const MAX_HORIZON: u32 = 600;

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses catalog timestamps with or without an offset (`2025-08-24T18:03:06.349862`,
/// `2023-01-01T00:00:00Z`, `...+00:00`). Offset timestamps are normalised to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_utc());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(raw.trim())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
    }
}

/// Static per-SKU revenue policy, as stored in the `revenue_skus` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSkuRule {
    pub sku_id: String,
    #[serde(default)]
    pub sku_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub upfront_deposit: Decimal,
    #[serde(default)]
    pub selection_period_months: Option<u32>,
    pub active_revenue_start_month: u32,
    #[serde(default)]
    pub active_revenue_end_month: Option<u32>,
    pub monthly_revenue: Decimal,
    #[serde(default)]
    pub deposit_refund_month: Option<u32>,
    #[serde(default)]
    pub cogs_sku_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

impl RevenueSkuRule {
    /// End month of the recurring window. `0` is treated like an absent value.
    pub fn revenue_end_month(&self) -> Option<u32> {
        self.active_revenue_end_month.filter(|&month| month > 0)
    }

    pub fn refund_month(&self) -> Option<u32> {
        self.deposit_refund_month.filter(|&month| month > 0)
    }

    pub fn is_revenue_active(&self, age: u32) -> bool {
        age >= self.active_revenue_start_month
            && self.revenue_end_month().map_or(true, |end| age <= end)
    }
}

/// A row of the `cogs_skus` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CogsSku {
    pub sku_id: String,
    #[serde(default)]
    pub sku_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

/// One row of a COGS amortization table, keyed by cohort age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CogsScheduleEntry {
    pub month_number: u32,
    pub cogs_amount: Decimal,
    #[serde(default)]
    pub phase: Option<String>,
}

/// A `cogs_breakdown` row: a schedule entry plus the COGS SKU it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CogsBreakdownRow {
    pub cogs_sku_id: String,
    pub month_number: u32,
    pub cogs_amount: Decimal,
    #[serde(default)]
    pub phase: Option<String>,
}

impl CogsBreakdownRow {
    pub fn entry(&self) -> CogsScheduleEntry {
        CogsScheduleEntry {
            month_number: self.month_number,
            cogs_amount: self.cogs_amount,
            phase: self.phase.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub sku_id: String,
    pub start_month: u32,
    pub quantity: Decimal,
}

impl Cohort {
    pub fn new(sku_id: impl Into<String>, start_month: u32, quantity: impl Into<Decimal>) -> Self {
        Self {
            sku_id: sku_id.into(),
            start_month,
            quantity: quantity.into(),
        }
    }

    /// Cohort age in calendar month `month`, or `None` before the cohort starts.
    pub fn age_at(&self, month: u32) -> Option<u32> {
        if month < self.start_month {
            None
        } else {
            Some(month - self.start_month + 1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthType {
    #[default]
    None,
    Percentage,
    Increment,
}

/// A line of a dynamic scenario request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuItem {
    pub sku_id: String,
    pub start_month: u32,
    pub quantity: Decimal,
    #[serde(default)]
    pub growth_type: GrowthType,
    #[serde(default)]
    pub growth_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedCohort {
    pub sku_id: String,
    pub month: u32,
    pub quantity: Decimal,
}

impl ExpandedCohort {
    /// Each expanded month is accumulated as its own cohort starting that month.
    pub fn into_cohort(self) -> Cohort {
        Cohort {
            sku_id: self.sku_id,
            start_month: self.month,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub name: String,
    pub skus: Vec<SkuItem>,
    #[serde(default)]
    pub horizon: Option<u32>,
}

impl ScenarioRequest {
    pub fn horizon(&self) -> u32 {
        self.horizon.unwrap_or(DEFAULT_HORIZON)
    }
}

/// Month-indexed values for months `1..=horizon`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthSeries {
    values: Vec<Decimal>,
}

impl MonthSeries {
    pub fn zeros(horizon: u32) -> Self {
        Self {
            values: vec![Decimal::ZERO; horizon as usize],
        }
    }

    pub fn from_values(values: Vec<Decimal>) -> Self {
        Self { values }
    }

    pub fn horizon(&self) -> u32 {
        self.values.len() as u32
    }

    /// Value for a 1-based calendar month.
    pub fn get(&self, month: u32) -> Option<Decimal> {
        month
            .checked_sub(1)
            .and_then(|index| self.values.get(index as usize))
            .copied()
    }

    pub fn values(&self) -> &[Decimal] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| (index as u32 + 1, *value))
    }

    /// Sums saturate at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
    pub fn total(&self) -> Decimal {
        self.values
            .iter()
            .fold(Decimal::ZERO, |sum, value| sum.saturating_add(*value))
    }

    pub(crate) fn add(&mut self, month: u32, amount: Decimal) {
        if let Some(slot) = month
            .checked_sub(1)
            .and_then(|index| self.values.get_mut(index as usize))
        {
            *slot = slot.saturating_add(amount);
        }
    }
}

/// Margin percentages; `None` marks cost without revenue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarginSeries {
    values: Vec<Option<f64>>,
}

impl MarginSeries {
    pub fn from_values(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn horizon(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn get(&self, month: u32) -> Option<Option<f64>> {
        month
            .checked_sub(1)
            .and_then(|index| self.values.get(index as usize))
            .copied()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<f64>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| (index as u32 + 1, *value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDetail {
    pub month: u32,
    pub total: Decimal,
    pub formatted_total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginDetail {
    pub month: u32,
    pub margin_percent: Option<f64>,
    pub formatted_margin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallReport {
    pub scenario_name: String,
    pub horizon: u32,
    pub monthly_totals: Vec<Decimal>,
    pub formatted_totals: Vec<String>,
    pub monthly_details: Vec<MonthlyDetail>,
    pub monthly_cogs_details: Vec<MonthlyDetail>,
    pub monthly_gross_income_details: Vec<MonthlyDetail>,
    pub monthly_profit_margin_details: Vec<MarginDetail>,
    pub monthly_cumulative_gross_profit_details: Vec<MonthlyDetail>,
    pub revenue_skus: Vec<RevenueSkuRule>,
}
