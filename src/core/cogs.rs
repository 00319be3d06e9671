use crate::domain::model::{CogsScheduleEntry, Cohort, MonthSeries, RevenueSkuRule};
use crate::domain::ports::SkuCatalog;
use crate::utils::error::{Result, WaterfallError};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// How a missing COGS link or an empty COGS schedule is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CogsResolution {
    /// Missing COGS data fails the calculation.
    Strict,
    /// Missing COGS data counts as zero cost for that SKU.
    Tolerant,
}

/// Looks up the COGS schedule linked to an already-fetched revenue rule.
///
/// Upstream failures propagate in both modes.
pub async fn resolve_cogs_schedule<C: SkuCatalog + ?Sized>(
    catalog: &C,
    rule: &RevenueSkuRule,
    mode: CogsResolution,
) -> Result<Vec<CogsScheduleEntry>> {
    let outcome = match rule.cogs_sku_id.as_deref().filter(|id| !id.is_empty()) {
        None => Err(WaterfallError::CogsLinkNotFound {
            sku_id: rule.sku_id.clone(),
        }),
        Some(cogs_sku_id) => match catalog.get_cogs_schedule(cogs_sku_id).await {
            Ok(entries) if entries.is_empty() => Err(WaterfallError::CogsScheduleNotFound {
                sku_id: rule.sku_id.clone(),
                cogs_sku_id: cogs_sku_id.to_string(),
            }),
            other => other,
        },
    };

    match (outcome, mode) {
        (Ok(entries), _) => {
            tracing::debug!(
                "Resolved {} COGS entries for revenue SKU {}",
                entries.len(),
                rule.sku_id
            );
            Ok(entries)
        }
        (
            Err(
                err @ (WaterfallError::CogsLinkNotFound { .. }
                | WaterfallError::CogsScheduleNotFound { .. }),
            ),
            CogsResolution::Tolerant,
        ) => {
            tracing::warn!("⚠️ {}; treating COGS as zero for {}", err, rule.sku_id);
            Ok(Vec::new())
        }
        (Err(err), _) => Err(err),
    }
}

/// Sums duplicate `month_number` rows into one amount per cohort age.
pub fn schedule_by_age(entries: &[CogsScheduleEntry]) -> HashMap<u32, Decimal> {
    let mut by_age = HashMap::new();
    for entry in entries {
        let amount = by_age.entry(entry.month_number).or_insert(Decimal::ZERO);
        *amount = amount.saturating_add(entry.cogs_amount);
    }
    by_age
}

/// COGS waterfall over `1..=horizon`, each cohort costed by the schedule of its `sku_id`.
pub fn accumulate_cogs(
    cohorts: &[Cohort],
    schedule: &HashMap<String, Vec<CogsScheduleEntry>>,
    horizon: u32,
) -> MonthSeries {
    let by_sku: HashMap<&str, HashMap<u32, Decimal>> = schedule
        .iter()
        .map(|(sku_id, entries)| (sku_id.as_str(), schedule_by_age(entries)))
        .collect();

    let mut totals = MonthSeries::zeros(horizon);
    for cohort in cohorts {
        if let Some(amounts) = by_sku.get(cohort.sku_id.as_str()) {
            apply_schedule(&mut totals, cohort, amounts, horizon);
        }
    }
    totals
}

/// COGS waterfall applying one schedule to every cohort.
pub fn accumulate_cogs_for_schedule(
    cohorts: &[Cohort],
    entries: &[CogsScheduleEntry],
    horizon: u32,
) -> MonthSeries {
    let amounts = schedule_by_age(entries);
    let mut totals = MonthSeries::zeros(horizon);
    for cohort in cohorts {
        apply_schedule(&mut totals, cohort, &amounts, horizon);
    }
    totals
}

fn apply_schedule(
    totals: &mut MonthSeries,
    cohort: &Cohort,
    amounts: &HashMap<u32, Decimal>,
    horizon: u32,
) {
    if amounts.is_empty() {
        return;
    }
    for month in cohort.start_month.max(1)..=horizon {
        let Some(age) = cohort.age_at(month) else {
            continue;
        };
        if let Some(amount) = amounts.get(&age) {
            totals.add(month, cohort.quantity.saturating_mul(*amount));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::InMemoryCatalog;
    use rust_decimal_macros::dec;

    fn entry(month_number: u32, cogs_amount: Decimal) -> CogsScheduleEntry {
        CogsScheduleEntry {
            month_number,
            cogs_amount,
            phase: None,
        }
    }

    fn c10_schedule() -> Vec<CogsScheduleEntry> {
        vec![entry(1, dec!(500)), entry(2, dec!(300)), entry(4, dec!(200))]
    }

    fn rule(sku_id: &str, cogs_sku_id: Option<&str>) -> RevenueSkuRule {
        RevenueSkuRule {
            sku_id: sku_id.to_string(),
            sku_name: String::new(),
            description: None,
            upfront_deposit: dec!(10000),
            selection_period_months: None,
            active_revenue_start_month: 4,
            active_revenue_end_month: Some(39),
            monthly_revenue: dec!(2513),
            deposit_refund_month: None,
            cogs_sku_id: cogs_sku_id.map(str::to_string),
            created_at: None,
        }
    }

    fn as_decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from(v)).collect()
    }

    #[test]
    fn test_cogs_keyed_by_cohort_age() {
        let cohorts = vec![
            Cohort::new("R10", 1, 10),
            Cohort::new("R10", 2, 20),
            Cohort::new("R10", 3, 0),
            Cohort::new("R10", 4, 40),
        ];
        let result = accumulate_cogs_for_schedule(&cohorts, &c10_schedule(), 7);
        assert_eq!(
            result.values(),
            as_decimals(&[5000, 13000, 6000, 22000, 16000, 0, 8000])
        );
    }

    #[test]
    fn test_late_cohort_incurs_month_one_cost_at_start() {
        let cohorts = vec![Cohort::new("R10", 5, 2)];
        let result = accumulate_cogs_for_schedule(&cohorts, &c10_schedule(), 8);
        assert_eq!(result.values(), as_decimals(&[0, 0, 0, 0, 1000, 600, 0, 400]));
    }

    #[test]
    fn test_duplicate_months_sum() {
        let entries = vec![entry(1, dec!(100)), entry(1, dec!(50))];
        assert_eq!(schedule_by_age(&entries).get(&1), Some(&dec!(150)));

        let result = accumulate_cogs_for_schedule(&[Cohort::new("R10", 1, 2)], &entries, 2);
        assert_eq!(result.values(), as_decimals(&[300, 0]));
    }

    #[test]
    fn test_empty_schedule_is_all_zero() {
        let cohorts = vec![Cohort::new("R10", 1, 10), Cohort::new("R10", 3, -4)];
        let result = accumulate_cogs_for_schedule(&cohorts, &[], 6);
        assert_eq!(result.values(), as_decimals(&[0, 0, 0, 0, 0, 0]));

        let keyed = accumulate_cogs(&cohorts, &HashMap::new(), 6);
        assert_eq!(keyed.values(), as_decimals(&[0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_schedules_keyed_by_sku() {
        let mut schedule = HashMap::new();
        schedule.insert("R10".to_string(), c10_schedule());
        schedule.insert("R20".to_string(), vec![entry(1, dec!(1))]);

        let cohorts = vec![Cohort::new("R10", 1, 1), Cohort::new("R20", 1, 7)];
        let result = accumulate_cogs(&cohorts, &schedule, 3);
        assert_eq!(result.values(), as_decimals(&[507, 300, 0]));
    }

    #[tokio::test]
    async fn test_strict_resolution_fails_without_link() {
        let catalog = InMemoryCatalog::new();

        let result = resolve_cogs_schedule(&catalog, &rule("R10", None), CogsResolution::Strict).await;
        assert!(matches!(
            result,
            Err(WaterfallError::CogsLinkNotFound { ref sku_id }) if sku_id == "R10"
        ));
    }

    #[tokio::test]
    async fn test_strict_resolution_fails_on_empty_schedule() {
        let catalog = InMemoryCatalog::new().with_cogs_sku("C10", "Placement cost");

        let result =
            resolve_cogs_schedule(&catalog, &rule("R10", Some("C10")), CogsResolution::Strict).await;
        assert!(matches!(
            result,
            Err(WaterfallError::CogsScheduleNotFound { ref cogs_sku_id, .. }) if cogs_sku_id == "C10"
        ));
    }

    #[tokio::test]
    async fn test_tolerant_resolution_yields_empty_schedule() {
        let catalog = InMemoryCatalog::new().with_cogs_sku("C10", "Placement cost");

        for link in [None, Some(""), Some("C10")] {
            let result = resolve_cogs_schedule(&catalog, &rule("R10", link), CogsResolution::Tolerant)
                .await
                .unwrap();
            assert!(result.is_empty());
        }
    }

    #[tokio::test]
    async fn test_resolves_linked_schedule() {
        let catalog = InMemoryCatalog::new().with_cogs_schedule("C10", c10_schedule());

        let result = resolve_cogs_schedule(&catalog, &rule("R10", Some("C10")), CogsResolution::Strict)
            .await
            .unwrap();
        assert_eq!(result, c10_schedule());
    }

    #[test]
    fn test_oversized_costs_saturate() {
        let entries = vec![entry(1, Decimal::MAX), entry(1, Decimal::MAX), entry(2, dec!(2))];
        assert_eq!(schedule_by_age(&entries).get(&1), Some(&Decimal::MAX));

        let cohorts = vec![Cohort::new("R10", 1, Decimal::MAX), Cohort::new("R10", 1, 3)];
        let result = accumulate_cogs_for_schedule(&cohorts, &entries, 2);
        assert_eq!(result.values(), vec![Decimal::MAX, Decimal::MAX]);
    }
}
