use crate::domain::model::{Cohort, MonthSeries, RevenueSkuRule};
use rust_decimal::Decimal;
use std::collections::HashMap;

// 金額計算一律飽和，不會溢位 panic

pub fn deposit_revenue(quantity: Decimal, upfront_deposit: Decimal) -> Decimal {
    quantity.saturating_mul(upfront_deposit)
}

pub fn monthly_revenue(quantity: Decimal, monthly_revenue: Decimal) -> Decimal {
    quantity.saturating_mul(monthly_revenue)
}

pub fn deposit_refund(quantity: Decimal, upfront_deposit: Decimal) -> Decimal {
    quantity.saturating_mul(upfront_deposit)
}

/// Revenue waterfall over `1..=horizon`, each cohort priced by the rule of its `sku_id`.
pub fn accumulate_revenue(
    cohorts: &[Cohort],
    rules: &HashMap<String, RevenueSkuRule>,
    horizon: u32,
) -> MonthSeries {
    let mut totals = MonthSeries::zeros(horizon);

    for cohort in cohorts {
        match rules.get(&cohort.sku_id) {
            Some(rule) => apply_rule(&mut totals, cohort, rule, horizon),
            None => tracing::debug!(
                "No revenue rule for SKU {}, cohort starting month {} skipped",
                cohort.sku_id,
                cohort.start_month
            ),
        }
    }

    totals
}

/// Revenue waterfall applying a single rule to every cohort.
pub fn accumulate_revenue_for_rule(
    cohorts: &[Cohort],
    rule: &RevenueSkuRule,
    horizon: u32,
) -> MonthSeries {
    let mut totals = MonthSeries::zeros(horizon);
    for cohort in cohorts {
        apply_rule(&mut totals, cohort, rule, horizon);
    }
    totals
}

fn apply_rule(totals: &mut MonthSeries, cohort: &Cohort, rule: &RevenueSkuRule, horizon: u32) {
    for month in cohort.start_month.max(1)..=horizon {
        let Some(age) = cohort.age_at(month) else {
            continue;
        };

        if age == 1 {
            totals.add(month, deposit_revenue(cohort.quantity, rule.upfront_deposit));
        }

        if rule.is_revenue_active(age) {
            totals.add(month, monthly_revenue(cohort.quantity, rule.monthly_revenue));
        }

        if rule.refund_month() == Some(age) {
            totals.add(month, -deposit_refund(cohort.quantity, rule.upfront_deposit));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn r10_rule() -> RevenueSkuRule {
        RevenueSkuRule {
            sku_id: "R10".to_string(),
            sku_name: "Premium Nurse Placement with Deposit".to_string(),
            description: None,
            upfront_deposit: dec!(10000),
            selection_period_months: Some(3),
            active_revenue_start_month: 4,
            active_revenue_end_month: Some(39),
            monthly_revenue: dec!(2513),
            deposit_refund_month: Some(40),
            cogs_sku_id: Some("C10".to_string()),
            created_at: None,
        }
    }

    fn cohorts(specs: &[(u32, i64)]) -> Vec<Cohort> {
        specs
            .iter()
            .map(|&(start, quantity)| Cohort::new("R10", start, quantity))
            .collect()
    }

    fn as_decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from(v)).collect()
    }

    #[test]
    fn test_helpers() {
        assert_eq!(deposit_revenue(dec!(10), dec!(10000)), dec!(100000));
        assert_eq!(deposit_revenue(dec!(10), dec!(1500.50)), dec!(15005));
        assert_eq!(monthly_revenue(dec!(10), dec!(123.45)), dec!(1234.5));
        assert_eq!(monthly_revenue(dec!(10), dec!(-500)), dec!(-5000));
        assert_eq!(deposit_refund(dec!(0), dec!(10000)), dec!(0));
        assert_eq!(monthly_revenue(dec!(3), dec!(33.33)), dec!(99.99));
    }

    #[test]
    fn test_single_cohort() {
        let result = accumulate_revenue_for_rule(&cohorts(&[(1, 10)]), &r10_rule(), 7);
        assert_eq!(
            result.values(),
            as_decimals(&[100000, 0, 0, 25130, 25130, 25130, 25130])
        );
    }

    #[test]
    fn test_four_cohort_waterfall() {
        let result = accumulate_revenue_for_rule(
            &cohorts(&[(1, 10), (2, 20), (3, 0), (4, 40)]),
            &r10_rule(),
            36,
        );

        assert_eq!(result.horizon(), 36);
        assert_eq!(
            &result.values()[..7],
            as_decimals(&[100000, 200000, 0, 425130, 75390, 75390, 175910])
        );
    }

    #[test]
    fn test_later_start() {
        let result = accumulate_revenue_for_rule(&cohorts(&[(3, 10)]), &r10_rule(), 7);
        assert_eq!(
            result.values(),
            as_decimals(&[0, 0, 100000, 0, 0, 25130, 25130])
        );
    }

    #[test]
    fn test_short_horizon() {
        let result = accumulate_revenue_for_rule(
            &cohorts(&[(1, 10), (2, 20), (3, 30), (4, 40)]),
            &r10_rule(),
            5,
        );
        assert_eq!(
            result.values(),
            as_decimals(&[100000, 200000, 300000, 425130, 75390])
        );
    }

    #[test]
    fn test_end_month() {
        let rule = RevenueSkuRule {
            active_revenue_end_month: Some(6),
            ..r10_rule()
        };
        let result = accumulate_revenue_for_rule(&cohorts(&[(1, 10)]), &rule, 8);
        assert_eq!(
            result.values(),
            as_decimals(&[100000, 0, 0, 25130, 25130, 25130, 0, 0])
        );
    }

    #[test]
    fn test_deposit_refund() {
        let rule = RevenueSkuRule {
            deposit_refund_month: Some(6),
            ..r10_rule()
        };
        let result = accumulate_revenue_for_rule(&cohorts(&[(1, 10)]), &rule, 7);
        assert_eq!(
            result.values(),
            as_decimals(&[100000, 0, 0, 25130, 25130, -74870, 25130])
        );
    }

    #[test]
    fn test_refund_nets_out_deposit() {
        let rule = RevenueSkuRule {
            monthly_revenue: dec!(0),
            deposit_refund_month: Some(5),
            ..r10_rule()
        };
        let result = accumulate_revenue_for_rule(&cohorts(&[(2, 7)]), &rule, 12);
        assert_eq!(result.total(), dec!(0));
    }

    #[test]
    fn test_complex_structure() {
        let rule = RevenueSkuRule {
            upfront_deposit: dec!(5000),
            monthly_revenue: dec!(1000),
            active_revenue_start_month: 2,
            active_revenue_end_month: Some(5),
            deposit_refund_month: Some(3),
            ..r10_rule()
        };
        let result = accumulate_revenue_for_rule(&cohorts(&[(1, 10)]), &rule, 6);
        assert_eq!(
            result.values(),
            as_decimals(&[50000, 10000, -40000, 10000, 10000, 0])
        );
    }

    #[test]
    fn test_empty_and_zero_cohorts() {
        let empty = accumulate_revenue_for_rule(&[], &r10_rule(), 5);
        assert_eq!(empty.values(), as_decimals(&[0, 0, 0, 0, 0]));

        let zero = accumulate_revenue_for_rule(&cohorts(&[(1, 0)]), &r10_rule(), 5);
        assert_eq!(zero.values(), as_decimals(&[0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_rules_keyed_by_sku() {
        let mut rules = HashMap::new();
        rules.insert("R10".to_string(), r10_rule());
        rules.insert(
            "R20".to_string(),
            RevenueSkuRule {
                sku_id: "R20".to_string(),
                upfront_deposit: dec!(0),
                active_revenue_start_month: 1,
                monthly_revenue: dec!(100),
                ..r10_rule()
            },
        );

        let input = vec![
            Cohort::new("R10", 1, 1),
            Cohort::new("R20", 2, 3),
            Cohort::new("UNKNOWN", 1, 99),
        ];
        let result = accumulate_revenue(&input, &rules, 4);
        assert_eq!(result.values(), as_decimals(&[10000, 300, 300, 2813]));
    }

    #[test]
    fn test_oversized_cohort_saturates() {
        let huge = vec![Cohort::new("R10", 1, Decimal::MAX), Cohort::new("R10", 1, 1)];
        let result = accumulate_revenue_for_rule(&huge, &r10_rule(), 40);

        assert_eq!(result.get(1), Some(Decimal::MAX));
        assert_eq!(result.get(4), Some(Decimal::MAX));
        assert_eq!(result.get(40), Some(Decimal::MIN));
        assert_eq!(deposit_refund(Decimal::MIN, dec!(2)), Decimal::MIN);
    }
}
