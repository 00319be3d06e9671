use crate::domain::model::{MarginSeries, MonthSeries};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub gross_income: MonthSeries,
    pub margin: MarginSeries,
    pub cumulative_gross_profit: MonthSeries,
}

/// Gross income and the running total saturate rather than overflow.
pub fn derive(revenue: &MonthSeries, cogs: &MonthSeries) -> DerivedMetrics {
    let gross_income: Vec<Decimal> = revenue
        .values()
        .iter()
        .zip(cogs.values())
        .map(|(revenue, cogs)| revenue.saturating_sub(*cogs))
        .collect();

    let margin = revenue
        .values()
        .iter()
        .zip(cogs.values())
        .zip(&gross_income)
        .map(|((revenue, cogs), gross)| margin_percent(*revenue, *cogs, *gross))
        .collect();

    let cumulative = gross_income
        .iter()
        .scan(Decimal::ZERO, |running, gross| {
            *running = running.saturating_add(*gross);
            Some(*running)
        })
        .collect();

    DerivedMetrics {
        gross_income: MonthSeries::from_values(gross_income),
        margin: MarginSeries::from_values(margin),
        cumulative_gross_profit: MonthSeries::from_values(cumulative),
    }
}

/// `None` when there is cost but no revenue; `0` when there is neither.
pub fn margin_percent(revenue: Decimal, cogs: Decimal, gross_income: Decimal) -> Option<f64> {
    if revenue.is_zero() {
        return if cogs.is_zero() { Some(0.0) } else { None };
    }

    match gross_income
        .checked_div(revenue)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .and_then(|percent| percent.to_f64())
    {
        Some(percent) => Some(percent),
        None => Some(gross_income.to_f64()? / revenue.to_f64()? * 100.0),
    }
}
