use crate::domain::model::{ExpandedCohort, GrowthType, SkuItem};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Expands a request line into one pseudo-cohort per month from `start_month` to `horizon`.
///
/// The quantity is grown before each month after the first. Every emitted
/// record is later accumulated as a cohort of its own, so each month pays a
/// fresh deposit and runs its own refund cycle.
pub fn expand(item: &SkuItem, horizon: u32) -> Vec<ExpandedCohort> {
    let growth_value = item.growth_value.unwrap_or(Decimal::ZERO);
    let mut current_quantity = item.quantity;
    let mut expanded = Vec::new();

    for month in item.start_month..=horizon {
        if month > item.start_month {
            current_quantity = grow(current_quantity, item.growth_type, growth_value);
        }
        expanded.push(ExpandedCohort {
            sku_id: item.sku_id.clone(),
            month,
            quantity: current_quantity,
        });
    }

    expanded
}

/// Compounding saturates at `Decimal::MAX` (or `MIN` for negative quantities).
fn grow(quantity: Decimal, growth_type: GrowthType, growth_value: Decimal) -> Decimal {
    match growth_type {
        GrowthType::Percentage => quantity
            .saturating_mul(dec!(1).saturating_add(growth_value / dec!(100)))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        GrowthType::Increment => quantity.saturating_add(growth_value),
        GrowthType::None => quantity,
    }
}
