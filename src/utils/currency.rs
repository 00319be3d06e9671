use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount as US currency, e.g. `$425,130.00` or `-$6,000.00`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    // 固定兩位小數後再切出整數與小數部分
    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let digits = magnitude.to_string();
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!("{}${}.{}", sign, group_thousands(whole), fraction)
}

/// Formats a margin as `95.45%`, or `N/A` when undefined.
pub fn format_margin(margin: Option<f64>) -> String {
    match margin {
        Some(percent) => format!("{:.2}%", percent),
        None => "N/A".to_string(),
    }
}

fn group_thousands(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, ch) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
