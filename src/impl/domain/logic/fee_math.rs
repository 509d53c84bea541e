use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};

/// Rounded fees below 0.01 are dropped entirely rather than charged as
/// "dust".
fn min_fee_threshold() -> Decimal {
    Decimal::new(1, 2)
}

/// Post-processing shared by all fee-plan modes: the fee may never exceed
/// the transaction's own magnitude (100% is the ceiling), is rounded to 2
/// decimal places half-up, and collapses to exactly 0 below the dust
/// threshold.
pub(crate) fn finalize_fee(raw_fee: Decimal, abs_amount: Decimal) -> Decimal {
    let rounded = raw_fee
        .clamp(Decimal::ZERO, abs_amount)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded < min_fee_threshold() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Applies a fee to a signed payment amount. Income and expense amounts are
/// both reduced: an expense of -100.00 with fee 0.01 becomes -100.01, an
/// income of +100.00 becomes +99.99.
pub(crate) fn apply_fee_to_amount(amount: Decimal, fee: Decimal) -> Decimal {
    (amount - fee).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a clamped fee fraction into a monetary fee on the given
/// absolute amount.
pub(crate) fn fraction_of_amount(abs_amount: Decimal, fraction: f64) -> Decimal {
    Decimal::from_f64(fraction)
        .map(|f| abs_amount * f)
        .unwrap_or(Decimal::ZERO)
}
