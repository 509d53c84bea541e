use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use super::payment_item::UserId;
use crate::errors::{InvalidAmountTable, InvalidIntervalData};

/// Regression curve attached to one amount interval.
///
/// `coefficients` are ascending-power polynomial coefficients mapping a
/// payment frequency in `[0, 1]` to a fee fraction:
/// `f(x) = c0 + c1*x + c2*x² + …`. The evaluated fraction is clamped to
/// `[0, max_fee_fraction]` before it is turned into a monetary fee.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalCurve {
    pub max_fee_fraction: f64,
    pub coefficients: Vec<f64>,
}

/// A half-open amount interval `[lower_bound, next_lower_bound)`. The last
/// interval of a table is unbounded above. An interval without a curve
/// charges no fee.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub lower_bound: Decimal,
    pub curve: Option<IntervalCurve>,
}

impl Interval {
    pub fn new(lower_bound: Decimal, curve: Option<IntervalCurve>) -> Self {
        Self { lower_bound, curve }
    }
}

/// A sample point on a user-authored fee curve (chosen interactively in the
/// plan-configuration UI), used as regression input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionPoint {
    pub frequency: f64,
    pub fee_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeePlanMode {
    Table { intervals: Vec<Interval> },
    Formula { expression: String },
}

/// Per-user fee configuration (0 or 1 per user; uniqueness on the user
/// reference is enforced at the storage layer).
#[derive(Debug, Clone, PartialEq)]
pub struct FeePlan {
    pub user_id: UserId,
    pub mode: FeePlanMode,
}

// --

impl FeePlan {
    pub fn table(user_id: UserId, intervals: Vec<Interval>) -> Self {
        Self {
            user_id,
            mode: FeePlanMode::Table { intervals },
        }
    }

    pub fn formula(user_id: UserId, expression: impl Into<String>) -> Self {
        Self {
            user_id,
            mode: FeePlanMode::Formula {
                expression: expression.into(),
            },
        }
    }

    /// The default plan: a single catch-all interval `[0, ∞)` with no
    /// configured curve, i.e. no fees.
    pub fn default_table(user_id: UserId) -> Self {
        Self::table(user_id, vec![Interval::new(Decimal::ZERO, None)])
    }

    /// Checks the structural invariants of the plan's configuration.
    ///
    /// Table mode: the amount table must be non-empty, start at 0, contain
    /// only non-negative strictly increasing bounds, and every curve must
    /// have a max fee fraction in `[0, 1]` and finite coefficients.
    pub fn validate(&self) -> Result<(), ServerError> {
        let FeePlanMode::Table { intervals } = &self.mode else {
            return Ok(());
        };
        if intervals.is_empty() {
            return Err(InvalidAmountTable::new("amount table is empty"));
        }
        if intervals[0].lower_bound != Decimal::ZERO {
            return Err(InvalidAmountTable::new(
                "first interval must start at amount 0",
            ));
        }
        let mut previous: Option<Decimal> = None;
        for interval in intervals {
            if interval.lower_bound < Decimal::ZERO {
                return Err(InvalidAmountTable::new("negative interval lower bound"));
            }
            if let Some(previous) = previous {
                if interval.lower_bound <= previous {
                    return Err(InvalidAmountTable::new(
                        "interval lower bounds must be strictly increasing",
                    ));
                }
            }
            previous = Some(interval.lower_bound);

            if let Some(curve) = &interval.curve {
                if !curve.max_fee_fraction.is_finite()
                    || !(0.0..=1.0).contains(&curve.max_fee_fraction)
                {
                    return Err(InvalidIntervalData::new(
                        "max fee fraction must be within [0, 1]",
                    ));
                }
                if curve.coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(InvalidIntervalData::new(
                        "regression coefficients must be finite",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn curve(max_fee_fraction: f64) -> Option<IntervalCurve> {
        Some(IntervalCurve {
            max_fee_fraction,
            coefficients: vec![0.0, 0.1],
        })
    }

    #[test]
    fn default_table_is_valid() {
        assert!(FeePlan::default_table(UserId(1)).validate().is_ok());
    }

    #[test]
    fn rejects_decreasing_bounds() {
        let plan = FeePlan::table(
            UserId(1),
            vec![
                Interval::new(dec!(0), None),
                Interval::new(dec!(100), curve(0.05)),
                Interval::new(dec!(50), None),
            ],
        );
        assert!(plan.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_bounds() {
        let plan = FeePlan::table(
            UserId(1),
            vec![
                Interval::new(dec!(0), None),
                Interval::new(dec!(100), None),
                Interval::new(dec!(100), None),
            ],
        );
        assert!(plan.validate().is_err());
    }

    #[test]
    fn rejects_table_not_starting_at_zero() {
        let plan = FeePlan::table(UserId(1), vec![Interval::new(dec!(50), None)]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn rejects_max_fee_fraction_out_of_range() {
        let plan = FeePlan::table(UserId(1), vec![Interval::new(dec!(0), curve(1.5))]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn formula_plans_have_no_table_invariants() {
        assert!(FeePlan::formula(UserId(1), "x * 0.01").validate().is_ok());
    }
}
