use std::collections::BTreeMap;

use fractic_server_error::ServerError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};

use crate::{
    entities::{FeePlan, FeePlanMode, Interval, IntervalCurve, UserId},
    errors::{
        FeePlanSerializationError, InvalidAmountTable, InvalidFeePlanMode, InvalidIntervalData,
    },
};

pub(crate) const MODE_TABLE: &str = "table";
pub(crate) const MODE_FORMULA: &str = "formula";

/// `maxFee` defaults to 10% when the stored interval data omits it.
const DEFAULT_MAX_FEE_FRACTION: f64 = 0.1;

/// The fee plan exactly as persisted: one row per user with the interval
/// table and per-interval regression data held in serialized columns.
/// Parsing converts the loose row into the typed [`FeePlan`] entity and is
/// where all malformed-configuration failures surface.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FeePlanRow {
    pub(crate) user_id: UserId,
    pub(crate) mode: String,
    pub(crate) formula_text: Option<String>,
    pub(crate) amount_table_json: String,
    pub(crate) interval_data_json: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IntervalDataModel {
    #[serde(rename = "maxFee", default = "default_max_fee")]
    max_fee: f64,
    #[serde(default)]
    coefficients: Option<Vec<f64>>,
}

fn default_max_fee() -> f64 {
    DEFAULT_MAX_FEE_FRACTION
}

impl FeePlanRow {
    pub(crate) fn parse(&self) -> Result<FeePlan, ServerError> {
        let mode = match self.mode.as_str() {
            MODE_FORMULA => FeePlanMode::Formula {
                expression: self.formula_text.clone().unwrap_or_default(),
            },
            MODE_TABLE => FeePlanMode::Table {
                intervals: self.parse_intervals()?,
            },
            other => return Err(InvalidFeePlanMode::new(other)),
        };
        let plan = FeePlan {
            user_id: self.user_id,
            mode,
        };
        plan.validate()?;
        Ok(plan)
    }

    fn parse_intervals(&self) -> Result<Vec<Interval>, ServerError> {
        let amount_table: Vec<f64> = serde_json::from_str(&self.amount_table_json)
            .map_err(|e| InvalidAmountTable::with_debug("not a JSON number list", &e))?;
        let interval_data: BTreeMap<String, IntervalDataModel> =
            serde_json::from_str(&self.interval_data_json)
                .map_err(|e| InvalidIntervalData::with_debug("not a JSON object", &e))?;

        let intervals = amount_table
            .iter()
            .map(|&lower_bound| {
                let lower = Decimal::from_f64(lower_bound).ok_or_else(|| {
                    InvalidAmountTable::new("lower bound is not a finite number")
                })?;
                let curve = interval_data
                    .get(&interval_key(lower_bound))
                    .and_then(|data| {
                        data.coefficients.clone().map(|coefficients| IntervalCurve {
                            max_fee_fraction: data.max_fee,
                            coefficients,
                        })
                    });
                Ok(Interval::new(lower, curve))
            })
            .collect::<Result<Vec<_>, ServerError>>()?;

        // Every interval-data key must correspond to a table entry.
        for key in interval_data.keys() {
            if !amount_table.iter().any(|&lo| interval_key(lo) == *key) {
                return Err(InvalidIntervalData::with_debug(
                    "key does not match any amount table entry",
                    &key,
                ));
            }
        }

        Ok(intervals)
    }

    pub(crate) fn from_plan(plan: &FeePlan) -> Result<Self, ServerError> {
        match &plan.mode {
            FeePlanMode::Formula { expression } => Ok(Self {
                user_id: plan.user_id,
                mode: MODE_FORMULA.to_string(),
                formula_text: Some(expression.clone()),
                amount_table_json: "[0]".to_string(),
                interval_data_json: "{}".to_string(),
            }),
            FeePlanMode::Table { intervals } => {
                let mut amount_table = Vec::with_capacity(intervals.len());
                let mut interval_data = BTreeMap::new();
                for interval in intervals {
                    let lower_bound = interval.lower_bound.to_f64().ok_or_else(|| {
                        FeePlanSerializationError::new(&plan.user_id)
                    })?;
                    amount_table.push(lower_bound);
                    if let Some(curve) = &interval.curve {
                        interval_data.insert(
                            interval_key(lower_bound),
                            IntervalDataModel {
                                max_fee: curve.max_fee_fraction,
                                coefficients: Some(curve.coefficients.clone()),
                            },
                        );
                    }
                }
                Ok(Self {
                    user_id: plan.user_id,
                    mode: MODE_TABLE.to_string(),
                    formula_text: None,
                    amount_table_json: serde_json::to_string(&amount_table)
                        .map_err(|e| FeePlanSerializationError::with_debug(&plan.user_id, &e))?,
                    interval_data_json: serde_json::to_string(&interval_data)
                        .map_err(|e| FeePlanSerializationError::with_debug(&plan.user_id, &e))?,
                })
            }
        }
    }
}

/// Interval-data keys are the amount-table value rendered as a string, with
/// whole numbers rendered without a fractional part ("100", not "100.0").
fn interval_key(lower_bound: f64) -> String {
    if lower_bound.fract() == 0.0 && lower_bound.abs() < i64::MAX as f64 {
        format!("{}", lower_bound as i64)
    } else {
        lower_bound.to_string()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn table_row(amount_table_json: &str, interval_data_json: &str) -> FeePlanRow {
        FeePlanRow {
            user_id: UserId(7),
            mode: MODE_TABLE.to_string(),
            formula_text: None,
            amount_table_json: amount_table_json.to_string(),
            interval_data_json: interval_data_json.to_string(),
        }
    }

    #[test]
    fn parses_table_row_into_typed_intervals() {
        let row = table_row(
            "[0, 100]",
            r#"{"0": {"maxFee": 0.05, "coefficients": [0.0, 0.1]}}"#,
        );
        let plan = row.parse().unwrap();
        let FeePlanMode::Table { intervals } = plan.mode else {
            panic!("expected table mode");
        };
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].lower_bound, dec!(0));
        let curve = intervals[0].curve.as_ref().unwrap();
        assert_eq!(curve.max_fee_fraction, 0.05);
        assert_eq!(curve.coefficients, vec![0.0, 0.1]);
        // No interval data for the [100, ∞) interval.
        assert!(intervals[1].curve.is_none());
    }

    #[test]
    fn max_fee_defaults_when_omitted() {
        let row = table_row("[0]", r#"{"0": {"coefficients": [0.0, 0.2]}}"#);
        let plan = row.parse().unwrap();
        let FeePlanMode::Table { intervals } = plan.mode else {
            panic!("expected table mode");
        };
        assert_eq!(
            intervals[0].curve.as_ref().unwrap().max_fee_fraction,
            DEFAULT_MAX_FEE_FRACTION
        );
    }

    #[test]
    fn missing_coefficients_mean_no_curve() {
        let row = table_row("[0]", r#"{"0": {"maxFee": 0.05}}"#);
        let plan = row.parse().unwrap();
        let FeePlanMode::Table { intervals } = plan.mode else {
            panic!("expected table mode");
        };
        assert!(intervals[0].curve.is_none());
    }

    #[test]
    fn rejects_unparseable_columns() {
        assert!(table_row("not json", "{}").parse().is_err());
        assert!(table_row("[0]", "not json").parse().is_err());
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut row = table_row("[0]", "{}");
        row.mode = "percentage".to_string();
        assert!(row.parse().is_err());
    }

    #[test]
    fn rejects_interval_data_key_without_table_entry() {
        let row = table_row("[0]", r#"{"100": {"coefficients": [0.0]}}"#);
        assert!(row.parse().is_err());
    }

    #[test]
    fn rejects_decreasing_amount_table() {
        assert!(table_row("[0, 100, 50]", "{}").parse().is_err());
    }

    #[test]
    fn round_trips_through_the_persisted_layout() {
        let plan = FeePlan::table(
            UserId(3),
            vec![
                Interval::new(dec!(0), None),
                Interval::new(
                    dec!(100),
                    Some(IntervalCurve {
                        max_fee_fraction: 0.05,
                        coefficients: vec![0.0, 0.1, 0.02],
                    }),
                ),
            ],
        );
        let row = FeePlanRow::from_plan(&plan).unwrap();
        assert_eq!(row.parse().unwrap(), plan);
    }

    #[test]
    fn formula_rows_carry_the_expression() {
        let plan = FeePlan::formula(UserId(4), "x * 0.01");
        let row = FeePlanRow::from_plan(&plan).unwrap();
        assert_eq!(row.mode, MODE_FORMULA);
        assert_eq!(row.parse().unwrap(), plan);
    }
}
