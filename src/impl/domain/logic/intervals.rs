use rust_decimal::Decimal;

use crate::entities::Interval;

/// The interval an absolute amount was classified into, together with the
/// bounds of the frequency range it implies.
#[derive(Debug)]
pub(crate) struct IntervalMatch<'a> {
    pub(crate) interval: &'a Interval,
    pub(crate) upper_bound: Option<Decimal>,
}

/// Classifies an absolute amount into one of the table's half-open
/// `[lower, upper)` intervals. The last interval is `[lower, ∞)`.
///
/// A value equal to an interval's lower bound belongs to that interval,
/// never the preceding one.
pub(crate) fn classify(intervals: &[Interval], abs_amount: Decimal) -> Option<IntervalMatch<'_>> {
    for (i, interval) in intervals.iter().enumerate() {
        let upper_bound = intervals.get(i + 1).map(|next| next.lower_bound);
        let matches = match upper_bound {
            Some(upper) => abs_amount >= interval.lower_bound && abs_amount < upper,
            None => abs_amount >= interval.lower_bound,
        };
        if matches {
            return Some(IntervalMatch {
                interval,
                upper_bound,
            });
        }
    }
    None
}
