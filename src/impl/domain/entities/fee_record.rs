use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::payment_item::{PaymentItemId, UserId};

/// Persisted record of a fee actually charged to one payment item.
///
/// Created exactly once when a fee is applied and deleted exactly once when
/// it is refunded. `original_amount` is the item's amount before the fee was
/// subtracted, so a refund never depends on the fee plan's
/// possibly-changed-since configuration. A payment item without a fee record
/// is understood to have incurred zero fee.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRecord {
    pub payment_item_id: PaymentItemId,
    pub user_id: UserId,
    pub fee_amount: Decimal,
    pub original_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A fee record as handed to the storage layer, before it is stamped with
/// its creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeeRecord {
    pub payment_item_id: PaymentItemId,
    pub user_id: UserId,
    pub fee_amount: Decimal,
    pub original_amount: Decimal,
}
