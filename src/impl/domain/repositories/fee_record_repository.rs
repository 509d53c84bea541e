use async_trait::async_trait;
use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::entities::{FeeRecord, NewFeeRecord, PaymentItemId, UserId};

/// Storage boundary for the fee lifecycle. The compound operations are
/// atomic: either the payment item's amount mutation and the record write
/// both happen, or neither does.
#[async_trait]
pub trait FeeRecordRepository: Send + Sync {
    async fn find_for_payment_item(
        &self,
        id: PaymentItemId,
    ) -> Result<Option<FeeRecord>, ServerError>;

    /// Sets the payment item's amount to `adjusted_amount` and inserts the
    /// record in one atomic step. Fails without side effects if the item is
    /// unknown or a record already exists for it (one record per item).
    async fn apply(
        &self,
        record: NewFeeRecord,
        adjusted_amount: Decimal,
    ) -> Result<FeeRecord, ServerError>;

    /// Deletes the record for the item, returning it if one existed.
    async fn refund(&self, id: PaymentItemId) -> Result<Option<FeeRecord>, ServerError>;

    /// Atomic counterpart of an amount edit: updates, inserts or deletes
    /// the item's record so that it matches `new_fee`, and sets the item's
    /// amount to `adjusted_amount`. A `new_fee` of zero means "no record".
    async fn recompute(
        &self,
        id: PaymentItemId,
        user_id: UserId,
        new_original_amount: Decimal,
        new_fee: Decimal,
        adjusted_amount: Decimal,
    ) -> Result<(), ServerError>;
}
