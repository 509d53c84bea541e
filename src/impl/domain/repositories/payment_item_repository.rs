use async_trait::async_trait;
use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::entities::{PaymentItem, PaymentItemId, UserId};

/// Read access to the external payment ledger. The engine only ever needs a
/// single item lookup and the two counts behind the frequency statistic.
#[async_trait]
pub trait PaymentItemRepository: Send + Sync {
    async fn find(&self, id: PaymentItemId) -> Result<Option<PaymentItem>, ServerError>;

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, ServerError>;

    /// Counts the user's payment items whose absolute amount lies in
    /// `[lower_bound, upper_bound)`, or `[lower_bound, ∞)` when
    /// `upper_bound` is `None`.
    async fn count_for_user_in_abs_range(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> Result<u64, ServerError>;
}
