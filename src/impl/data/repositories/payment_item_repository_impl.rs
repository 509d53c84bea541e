use std::sync::Arc;

use async_trait::async_trait;
use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::{
    data::datasources::ledger_store::LedgerStore,
    domain::repositories::payment_item_repository::PaymentItemRepository,
    entities::{PaymentItem, PaymentItemId, UserId},
};

pub(crate) struct PaymentItemRepositoryImpl {
    store: Arc<LedgerStore>,
}

impl PaymentItemRepositoryImpl {
    pub(crate) fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PaymentItemRepository for PaymentItemRepositoryImpl {
    async fn find(&self, id: PaymentItemId) -> Result<Option<PaymentItem>, ServerError> {
        Ok(self.store.payment_item(id))
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, ServerError> {
        Ok(self.store.count_for_user(user_id))
    }

    async fn count_for_user_in_abs_range(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> Result<u64, ServerError> {
        Ok(self
            .store
            .count_for_user_in_abs_range(user_id, lower_bound, upper_bound))
    }
}
