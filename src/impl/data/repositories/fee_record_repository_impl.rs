use std::sync::Arc;

use async_trait::async_trait;
use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::{
    data::datasources::ledger_store::LedgerStore,
    domain::repositories::fee_record_repository::FeeRecordRepository,
    entities::{FeeRecord, NewFeeRecord, PaymentItemId, UserId},
};

pub(crate) struct FeeRecordRepositoryImpl {
    store: Arc<LedgerStore>,
}

impl FeeRecordRepositoryImpl {
    pub(crate) fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FeeRecordRepository for FeeRecordRepositoryImpl {
    async fn find_for_payment_item(
        &self,
        id: PaymentItemId,
    ) -> Result<Option<FeeRecord>, ServerError> {
        Ok(self.store.fee_record(id))
    }

    async fn apply(
        &self,
        record: NewFeeRecord,
        adjusted_amount: Decimal,
    ) -> Result<FeeRecord, ServerError> {
        self.store.apply_fee(record, adjusted_amount)
    }

    async fn refund(&self, id: PaymentItemId) -> Result<Option<FeeRecord>, ServerError> {
        Ok(self.store.refund_fee(id))
    }

    async fn recompute(
        &self,
        id: PaymentItemId,
        user_id: UserId,
        new_original_amount: Decimal,
        new_fee: Decimal,
        adjusted_amount: Decimal,
    ) -> Result<(), ServerError> {
        self.store
            .recompute_fee(id, user_id, new_original_amount, new_fee, adjusted_amount)
    }
}
