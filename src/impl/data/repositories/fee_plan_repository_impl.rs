use std::sync::Arc;

use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    data::{datasources::ledger_store::LedgerStore, models::fee_plan_model::FeePlanRow},
    domain::repositories::fee_plan_repository::FeePlanRepository,
    entities::{FeePlan, UserId},
};

pub(crate) struct FeePlanRepositoryImpl {
    store: Arc<LedgerStore>,
}

impl FeePlanRepositoryImpl {
    pub(crate) fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FeePlanRepository for FeePlanRepositoryImpl {
    async fn find_for_user(&self, user_id: UserId) -> Result<Option<FeePlan>, ServerError> {
        self.store
            .fee_plan_row(user_id)
            .map(|row| row.parse())
            .transpose()
    }

    async fn put(&self, plan: FeePlan) -> Result<(), ServerError> {
        plan.validate()?;
        self.store.put_fee_plan_row(FeePlanRow::from_plan(&plan)?);
        Ok(())
    }
}
