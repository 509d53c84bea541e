use std::sync::Arc;

use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::{
    data::{
        datasources::ledger_store::LedgerStore,
        repositories::fee_plan_repository_impl::FeePlanRepositoryImpl,
    },
    domain::{
        logic::{formula, polynomial},
        repositories::fee_plan_repository::FeePlanRepository as _,
        usecases::fee_usecase::{FeeUsecase as _, FeeUsecaseImpl},
    },
    entities::{FeePlan, FeeRecord, PaymentItem, PaymentItemId, RegressionPoint, UserId},
};

/// Transaction fee engine over an in-memory ledger.
///
/// The payment-item side of the ledger belongs to an external collaborator;
/// this facade exposes exactly the engine's contract with it: seeding items,
/// configuring per-user fee plans, the read-only fee preview
/// (`compute_fee`), and the fee lifecycle (`apply_fee`, `refund_fee`,
/// `recompute_fee`).
pub struct FeeEngine {
    usecase: FeeUsecaseImpl,
    fee_plans: FeePlanRepositoryImpl,
    store: Arc<LedgerStore>,
}

impl FeeEngine {
    pub fn new() -> Self {
        let store = Arc::new(LedgerStore::new());
        Self {
            usecase: FeeUsecaseImpl::new(store.clone()),
            fee_plans: FeePlanRepositoryImpl::new(store.clone()),
            store,
        }
    }

    // Ledger setup.
    // ---

    /// Creates or replaces a payment item.
    pub fn put_payment_item(&self, item: PaymentItem) {
        self.store.put_payment_item(item);
    }

    pub fn payment_item(&self, id: PaymentItemId) -> Option<PaymentItem> {
        self.store.payment_item(id)
    }

    /// Creates or replaces the user's fee plan (at most one per user).
    /// Fails if the plan violates its structural invariants.
    pub async fn set_fee_plan(&self, plan: FeePlan) -> Result<(), ServerError> {
        self.fee_plans.put(plan).await
    }

    // Fee computation + lifecycle.
    // ---

    /// Read-only fee preview; no side effects.
    pub async fn compute_fee(
        &self,
        amount: Decimal,
        user_id: UserId,
    ) -> Result<Decimal, ServerError> {
        self.usecase.compute_fee(amount, user_id).await
    }

    /// Charges the fee against the item's amount and records it. Returns
    /// the fee charged (zero if the plan yields none).
    pub async fn apply_fee(
        &self,
        payment_item_id: PaymentItemId,
        user_id: UserId,
    ) -> Result<Decimal, ServerError> {
        self.usecase.apply_fee(payment_item_id, user_id).await
    }

    /// Deletes the item's fee record, returning the fee that had been
    /// charged (zero if none; idempotent).
    pub async fn refund_fee(&self, payment_item_id: PaymentItemId) -> Result<Decimal, ServerError> {
        self.usecase.refund_fee(payment_item_id).await
    }

    /// Recomputes the item's fee for an edited amount; returns
    /// `(new_fee, adjusted_amount)`.
    pub async fn recompute_fee(
        &self,
        payment_item_id: PaymentItemId,
        new_amount: Decimal,
        user_id: UserId,
    ) -> Result<(Decimal, Decimal), ServerError> {
        self.usecase
            .recompute_fee(payment_item_id, new_amount, user_id)
            .await
    }

    pub fn fee_record(&self, payment_item_id: PaymentItemId) -> Option<FeeRecord> {
        self.store.fee_record(payment_item_id)
    }

    /// Fraction of the user's payment items with absolute amount in
    /// `[lower_bound, upper_bound)`; `None` means unbounded above.
    pub async fn payment_frequency(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> Result<f64, ServerError> {
        self.usecase
            .payment_frequency(user_id, lower_bound, upper_bound)
            .await
    }
}

impl Default for FeeEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Configuration-time helpers (pure functions, no ledger involved).
// ---

/// Derives ascending-power polynomial coefficients from user-authored fee
/// curve points; used when a user edits their fee curve in a
/// plan-configuration workflow.
pub fn fit_regression(points: &[RegressionPoint], max_fee_fraction: f64) -> Vec<f64> {
    polynomial::fit_regression(points, max_fee_fraction)
}

/// Checks a candidate fee formula before it is stored on a plan.
pub fn validate_formula(expression: &str) -> bool {
    formula::validate_formula(expression)
}
