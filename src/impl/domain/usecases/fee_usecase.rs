use std::sync::Arc;

use async_trait::async_trait;
use fractic_server_error::ServerError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    data::{
        datasources::ledger_store::LedgerStore,
        repositories::{
            fee_plan_repository_impl::FeePlanRepositoryImpl,
            fee_record_repository_impl::FeeRecordRepositoryImpl,
            payment_item_repository_impl::PaymentItemRepositoryImpl,
        },
    },
    domain::{
        logic::{fee_math, formula, intervals, polynomial},
        repositories::{
            fee_plan_repository::FeePlanRepository, fee_record_repository::FeeRecordRepository,
            payment_item_repository::PaymentItemRepository,
        },
    },
    entities::{FeePlanMode, Interval, NewFeeRecord, PaymentItemId, UserId},
    errors::UnknownPaymentItem,
};

/// The fee engine's operations against one ledger.
///
/// `compute_fee` and `payment_frequency` are read-only; the lifecycle
/// operations (`apply_fee`, `refund_fee`, `recompute_fee`) mutate the ledger
/// through the storage boundary's atomic compound operations.
#[async_trait]
pub trait FeeUsecase: Send + Sync {
    /// Computes the deterministic fee for a signed amount under the user's
    /// fee plan. Never fails for configuration reasons: a missing plan is
    /// zero fee silently, a malformed or unevaluable plan is zero fee with
    /// a logged warning.
    async fn compute_fee(&self, amount: Decimal, user_id: UserId) -> Result<Decimal, ServerError>;

    /// Fraction of the user's payment items whose absolute amount falls in
    /// `[lower_bound, upper_bound)`. Always a live computation over the
    /// current history, so fee percentages self-adjust as the user's
    /// spending distribution shifts.
    async fn payment_frequency(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> Result<f64, ServerError>;

    /// Charges the computed fee against the payment item: subtracts it from
    /// the item's amount and writes the fee record, atomically. Returns the
    /// fee charged (zero means no record was written).
    async fn apply_fee(
        &self,
        payment_item_id: PaymentItemId,
        user_id: UserId,
    ) -> Result<Decimal, ServerError>;

    /// Deletes the item's fee record and returns the fee that had been
    /// charged, or zero if none existed (idempotent). The item's amount is
    /// left untouched; the item itself is typically being deleted by the
    /// caller.
    async fn refund_fee(&self, payment_item_id: PaymentItemId) -> Result<Decimal, ServerError>;

    /// Recomputes the fee after an amount edit: replaces, creates or
    /// deletes the item's fee record to match the new amount and sets the
    /// item's amount to the adjusted value. Returns
    /// `(new_fee, adjusted_amount)`.
    async fn recompute_fee(
        &self,
        payment_item_id: PaymentItemId,
        new_amount: Decimal,
        user_id: UserId,
    ) -> Result<(Decimal, Decimal), ServerError>;
}

pub(crate) struct FeeUsecaseImpl<
    P = PaymentItemRepositoryImpl, // Defaults.
    F = FeePlanRepositoryImpl,
    R = FeeRecordRepositoryImpl,
> where
    P: PaymentItemRepository,
    F: FeePlanRepository,
    R: FeeRecordRepository,
{
    payment_items: P,
    fee_plans: F,
    fee_records: R,
}

impl FeeUsecaseImpl {
    pub(crate) fn new(store: Arc<LedgerStore>) -> Self {
        FeeUsecaseImpl {
            payment_items: PaymentItemRepositoryImpl::new(store.clone()),
            fee_plans: FeePlanRepositoryImpl::new(store.clone()),
            fee_records: FeeRecordRepositoryImpl::new(store),
        }
    }
}

#[async_trait]
impl<P, F, R> FeeUsecase for FeeUsecaseImpl<P, F, R>
where
    P: PaymentItemRepository,
    F: FeePlanRepository,
    R: FeeRecordRepository,
{
    async fn compute_fee(&self, amount: Decimal, user_id: UserId) -> Result<Decimal, ServerError> {
        let abs_amount = amount.abs();

        let plan = match self.fee_plans.find_for_user(user_id).await {
            Ok(plan) => plan,
            // A fee-engine configuration fault must never block a
            // legitimate transaction write.
            Err(e) => {
                warn!(user_id = user_id.0, error = %e, "malformed fee plan; charging no fee");
                return Ok(Decimal::ZERO);
            }
        };
        let Some(plan) = plan else {
            return Ok(Decimal::ZERO);
        };

        let raw_fee = match &plan.mode {
            FeePlanMode::Table { intervals } => {
                self.table_mode_fee(intervals, abs_amount, user_id).await?
            }
            FeePlanMode::Formula { expression } => {
                self.formula_mode_fee(expression, abs_amount, user_id).await?
            }
        };

        Ok(fee_math::finalize_fee(raw_fee, abs_amount))
    }

    async fn payment_frequency(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> Result<f64, ServerError> {
        let total = self.payment_items.count_for_user(user_id).await?;
        if total == 0 {
            return Ok(0.0);
        }
        let matching = self
            .payment_items
            .count_for_user_in_abs_range(user_id, lower_bound, upper_bound)
            .await?;
        Ok(matching as f64 / total as f64)
    }

    async fn apply_fee(
        &self,
        payment_item_id: PaymentItemId,
        user_id: UserId,
    ) -> Result<Decimal, ServerError> {
        let item = self
            .payment_items
            .find(payment_item_id)
            .await?
            .ok_or_else(|| UnknownPaymentItem::new(&payment_item_id))?;

        let original_amount = item.amount;
        let fee = self.compute_fee(original_amount, user_id).await?;
        if fee <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let adjusted_amount = fee_math::apply_fee_to_amount(original_amount, fee);
        self.fee_records
            .apply(
                NewFeeRecord {
                    payment_item_id,
                    user_id,
                    fee_amount: fee,
                    original_amount,
                },
                adjusted_amount,
            )
            .await?;
        Ok(fee)
    }

    async fn refund_fee(&self, payment_item_id: PaymentItemId) -> Result<Decimal, ServerError> {
        Ok(self
            .fee_records
            .refund(payment_item_id)
            .await?
            .map(|record| record.fee_amount)
            .unwrap_or(Decimal::ZERO))
    }

    async fn recompute_fee(
        &self,
        payment_item_id: PaymentItemId,
        new_amount: Decimal,
        user_id: UserId,
    ) -> Result<(Decimal, Decimal), ServerError> {
        let new_fee = self.compute_fee(new_amount, user_id).await?;
        let adjusted_amount = if new_fee > Decimal::ZERO {
            fee_math::apply_fee_to_amount(new_amount, new_fee)
        } else {
            new_amount
        };
        self.fee_records
            .recompute(payment_item_id, user_id, new_amount, new_fee, adjusted_amount)
            .await?;
        Ok((new_fee, adjusted_amount))
    }
}

impl<P, F, R> FeeUsecaseImpl<P, F, R>
where
    P: PaymentItemRepository,
    F: FeePlanRepository,
    R: FeeRecordRepository,
{
    async fn table_mode_fee(
        &self,
        table: &[Interval],
        abs_amount: Decimal,
        user_id: UserId,
    ) -> Result<Decimal, ServerError> {
        let Some(matched) = intervals::classify(table, abs_amount) else {
            return Ok(Decimal::ZERO);
        };
        let Some(curve) = &matched.interval.curve else {
            // No curve configured for this interval means no fee.
            return Ok(Decimal::ZERO);
        };

        let frequency = self
            .payment_frequency(user_id, matched.interval.lower_bound, matched.upper_bound)
            .await?;
        let raw_fraction = polynomial::evaluate(&curve.coefficients, frequency);
        let fraction = raw_fraction.clamp(0.0, curve.max_fee_fraction);
        Ok(fee_math::fraction_of_amount(abs_amount, fraction))
    }

    async fn formula_mode_fee(
        &self,
        expression: &str,
        abs_amount: Decimal,
        user_id: UserId,
    ) -> Result<Decimal, ServerError> {
        if expression.is_empty() {
            return Ok(Decimal::ZERO);
        }
        // The formula sees x = absolute amount, y = the user's overall
        // payment frequency.
        let frequency = self
            .payment_frequency(user_id, Decimal::ZERO, None)
            .await?;
        let x = abs_amount.to_f64().unwrap_or(0.0);
        match formula::evaluate_formula(expression, x, frequency) {
            // The formula's (absolute) result is the raw fee itself, in
            // money; capping and rounding happen in the shared
            // finalization step.
            Ok(raw) => Ok(Decimal::from_f64(raw.abs()).unwrap_or(Decimal::ZERO)),
            Err(e) => {
                warn!(user_id = user_id.0, error = %e, "fee formula failed to evaluate; charging no fee");
                Ok(Decimal::ZERO)
            }
        }
    }
}
