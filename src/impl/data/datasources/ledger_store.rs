use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use fractic_server_error::ServerError;
use rust_decimal::Decimal;

use crate::{
    data::models::fee_plan_model::FeePlanRow,
    entities::{FeeRecord, NewFeeRecord, PaymentItem, PaymentItemId, UserId},
    errors::{FeeRecordAlreadyExists, UnknownPaymentItem},
};

/// In-memory ledger storage.
///
/// All tables live behind a single mutex, so each store call is one atomic
/// unit of work: the compound fee-lifecycle mutations (amount adjustment +
/// record write) cannot be observed half-applied, and the one-record-per-item
/// and one-plan-per-user uniqueness constraints are enforced on insert.
#[derive(Default)]
pub(crate) struct LedgerStore {
    inner: Mutex<LedgerTables>,
}

#[derive(Default)]
struct LedgerTables {
    payment_items: BTreeMap<PaymentItemId, PaymentItem>,
    fee_plans: BTreeMap<UserId, FeePlanRow>,
    fee_records: BTreeMap<PaymentItemId, FeeRecord>,
}

impl LedgerStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerTables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Payment items.
    // ---

    pub(crate) fn put_payment_item(&self, item: PaymentItem) {
        self.lock().payment_items.insert(item.id, item);
    }

    pub(crate) fn payment_item(&self, id: PaymentItemId) -> Option<PaymentItem> {
        self.lock().payment_items.get(&id).cloned()
    }

    pub(crate) fn count_for_user(&self, user_id: UserId) -> u64 {
        self.lock()
            .payment_items
            .values()
            .filter(|item| item.user_id == user_id)
            .count() as u64
    }

    pub(crate) fn count_for_user_in_abs_range(
        &self,
        user_id: UserId,
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
    ) -> u64 {
        self.lock()
            .payment_items
            .values()
            .filter(|item| item.user_id == user_id)
            .filter(|item| {
                let abs = item.amount.abs();
                abs >= lower_bound && upper_bound.map_or(true, |upper| abs < upper)
            })
            .count() as u64
    }

    // Fee plans.
    // ---

    pub(crate) fn put_fee_plan_row(&self, row: FeePlanRow) {
        self.lock().fee_plans.insert(row.user_id, row);
    }

    pub(crate) fn fee_plan_row(&self, user_id: UserId) -> Option<FeePlanRow> {
        self.lock().fee_plans.get(&user_id).cloned()
    }

    // Fee records + lifecycle mutations.
    // ---

    pub(crate) fn fee_record(&self, id: PaymentItemId) -> Option<FeeRecord> {
        self.lock().fee_records.get(&id).cloned()
    }

    pub(crate) fn apply_fee(
        &self,
        record: NewFeeRecord,
        adjusted_amount: Decimal,
    ) -> Result<FeeRecord, ServerError> {
        let mut tables = self.lock();
        if tables.fee_records.contains_key(&record.payment_item_id) {
            return Err(FeeRecordAlreadyExists::new(&record.payment_item_id));
        }
        let item = tables
            .payment_items
            .get_mut(&record.payment_item_id)
            .ok_or_else(|| UnknownPaymentItem::new(&record.payment_item_id))?;
        item.amount = adjusted_amount;
        let record = FeeRecord {
            payment_item_id: record.payment_item_id,
            user_id: record.user_id,
            fee_amount: record.fee_amount,
            original_amount: record.original_amount,
            created_at: Utc::now(),
        };
        tables
            .fee_records
            .insert(record.payment_item_id, record.clone());
        Ok(record)
    }

    pub(crate) fn refund_fee(&self, id: PaymentItemId) -> Option<FeeRecord> {
        self.lock().fee_records.remove(&id)
    }

    pub(crate) fn recompute_fee(
        &self,
        id: PaymentItemId,
        user_id: UserId,
        new_original_amount: Decimal,
        new_fee: Decimal,
        adjusted_amount: Decimal,
    ) -> Result<(), ServerError> {
        let mut tables = self.lock();
        if !tables.payment_items.contains_key(&id) {
            return Err(UnknownPaymentItem::new(&id));
        }

        if new_fee > Decimal::ZERO {
            match tables.fee_records.get_mut(&id) {
                // The existing record keeps its creation time; only the
                // charged fee and the preserved original amount move.
                Some(record) => {
                    record.fee_amount = new_fee;
                    record.original_amount = new_original_amount;
                }
                None => {
                    tables.fee_records.insert(
                        id,
                        FeeRecord {
                            payment_item_id: id,
                            user_id,
                            fee_amount: new_fee,
                            original_amount: new_original_amount,
                            created_at: Utc::now(),
                        },
                    );
                }
            }
        } else {
            tables.fee_records.remove(&id);
        }

        if let Some(item) = tables.payment_items.get_mut(&id) {
            item.amount = adjusted_amount;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn new_record(id: i64, amount: Decimal, fee: Decimal) -> NewFeeRecord {
        NewFeeRecord {
            payment_item_id: PaymentItemId(id),
            user_id: UserId(1),
            fee_amount: fee,
            original_amount: amount,
        }
    }

    #[test]
    fn apply_fee_adjusts_amount_and_writes_record() {
        let store = LedgerStore::new();
        store.put_payment_item(PaymentItem::new(PaymentItemId(1), UserId(1), dec!(-80)));

        let record = store
            .apply_fee(new_record(1, dec!(-80), dec!(2.40)), dec!(-82.40))
            .unwrap();
        assert_eq!(record.fee_amount, dec!(2.40));
        assert_eq!(store.payment_item(PaymentItemId(1)).unwrap().amount, dec!(-82.40));
        assert_eq!(store.fee_record(PaymentItemId(1)), Some(record));
    }

    #[test]
    fn apply_fee_rejects_duplicate_record_without_side_effects() {
        let store = LedgerStore::new();
        store.put_payment_item(PaymentItem::new(PaymentItemId(1), UserId(1), dec!(-80)));
        store
            .apply_fee(new_record(1, dec!(-80), dec!(2.40)), dec!(-82.40))
            .unwrap();

        assert!(store
            .apply_fee(new_record(1, dec!(-82.40), dec!(1.00)), dec!(-83.40))
            .is_err());
        // First write stays intact.
        assert_eq!(store.payment_item(PaymentItemId(1)).unwrap().amount, dec!(-82.40));
        assert_eq!(store.fee_record(PaymentItemId(1)).unwrap().fee_amount, dec!(2.40));
    }

    #[test]
    fn apply_fee_rejects_unknown_item() {
        let store = LedgerStore::new();
        assert!(store
            .apply_fee(new_record(9, dec!(-80), dec!(2.40)), dec!(-82.40))
            .is_err());
    }

    #[test]
    fn refund_removes_the_record_once() {
        let store = LedgerStore::new();
        store.put_payment_item(PaymentItem::new(PaymentItemId(1), UserId(1), dec!(-80)));
        store
            .apply_fee(new_record(1, dec!(-80), dec!(2.40)), dec!(-82.40))
            .unwrap();

        assert!(store.refund_fee(PaymentItemId(1)).is_some());
        assert!(store.refund_fee(PaymentItemId(1)).is_none());
    }

    #[test]
    fn abs_range_counts_are_half_open() {
        let store = LedgerStore::new();
        for (id, amount) in [(1, dec!(-50)), (2, dec!(100)), (3, dec!(-150))] {
            store.put_payment_item(PaymentItem::new(PaymentItemId(id), UserId(1), amount));
        }
        assert_eq!(store.count_for_user(UserId(1)), 3);
        assert_eq!(
            store.count_for_user_in_abs_range(UserId(1), dec!(0), Some(dec!(100))),
            1
        );
        assert_eq!(
            store.count_for_user_in_abs_range(UserId(1), dec!(100), None),
            2
        );
        assert_eq!(store.count_for_user(UserId(2)), 0);
    }
}
