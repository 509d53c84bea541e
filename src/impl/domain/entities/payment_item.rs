use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaymentItemId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// A single ledger transaction, owned by one user.
///
/// Negative amounts are expenses, positive amounts are income. Only the
/// fields the fee engine reads are modeled here; the full payment item
/// (category, recipient, dates, attachments) lives with the external
/// payment-ledger collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentItem {
    pub id: PaymentItemId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub description: String,
}

impl PaymentItem {
    pub fn new(id: PaymentItemId, user_id: UserId, amount: Decimal) -> Self {
        Self {
            id,
            user_id,
            amount,
            description: String::new(),
        }
    }
}
