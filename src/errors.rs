use fractic_server_error::{define_client_error, define_internal_error};

use crate::entities::{PaymentItemId, UserId};

// Fee-plan parsing/validation.
define_client_error!(InvalidFeePlanMode, "Invalid fee plan mode: '{mode}'.", { mode: &str });
define_client_error!(
    InvalidAmountTable,
    "Invalid fee plan amount table: {details}.",
    { details: &str }
);
define_client_error!(
    InvalidIntervalData,
    "Invalid fee plan interval data: {details}.",
    { details: &str }
);
define_client_error!(
    InvalidFormula,
    "Invalid fee formula: {details}.",
    { details: &str }
);

// Fee lifecycle.
define_client_error!(
    UnknownPaymentItem,
    "Unknown payment item: {id:?}.",
    { id: &PaymentItemId }
);
define_internal_error!(
    FeeRecordAlreadyExists,
    "A fee record already exists for payment item {id:?}.",
    { id: &PaymentItemId }
);
define_internal_error!(
    FeePlanSerializationError,
    "Could not serialize fee plan for user {user_id:?}.",
    { user_id: &UserId }
);
