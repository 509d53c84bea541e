// Crate-internal.
// ---

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod ledger_store;
    }
    pub(crate) mod models {
        pub(crate) mod fee_plan_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod fee_plan_repository_impl;
        pub(crate) mod fee_record_repository_impl;
        pub(crate) mod payment_item_repository_impl;
    }
}

pub(crate) mod domain {
    pub(crate) mod entities {
        pub(crate) mod fee_plan;
        pub(crate) mod fee_record;
        pub(crate) mod payment_item;
    }
    pub(crate) mod logic {
        pub(crate) mod fee_math;
        pub(crate) mod formula;
        pub(crate) mod intervals;
        pub(crate) mod polynomial;
    }
    pub(crate) mod repositories {
        pub(crate) mod fee_plan_repository;
        pub(crate) mod fee_record_repository;
        pub(crate) mod payment_item_repository;
    }
    pub(crate) mod usecases {
        pub(crate) mod fee_usecase;
    }
}

// Public exports.
// ---

#[doc(hidden)]
#[allow(unused_imports)]
pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod entities {
        pub use crate::domain::entities::fee_plan::*;
        pub use crate::domain::entities::fee_record::*;
        pub use crate::domain::entities::payment_item::*;
    }
}
