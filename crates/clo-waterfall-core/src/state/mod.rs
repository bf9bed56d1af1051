//! Mutable deal state and its persistence.

pub mod records;
pub mod store;

pub use records::{
    CoverageTestEvent, CoverageTestKind, DealInfo, DealState, DeferredInterestEntry,
    PaymentRecord, TrancheState,
};
pub use store::DealStateStore;
