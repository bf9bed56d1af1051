//! Interest and principal priority-of-payments engines.
//!
//! Both engines consume one pool of cash for one period, walking their
//! configured steps in order and threading the remaining pool through each
//! step. Whatever is left after the last step is swept to the period's
//! reserve account, so every run ends with an empty pool.

pub mod coverage;
pub mod interest;
pub mod principal;

pub use coverage::{evaluate_coverage_test, CoverageTestOutcome};
pub use interest::{CoverageCure, InterestWaterfallEngine, InterestWaterfallResult};
pub use principal::{PrincipalWaterfallEngine, PrincipalWaterfallResult};

use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CloError;
use crate::state::DealStateStore;
use crate::types::{Money, Period, Rate};
use crate::CloResult;

/// Beneficiary and payment-type label used for reserve sweeps.
pub const RESERVES: &str = "reserves";

/// Amount paid by a single waterfall step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPayment {
    pub beneficiary: String,
    pub action: String,
    pub amount: Money,
}

/// Periodic coupon on a balance: `balance × ((rate + spread) / 100) / frequency`.
pub fn periodic_interest(balance: Money, rate: Rate, spread: Rate, payment_frequency: u32) -> Money {
    balance * ((rate + spread) / dec!(100)) / Decimal::from(payment_frequency)
}

/// Sweep what is left of a pool into the period's reserve account and log
/// it. Sweeps from several runs in the same period accumulate.
pub(crate) fn sweep_to_reserves(store: &mut DealStateStore, period: Period, remaining: Money) -> Money {
    let total = store.reserve_account(period) + remaining;
    store.set_reserve_account(period, total);
    store.record_payment(period, RESERVES, RESERVES, remaining);
    debug!("period {period}: swept {remaining} to reserves");
    remaining
}

pub(crate) fn ensure_drained(period: Period, waterfall: &str, leftover: Money) -> CloResult<()> {
    if leftover.is_zero() {
        Ok(())
    } else {
        Err(CloError::WaterfallImbalance {
            period,
            waterfall: waterfall.to_string(),
            leftover,
        })
    }
}
