//! Persisted deal-state document.
//!
//! The top-level sections of [`DealState`] are the sections of the state
//! file. Every section is required when reading a file back; only fields
//! added after the layout was fixed carry serde defaults.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::DealInputs;
use crate::types::{Money, Period, Rate};

/// Deal-level values. The `initial_*`, date and frequency fields are set
/// once; the `current_*` values move as the simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInfo {
    pub initial_portfolio_value: Money,
    pub current_portfolio_value: Money,
    pub initial_collateral_value: Money,
    pub current_collateral_value: Money,
    pub reinvestment_period_end: Period,
    pub portfolio_was: Rate,
    pub first_coupon_date: NaiveDate,
    pub payment_frequency: u32,
    pub legal_maturity: NaiveDate,
    pub run_date: NaiveDate,
    /// Last period whose waterfalls completed and were persisted.
    #[serde(default)]
    pub last_completed_period: Option<Period>,
}

impl DealInfo {
    pub fn from_inputs(inputs: &DealInputs) -> Self {
        Self {
            initial_portfolio_value: inputs.initial_portfolio_value,
            current_portfolio_value: inputs.current_portfolio_value,
            initial_collateral_value: inputs.initial_portfolio_value,
            current_collateral_value: inputs.current_collateral_value,
            reinvestment_period_end: inputs.reinvestment_period_end,
            portfolio_was: inputs.portfolio_was,
            first_coupon_date: inputs.first_coupon_date,
            payment_frequency: inputs.payment_frequency,
            legal_maturity: inputs.legal_maturity,
            run_date: inputs.run_date,
            last_completed_period: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheState {
    pub balance: Money,
    pub rank: u32,
}

/// One line of the payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub period: Period,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub beneficiary: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredInterestEntry {
    pub period: Period,
    pub amount: Money,
}

impl DeferredInterestEntry {
    pub(crate) fn seed() -> Self {
        Self {
            period: 0,
            amount: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageTestKind {
    Ic,
    Oc,
}

impl CoverageTestKind {
    pub fn label(self) -> &'static str {
        match self {
            CoverageTestKind::Ic => "ic",
            CoverageTestKind::Oc => "oc",
        }
    }
}

/// A cure diversion. The seed entry of each group has no kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTestEvent {
    pub period: Period,
    pub amount: Money,
    pub kind: Option<CoverageTestKind>,
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealState {
    pub deal_info: DealInfo,
    pub deferred_interest: BTreeMap<String, Vec<DeferredInterestEntry>>,
    pub tranches: BTreeMap<String, TrancheState>,
    pub payment_history: Vec<PaymentRecord>,
    pub coverage_test_history: BTreeMap<String, Vec<CoverageTestEvent>>,
    pub sofr: BTreeMap<Period, Rate>,
    pub reserve_accounts: BTreeMap<Period, Money>,
}

impl DealState {
    /// Fresh state with empty ledgers.
    pub fn new(deal_info: DealInfo) -> Self {
        Self {
            deal_info,
            deferred_interest: BTreeMap::new(),
            tranches: BTreeMap::new(),
            payment_history: Vec::new(),
            coverage_test_history: BTreeMap::new(),
            sofr: BTreeMap::new(),
            reserve_accounts: BTreeMap::new(),
        }
    }
}
