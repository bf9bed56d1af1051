//! Principal priority of payments.
//!
//! Sequential amortization of class balances, pro rata catch-up of
//! principal together with deferred interest, and repayment of deferred
//! interest out of principal proceeds. The engine is also entered from the
//! interest waterfall whenever a coverage-test cure is diverted.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::{PrincipalAction, PrincipalStep};
use crate::state::DealStateStore;
use crate::types::{Money, Period};
use crate::waterfall::{ensure_drained, sweep_to_reserves, StepPayment};
use crate::CloResult;

/// Outcome of one principal-waterfall run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalWaterfallResult {
    pub period: Period,
    /// Pool the run started with.
    pub principal_available: Money,
    pub payments: Vec<StepPayment>,
    /// Unallocated principal swept to reserves.
    pub reserve_sweep: Money,
}

impl PrincipalWaterfallResult {
    /// Total paid by the steps, excluding the reserve sweep.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

/// Cash split of one principal step.
struct StepOutcome {
    principal: Money,
    deferred_interest: Money,
}

impl StepOutcome {
    fn total(&self) -> Money {
        self.principal + self.deferred_interest
    }
}

pub struct PrincipalWaterfallEngine<'a> {
    steps: &'a [PrincipalStep],
}

impl<'a> PrincipalWaterfallEngine<'a> {
    pub fn new(steps: &'a [PrincipalStep]) -> Self {
        Self { steps }
    }

    /// Distribute `principal_available` for `period`.
    pub fn run(
        &self,
        store: &mut DealStateStore,
        period: Period,
        principal_available: Money,
    ) -> CloResult<PrincipalWaterfallResult> {
        let mut remaining = principal_available;
        let mut payments = Vec::with_capacity(self.steps.len());

        for step in self.steps {
            let class = step.beneficiary.as_str();
            let outcome = match step.action {
                PrincipalAction::Principal => pay_principal(store, class, remaining)?,
                PrincipalAction::PrincipalDeferredInterest => {
                    pay_pro_rata(store, period, class, remaining)?
                }
                PrincipalAction::Interest => pay_deferred_interest(store, period, class, remaining),
            };
            let label = step.action.label();
            match step.action {
                // Principal and deferred-interest shares are logged separately
                PrincipalAction::PrincipalDeferredInterest => {
                    store.record_payment(period, label, class, outcome.principal);
                    store.record_payment(period, label, class, outcome.deferred_interest);
                }
                _ => store.record_payment(period, label, class, outcome.total()),
            }
            debug!("period {period}: principal step {label} to {class} paid {}", outcome.total());
            remaining -= outcome.total();
            payments.push(StepPayment {
                beneficiary: step.beneficiary.clone(),
                action: label.to_string(),
                amount: outcome.total(),
            });
        }

        let reserve_sweep = sweep_to_reserves(store, period, remaining);
        remaining -= reserve_sweep;
        let portfolio_value = store.total_tranche_balance();
        store.set_current_portfolio_value(portfolio_value);
        ensure_drained(period, "principal", remaining)?;

        Ok(PrincipalWaterfallResult {
            period,
            principal_available,
            payments,
            reserve_sweep,
        })
    }
}

/// Pay down the class balance as far as the pool allows.
fn pay_principal(store: &mut DealStateStore, class: &str, remaining: Money) -> CloResult<StepOutcome> {
    let balance = store.tranche_balance(class)?;
    let paid = remaining.min(balance).max(Decimal::ZERO);
    store.set_tranche_balance(class, balance - paid);
    Ok(StepOutcome {
        principal: paid,
        deferred_interest: Decimal::ZERO,
    })
}

/// Split the pool between balance and prior deferred interest in proportion
/// to the two amounts owed. The deferred interest is settled in full and
/// the unpaid part re-recorded at the current period.
fn pay_pro_rata(
    store: &mut DealStateStore,
    period: Period,
    class: &str,
    remaining: Money,
) -> CloResult<StepOutcome> {
    let balance = store.tranche_balance(class)?;
    let prior = period.saturating_sub(1);
    let deferred = store.outstanding_deferred_interest(class, prior);
    let owed = balance + deferred;
    if owed <= Decimal::ZERO || remaining <= Decimal::ZERO {
        return Ok(StepOutcome {
            principal: Decimal::ZERO,
            deferred_interest: Decimal::ZERO,
        });
    }

    let principal = (remaining * balance / owed).min(balance);
    let deferred_interest = (remaining - principal).min(deferred);

    store.set_tranche_balance(class, balance - principal);
    store.settle_deferred_interest(class, prior, deferred);
    store.add_deferred_interest(period, class, deferred - deferred_interest);

    Ok(StepOutcome {
        principal,
        deferred_interest,
    })
}

/// Pay deferred interest outstanding through this period; the shortfall
/// moves to the next period.
fn pay_deferred_interest(
    store: &mut DealStateStore,
    period: Period,
    class: &str,
    remaining: Money,
) -> StepOutcome {
    let due = store.outstanding_deferred_interest(class, period);
    let paid = due.min(remaining).max(Decimal::ZERO);
    let shortfall = due - paid;
    store.settle_deferred_interest(class, period, due);
    store.add_deferred_interest(period + 1, class, shortfall);
    if shortfall > Decimal::ZERO {
        warn!("period {period}: {class} deferred interest shortfall {shortfall} carried forward");
    }
    StepOutcome {
        principal: Decimal::ZERO,
        deferred_interest: paid,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
