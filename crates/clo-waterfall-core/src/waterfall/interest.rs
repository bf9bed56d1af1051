//! Interest priority of payments.
//!
//! Interest collected for a period is
//! `collateral value × ((rate + portfolio spread) / 100) / frequency`.
//! It runs through the configured steps in order: senior fees, current-pay
//! interest, coverage tests, deferrable and accrued interest, the equity
//! residual, the incentive fee and the final sweep. A coverage-test breach
//! diverts cash into the principal waterfall before the next step runs.

use log::{debug, error, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::{DealDefinition, InterestAction, InterestStep};
use crate::error::CloError;
use crate::state::{CoverageTestKind, DealStateStore};
use crate::time_value;
use crate::types::{Money, Period, Rate};
use crate::waterfall::coverage::evaluate_coverage_test;
use crate::waterfall::principal::{PrincipalWaterfallEngine, PrincipalWaterfallResult};
use crate::waterfall::{ensure_drained, periodic_interest, sweep_to_reserves, StepPayment};
use crate::CloResult;

/// A coverage-test cure diverted from interest into principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCure {
    pub group: String,
    pub kind: CoverageTestKind,
    /// Ratio measured before any cure this period, in percent.
    pub ratio: Rate,
    pub required: Rate,
    pub diverted: Money,
    /// The principal-waterfall run the cure paid for.
    pub principal: PrincipalWaterfallResult,
}

/// Outcome of one interest-waterfall run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestWaterfallResult {
    pub period: Period,
    pub rate: Rate,
    pub interest_collected: Money,
    pub payments: Vec<StepPayment>,
    pub cures: Vec<CoverageCure>,
    /// Interest newly deferred this period.
    pub deferred: Money,
    pub reserve_sweep: Money,
}

impl InterestWaterfallResult {
    /// Total paid by the steps (cures included), excluding the reserve sweep.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn total_diverted(&self) -> Money {
        self.cures.iter().map(|c| c.diverted).sum()
    }
}

/// Per-run bookkeeping threaded through the steps.
struct RunContext {
    period: Period,
    rate: Rate,
    interest_collected: Money,
    last_incentive_paid: Money,
    deferred: Money,
    cures: Vec<CoverageCure>,
}

pub struct InterestWaterfallEngine<'a> {
    definition: &'a DealDefinition,
    principal: &'a PrincipalWaterfallEngine<'a>,
}

impl<'a> InterestWaterfallEngine<'a> {
    pub fn new(definition: &'a DealDefinition, principal: &'a PrincipalWaterfallEngine<'a>) -> Self {
        Self {
            definition,
            principal,
        }
    }

    /// Interest collected on the current collateral at `rate`.
    pub fn interest_collections(&self, store: &DealStateStore, rate: Rate) -> Money {
        let info = store.deal_info();
        info.current_collateral_value * ((rate + info.portfolio_was) / dec!(100))
            / Decimal::from(info.payment_frequency)
    }

    /// Distribute one period's interest at reference `rate` (percent).
    pub fn run(
        &self,
        store: &mut DealStateStore,
        period: Period,
        rate: Rate,
    ) -> CloResult<InterestWaterfallResult> {
        let interest_collected = self.interest_collections(store, rate);
        let mut remaining = interest_collected;
        let mut payments = Vec::with_capacity(self.definition.interest_waterfall.len());
        let mut ctx = RunContext {
            period,
            rate,
            interest_collected,
            last_incentive_paid: Decimal::ZERO,
            deferred: Decimal::ZERO,
            cures: Vec::new(),
        };

        for step in &self.definition.interest_waterfall {
            let paid = self.apply_step(store, &mut ctx, step, remaining)?;
            remaining -= paid;
            store.record_payment(period, step.action.label(), &step.beneficiary, paid);
            debug!(
                "period {period}: interest step {} to {} paid {paid}",
                step.action.label(),
                step.beneficiary
            );
            payments.push(StepPayment {
                beneficiary: step.beneficiary.clone(),
                action: step.action.label().to_string(),
                amount: paid,
            });
        }

        let reserve_sweep = sweep_to_reserves(store, period, remaining);
        remaining -= reserve_sweep;
        ensure_drained(period, "interest", remaining)?;

        Ok(InterestWaterfallResult {
            period,
            rate,
            interest_collected,
            payments,
            cures: ctx.cures,
            deferred: ctx.deferred,
            reserve_sweep,
        })
    }

    fn apply_step(
        &self,
        store: &mut DealStateStore,
        ctx: &mut RunContext,
        step: &InterestStep,
        remaining: Money,
    ) -> CloResult<Money> {
        let name = step.beneficiary.as_str();
        match step.action {
            InterestAction::FeeMustPay => self.fee_must_pay(store, name, remaining),
            InterestAction::Interest => self.current_pay(store, ctx, name, remaining),
            InterestAction::CoverageTest => self.coverage_test(store, ctx, name, remaining),
            InterestAction::DeferrableInterest => {
                self.deferrable_interest(store, ctx, name, remaining)
            }
            InterestAction::AccruedInterest => Ok(accrued_interest(store, ctx, name, remaining)),
            InterestAction::Residual => {
                self.residual(store, ctx.period, name, step.action.label(), remaining)
            }
            InterestAction::Incentive => {
                let paid = self.incentive(store, remaining)?;
                ctx.last_incentive_paid = paid;
                Ok(paid)
            }
            InterestAction::SimpleResidual => {
                if ctx.last_incentive_paid > Decimal::ZERO {
                    Ok(remaining)
                } else {
                    Ok(Decimal::ZERO)
                }
            }
        }
    }

    /// All or nothing: the fee is paid only when the pool covers it.
    fn fee_must_pay(&self, store: &DealStateStore, fee: &str, remaining: Money) -> CloResult<Money> {
        let rate = self
            .definition
            .fee(fee)
            .map(|f| f.rate)
            .ok_or_else(|| CloError::config(format!("fee.{fee}"), "Fee is not defined."))?;
        let due = store.deal_info().current_collateral_value * rate;
        if remaining >= due {
            Ok(due)
        } else {
            warn!("fee {fee} due {due} not paid: only {remaining} available");
            Ok(Decimal::ZERO)
        }
    }

    fn interest_due(&self, store: &DealStateStore, class: &str, rate: Rate) -> CloResult<Money> {
        let spread = self
            .definition
            .tranche(class)
            .map(|t| t.spread)
            .ok_or_else(|| CloError::config(format!("tranche.{class}"), "Tranche is not defined."))?;
        let balance = store.tranche_balance(class)?;
        Ok(periodic_interest(
            balance,
            rate,
            spread,
            store.deal_info().payment_frequency,
        ))
    }

    /// Current-pay interest. Any shortfall is an event of default.
    fn current_pay(
        &self,
        store: &DealStateStore,
        ctx: &RunContext,
        class: &str,
        remaining: Money,
    ) -> CloResult<Money> {
        let due = self.interest_due(store, class, ctx.rate)?;
        if due > remaining {
            error!(
                "period {}: senior default on {class}: due {due}, available {remaining}",
                ctx.period
            );
            return Err(CloError::SeniorDefault {
                period: ctx.period,
                tranche: class.to_string(),
                due,
                available: remaining,
            });
        }
        Ok(due)
    }

    fn deferrable_interest(
        &self,
        store: &mut DealStateStore,
        ctx: &mut RunContext,
        class: &str,
        remaining: Money,
    ) -> CloResult<Money> {
        let due = self.interest_due(store, class, ctx.rate)?;
        let paid = due.min(remaining).max(Decimal::ZERO);
        let deferred = due - paid;
        store.add_deferred_interest(ctx.period, class, deferred);
        if deferred > Decimal::ZERO {
            warn!("period {}: deferring {deferred} of {class} interest", ctx.period);
            ctx.deferred += deferred;
        }
        Ok(paid)
    }

    /// Run the O/C then the I/C test for a group, diverting each cure
    /// through the principal waterfall as it is sized.
    fn coverage_test(
        &self,
        store: &mut DealStateStore,
        ctx: &mut RunContext,
        group: &str,
        remaining: Money,
    ) -> CloResult<Money> {
        let Some(outcome) =
            evaluate_coverage_test(self.definition, store, group, ctx.interest_collected, ctx.rate)?
        else {
            return Ok(Decimal::ZERO);
        };

        let mut available = remaining;
        let mut diverted_total = Decimal::ZERO;
        let tests = [
            (
                CoverageTestKind::Oc,
                outcome.oc_pass(),
                outcome.oc_ratio,
                outcome.oc_required,
                outcome.oc_cure_required,
            ),
            (
                CoverageTestKind::Ic,
                outcome.ic_pass(),
                outcome.ic_ratio,
                outcome.ic_required,
                outcome.ic_cure_required,
            ),
        ];
        for (kind, pass, ratio, required, cure_required) in tests {
            if pass {
                continue;
            }
            let diverted = available.min(cure_required);
            warn!(
                "period {}: {group} {} test at {} below {required}; diverting {diverted}",
                ctx.period,
                kind.label(),
                ratio.round_dp(4)
            );
            store.record_coverage_test_event(ctx.period, group, diverted, kind);
            let principal = self.principal.run(store, ctx.period, diverted)?;
            available -= diverted;
            diverted_total += diverted;
            ctx.cures.push(CoverageCure {
                group: group.to_string(),
                kind,
                ratio,
                required,
                diverted,
                principal,
            });
        }
        Ok(diverted_total)
    }

    /// Equity distribution up to a discounted hurdle.
    ///
    /// Prior distributions of the same type, together with the closing
    /// balance as an outlay at period 0, are valued at the hurdle rate; the
    /// payment is whatever brings that value back to zero at this period.
    /// Until enough history exists the whole pool is paid.
    fn residual(
        &self,
        store: &DealStateStore,
        period: Period,
        class: &str,
        label: &str,
        remaining: Money,
    ) -> CloResult<Money> {
        if store.tranche_balance(class)?.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let terms = &self.definition.equity_terms;
        let closing_balance = self
            .definition
            .tranche(class)
            .map(|t| t.balance)
            .ok_or_else(|| CloError::config(format!("tranche.{class}"), "Tranche is not defined."))?;

        let mut flows: Vec<(Money, Period)> = vec![(-closing_balance, 0)];
        flows.extend(
            store
                .payments()
                .iter()
                .filter(|p| p.beneficiary == class && p.payment_type == label)
                .map(|p| (p.amount, p.period)),
        );
        if flows.len() - 1 < terms.bootstrap_payments {
            return Ok(remaining);
        }

        let periodic_rate = terms.hurdle_rate / Decimal::from(store.deal_info().payment_frequency);
        let value = time_value::present_value(periodic_rate, &flows)?;
        let due = time_value::future_value(periodic_rate, -value, period)?;
        Ok(due.max(Decimal::ZERO).min(remaining))
    }

    /// Incentive fee: a flat share of what is left while the reference
    /// class is still outstanding.
    fn incentive(&self, store: &DealStateStore, remaining: Money) -> CloResult<Money> {
        let terms = &self.definition.equity_terms;
        if store.tranche_balance(&terms.incentive_tranche)?.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(terms.incentive_share * remaining)
    }
}

/// Catch-up of interest deferred in earlier periods. The unpaid part is
/// re-recorded at the current period.
fn accrued_interest(
    store: &mut DealStateStore,
    ctx: &mut RunContext,
    class: &str,
    remaining: Money,
) -> Money {
    let prior = ctx.period.saturating_sub(1);
    let due = store.outstanding_deferred_interest(class, prior);
    if due.is_zero() {
        return Decimal::ZERO;
    }
    let paid = due.min(remaining).max(Decimal::ZERO);
    let shortfall = due - paid;
    store.settle_deferred_interest(class, prior, due);
    store.add_deferred_interest(ctx.period, class, shortfall);
    paid
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
