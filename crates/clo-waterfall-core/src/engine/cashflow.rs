use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::{period_for_date, DealDefinition, TrancheDefinition};
use crate::engine::rates::simulate_rate_path;
use crate::error::CloError;
use crate::state::DealStateStore;
use crate::types::{Money, Period, Rate};
use crate::waterfall::{
    InterestWaterfallEngine, InterestWaterfallResult, PrincipalWaterfallEngine,
    PrincipalWaterfallResult,
};
use crate::CloResult;

/// Prepayments are quoted on a quarterly basis regardless of coupon
/// frequency.
const PREPAYMENT_PERIODS_PER_YEAR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Principal proceeds are reinvested; only the interest waterfall runs.
    Reinvestment,
    Amortization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    CollateralExhausted,
    Matured,
}

/// What happened in one simulated period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: Period,
    pub phase: Phase,
    pub rate: Rate,
    pub default_amount: Money,
    pub prepayment: Money,
    pub balloon: Money,
    pub interest: InterestWaterfallResult,
    /// Present in the amortization phase only.
    pub principal: Option<PrincipalWaterfallResult>,
    pub ending_collateral_value: Money,
    pub ending_portfolio_value: Money,
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub first_period: Period,
    pub last_period: Option<Period>,
    pub outcome: RunOutcome,
    pub periods: Vec<PeriodSummary>,
}

impl SimulationOutput {
    pub fn total_interest_collected(&self) -> Money {
        self.periods.iter().map(|p| p.interest.interest_collected).sum()
    }

    pub fn total_defaults(&self) -> Money {
        self.periods.iter().map(|p| p.default_amount).sum()
    }

    pub fn total_principal_collected(&self) -> Money {
        self.periods
            .iter()
            .filter_map(|p| p.principal.as_ref())
            .map(|p| p.principal_available)
            .sum()
    }
}

/// Collateral cash flows for one period, before the waterfalls run.
struct CollateralFlows {
    default_amount: Money,
    prepayment: Money,
    balloon: Money,
}

/// Drives a deal from its current period to collateral exhaustion or legal
/// maturity, persisting the store after every period.
pub struct CashflowEngine<'a> {
    definition: &'a DealDefinition,
    store: DealStateStore,
    loss_order: Vec<&'a TrancheDefinition>,
}

impl<'a> CashflowEngine<'a> {
    /// Validate the definition and seed tranche balances if the store has
    /// none yet.
    pub fn new(definition: &'a DealDefinition, mut store: DealStateStore) -> CloResult<Self> {
        definition.validate()?;
        if !store.has_tranches() {
            store.initialize_tranches(&definition.tranches);
        }
        Ok(Self {
            definition,
            store,
            loss_order: definition.loss_absorption_order(),
        })
    }

    pub fn store(&self) -> &DealStateStore {
        &self.store
    }

    pub fn into_store(self) -> DealStateStore {
        self.store
    }

    /// Period the next run starts from.
    pub fn start_period(&self) -> CloResult<Period> {
        let info = self.store.deal_info();
        match info.last_completed_period {
            Some(p) => Ok(p + 1),
            None => period_for_date(info.run_date, info.first_coupon_date, info.payment_frequency),
        }
    }

    pub fn maturity_period(&self) -> CloResult<Period> {
        let info = self.store.deal_info();
        period_for_date(
            info.legal_maturity,
            info.first_coupon_date,
            info.payment_frequency,
        )
    }

    /// Run the simulation to completion.
    ///
    /// A senior default or an unbalanced waterfall stops the run. The
    /// half-applied period is written to the store's `.failed` file for
    /// inspection, the state is rolled back to the end of the last completed
    /// period and saved, and the error is returned. A rerun therefore
    /// restarts the failed period from clean state.
    pub fn run(&mut self) -> CloResult<SimulationOutput> {
        let first_period = self.start_period()?;
        let maturity = self.maturity_period()?;
        self.ensure_rate_curve(first_period, maturity)?;

        info!(
            "simulating periods {first_period}..={maturity} from collateral {}",
            self.store.deal_info().current_collateral_value
        );

        let mut periods = Vec::new();
        let mut period = first_period;
        while self.store.deal_info().current_collateral_value > Decimal::ZERO && period <= maturity
        {
            let last_good = self.store.state().clone();
            match self.run_period(period) {
                Ok(summary) => {
                    self.store.set_last_completed_period(period);
                    self.store.save()?;
                    periods.push(summary);
                }
                Err(e) => {
                    error!("stopping at period {period}: {e}");
                    if let Some(failed) = self.store.save_failed()? {
                        warn!("partial state of period {period} written to {}", failed.display());
                    }
                    self.store.restore(last_good);
                    self.store.save()?;
                    return Err(e);
                }
            }
            period += 1;
        }

        let outcome = if self.store.deal_info().current_collateral_value <= Decimal::ZERO {
            RunOutcome::CollateralExhausted
        } else {
            RunOutcome::Matured
        };
        info!("simulation finished: {outcome:?} after {} periods", periods.len());

        Ok(SimulationOutput {
            first_period,
            last_period: periods.last().map(|p| p.period),
            outcome,
            periods,
        })
    }

    /// Simulate rates only for periods the store has no rate for.
    fn ensure_rate_curve(&mut self, first: Period, last: Period) -> CloResult<()> {
        if (first..=last).all(|p| self.store.rate_for_period(p).is_some()) {
            return Ok(());
        }
        let path = simulate_rate_path(&self.definition.rate_model, first..=last)?;
        self.store.extend_rate_curve(path);
        Ok(())
    }

    /// Run one period: defaults, rate lookup, collateral flows, interest
    /// waterfall, then principal waterfall outside the reinvestment window.
    pub fn run_period(&mut self, period: Period) -> CloResult<PeriodSummary> {
        let definition = self.definition;
        let phase = if period <= self.store.deal_info().reinvestment_period_end {
            Phase::Reinvestment
        } else {
            Phase::Amortization
        };

        let default_amount = self.apply_defaults(period)?;
        let rate = self.store.rate_for_period(period).ok_or_else(|| {
            CloError::Storage(format!("no reference rate for period {period}"))
        })?;
        let flows = self.collateral_flows(period, default_amount);

        let principal_engine = PrincipalWaterfallEngine::new(&definition.principal_waterfall);
        let interest_engine = InterestWaterfallEngine::new(definition, &principal_engine);
        let interest = interest_engine.run(&mut self.store, period, rate)?;

        let principal = match phase {
            Phase::Reinvestment => None,
            Phase::Amortization => {
                let proceeds = flows.prepayment + flows.balloon;
                let collateral = self.store.deal_info().current_collateral_value - proceeds;
                self.store.set_current_collateral_value(collateral);
                Some(principal_engine.run(&mut self.store, period, proceeds)?)
            }
        };

        let info = self.store.deal_info();
        info!(
            "period {period} ({phase:?}): rate {rate}, collected {}, collateral {}, notes {}",
            interest.interest_collected.round_dp(2),
            info.current_collateral_value.round_dp(2),
            info.current_portfolio_value.round_dp(2)
        );

        Ok(PeriodSummary {
            period,
            phase,
            rate,
            default_amount: flows.default_amount,
            prepayment: flows.prepayment,
            balloon: flows.balloon,
            interest,
            principal,
            ending_collateral_value: info.current_collateral_value,
            ending_portfolio_value: info.current_portfolio_value,
        })
    }

    /// Write down collateral by the period's defaults and push the loss
    /// through the rated classes, most junior first. Whatever the rated
    /// classes cannot absorb falls to equity.
    fn apply_defaults(&mut self, period: Period) -> CloResult<Money> {
        let info = self.store.deal_info();
        let default_amount = info.current_collateral_value * self.definition.inputs.default_rate
            / Decimal::from(info.payment_frequency);
        let collateral = info.current_collateral_value - default_amount;
        self.store.set_current_collateral_value(collateral);

        let mut loss = default_amount;
        for tranche in &self.loss_order {
            if loss <= Decimal::ZERO {
                break;
            }
            let balance = self.store.tranche_balance(&tranche.class)?;
            let absorbed = balance.min(loss);
            if absorbed > Decimal::ZERO {
                self.store.set_tranche_balance(&tranche.class, balance - absorbed);
                debug!("period {period}: {} absorbs {absorbed} of defaults", tranche.class);
                loss -= absorbed;
            }
        }
        if loss > Decimal::ZERO {
            debug!("period {period}: {loss} of defaults left to equity");
        }

        let portfolio_value = self.store.total_tranche_balance();
        self.store.set_current_portfolio_value(portfolio_value);
        Ok(default_amount)
    }

    /// Prepayment and balloon proceeds on post-default collateral. The
    /// prepayment is capped so the two never exceed the collateral.
    fn collateral_flows(&self, period: Period, default_amount: Money) -> CollateralFlows {
        let collateral = self.store.deal_info().current_collateral_value;
        let balloon_fraction = self
            .definition
            .balloon_schedule
            .get(&period)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let balloon = collateral * balloon_fraction;
        let prepayment = (collateral * self.definition.inputs.prepayment_rate
            / Decimal::from(PREPAYMENT_PERIODS_PER_YEAR))
        .min(collateral - balloon)
        .max(Decimal::ZERO);
        CollateralFlows {
            default_amount,
            prepayment,
            balloon,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
