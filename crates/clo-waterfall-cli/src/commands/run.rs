use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use clo_waterfall_core::engine::{CashflowEngine, PeriodSummary, RunOutcome, SimulationOutput};
use clo_waterfall_core::state::DealStateStore;
use clo_waterfall_core::types::with_metadata;
use clo_waterfall_core::{Money, Period};

use crate::input;

#[derive(Args)]
pub struct RunArgs {
    /// Deal definition (.json, .yaml or .yml); JSON on stdin otherwise
    #[arg(long)]
    pub deal: Option<String>,

    /// Deal-state file; an existing file is resumed
    #[arg(long, default_value = "clo_state.json")]
    pub state: PathBuf,

    /// Seed for the reference-rate path
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include the per-period breakdown
    #[arg(long)]
    pub detail: bool,
}

#[derive(Serialize)]
struct RunSummary {
    deal: Option<String>,
    outcome: RunOutcome,
    first_period: Period,
    last_period: Option<Period>,
    periods_run: usize,
    interest_collected: Money,
    principal_collected: Money,
    defaults: Money,
    coverage_cures: Money,
    interest_deferred: Money,
    reserves: Money,
    ending_collateral_value: Money,
    ending_portfolio_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    periods: Option<Vec<PeriodSummary>>,
}

pub fn run_simulation(args: RunArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut definition = input::read_deal(args.deal.as_deref())?;
    if args.seed.is_some() {
        definition.rate_model.seed = args.seed;
    }

    let store = DealStateStore::load(&args.state, &definition.inputs)?;
    let mut engine = CashflowEngine::new(&definition, store)?;
    let output = engine.run()?;
    info!("deal state written to {}", args.state.display());

    let info = engine.store().deal_info();
    let mut warnings = Vec::new();
    let cures = total_cures(&output);
    if cures > Decimal::ZERO {
        warnings.push(format!("Coverage-test cures diverted {} from interest", cures.round_dp(2)));
    }
    let deferred: Money = output.periods.iter().map(|p| p.interest.deferred).sum();
    if deferred > Decimal::ZERO {
        warnings.push(format!("Interest deferred this run: {}", deferred.round_dp(2)));
    }

    let summary = RunSummary {
        deal: definition.name.clone(),
        outcome: output.outcome,
        first_period: output.first_period,
        last_period: output.last_period,
        periods_run: output.periods.len(),
        interest_collected: output.total_interest_collected(),
        principal_collected: output.total_principal_collected(),
        defaults: output.total_defaults(),
        coverage_cures: cures,
        interest_deferred: deferred,
        reserves: output.periods.iter().map(period_reserves).sum(),
        ending_collateral_value: info.current_collateral_value,
        ending_portfolio_value: info.current_portfolio_value,
        periods: args.detail.then(|| output.periods.clone()),
    };

    let assumptions = json!({
        "state": args.state.display().to_string(),
        "rate_model": definition.rate_model,
        "prepayment_rate": definition.inputs.prepayment_rate,
        "default_rate": definition.inputs.default_rate,
    });
    let result = with_metadata(
        "Period-by-period CLO interest and principal waterfall",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        Some(info.run_date),
        summary,
    );
    Ok(serde_json::to_value(result)?)
}

fn total_cures(output: &SimulationOutput) -> Money {
    output.periods.iter().map(|p| p.interest.total_diverted()).sum()
}

/// Cash swept to reserves in a period across every waterfall run.
fn period_reserves(summary: &PeriodSummary) -> Money {
    let cures: Money = summary
        .interest
        .cures
        .iter()
        .map(|c| c.principal.reserve_sweep)
        .sum();
    let principal = summary
        .principal
        .as_ref()
        .map(|p| p.reserve_sweep)
        .unwrap_or(Decimal::ZERO);
    summary.interest.reserve_sweep + cures + principal
}
