use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde_json::Value;

use clo_waterfall_core::report;
use clo_waterfall_core::state::DealStateStore;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportSection {
    /// Every recorded payment
    Payments,
    /// Payments summed by beneficiary and type
    Totals,
    /// Coverage-test cure diversions
    Coverage,
    /// Deferred interest still owed
    Deferred,
    /// Current tranche balances
    Tranches,
    /// Reference rate and reserves per period
    Periods,
    /// Deal-level values
    Deal,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Deal-state file written by `clo run`
    #[arg(long, default_value = "clo_state.json")]
    pub state: PathBuf,

    #[arg(long, value_enum, default_value = "totals")]
    pub section: ReportSection,

    /// Only rows for this period (payments, coverage and deferred sections)
    #[arg(long)]
    pub period: Option<u32>,

    /// Deferred section: every ledger entry, seeds and settled entries included
    #[arg(long)]
    pub all: bool,
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let store = DealStateStore::open(&args.state)?;
    let state = store.state();
    let keep = |p: u32| args.period.map_or(true, |want| want == p);

    let value = match args.section {
        ReportSection::Payments => serde_json::to_value(
            report::payment_records(state)
                .into_iter()
                .filter(|r| keep(r.period))
                .collect::<Vec<_>>(),
        )?,
        ReportSection::Totals => serde_json::to_value(report::payment_totals(state))?,
        ReportSection::Coverage => serde_json::to_value(
            report::coverage_test_records(state)
                .into_iter()
                .filter(|r| keep(r.period))
                .collect::<Vec<_>>(),
        )?,
        ReportSection::Deferred => serde_json::to_value(
            if args.all {
                report::deferred_interest_log(state)
            } else {
                report::deferred_interest_records(state)
            }
            .into_iter()
            .filter(|r| keep(r.period))
            .collect::<Vec<_>>(),
        )?,
        ReportSection::Tranches => serde_json::to_value(report::tranche_records(state))?,
        ReportSection::Periods => serde_json::to_value(report::period_records(state))?,
        ReportSection::Deal => serde_json::to_value(store.deal_info())?,
    };
    Ok(value)
}
