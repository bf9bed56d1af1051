//! Period-stepping simulation: collateral defaults, prepayments and
//! balloons, the reference-rate path and the two waterfalls in order.

pub mod cashflow;
pub mod rates;

pub use cashflow::{CashflowEngine, PeriodSummary, Phase, RunOutcome, SimulationOutput};
pub use rates::simulate_rate_path;
