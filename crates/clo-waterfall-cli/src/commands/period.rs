use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};

use clo_waterfall_core::deal::period_for_date;

use crate::input;

#[derive(Args)]
pub struct PeriodArgs {
    /// Date to place, as YYYY-MM-DD
    #[arg(long)]
    pub date: NaiveDate,

    /// Deal definition supplying the first coupon date and frequency
    #[arg(long)]
    pub deal: Option<String>,
}

pub fn run_period_lookup(args: PeriodArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let definition = input::read_deal(args.deal.as_deref())?;
    let inputs = &definition.inputs;
    let period = period_for_date(args.date, inputs.first_coupon_date, inputs.payment_frequency)?;
    let reinvesting = period <= inputs.reinvestment_period_end;
    Ok(json!({
        "date": args.date,
        "period": period,
        "first_coupon_date": inputs.first_coupon_date,
        "payment_frequency": inputs.payment_frequency,
        "reinvestment_period": reinvesting,
    }))
}
