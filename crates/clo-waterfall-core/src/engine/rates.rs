use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use statrs::distribution::Normal;

use crate::deal::RateModel;
use crate::error::CloError;
use crate::types::{Period, Rate};
use crate::CloResult;

/// Draw a reference-rate path, in percent, for every period in `periods`.
///
/// Each period is `max(floor, base - mean_reversion + N(0, volatility))`.
/// With a seed the path is reproducible; zero volatility gives a flat path.
pub fn simulate_rate_path(
    model: &RateModel,
    periods: RangeInclusive<Period>,
) -> CloResult<BTreeMap<Period, Rate>> {
    let shock = if model.volatility > 0.0 {
        Some(Normal::new(0.0, model.volatility).map_err(|e| CloError::Configuration {
            field: "rate_model.volatility".into(),
            reason: format!("Invalid Normal parameters: {e}"),
        })?)
    } else {
        None
    };
    let mut rng = match model.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mut path = BTreeMap::new();
    for period in periods {
        let noise = shock.map(|n| rng.sample(n)).unwrap_or(0.0);
        let rate = (model.base_rate - model.mean_reversion + noise).max(model.floor);
        let rate = Decimal::from_f64(rate)
            .ok_or_else(|| CloError::Arithmetic {
                context: format!("rate for period {period}"),
            })?
            .round_dp(6);
        path.insert(period, rate);
    }
    Ok(path)
}
