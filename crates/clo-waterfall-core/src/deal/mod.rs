//! Deal definition: tranches, fees, waterfall step lists, coverage-test
//! requirements and the scalar inputs that seed a simulation.

pub mod dates;
pub mod definition;

pub use dates::{months_between, period_for_date};
pub use definition::{
    CoverageTestRequirement, DealDefinition, DealInputs, EquityTerms, FeeDefinition,
    InterestAction, InterestStep, PrincipalAction, PrincipalStep, RateModel,
    TrancheDefinition,
};
