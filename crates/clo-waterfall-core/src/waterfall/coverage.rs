//! O/C and I/C coverage tests.
//!
//! A test group is measured at a rank cut-off: every class ranked at or
//! above the most junior class in the group counts towards it.
//! - O/C ratio = collateral value / sum of balances × 100
//! - I/C ratio = interest collected / sum of periodic interest due × 100
//!
//! A breach sizes the cure as the gap between the required and the current
//! ratio applied to the same denominator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::DealDefinition;
use crate::error::CloError;
use crate::state::DealStateStore;
use crate::types::{Money, Rate};
use crate::waterfall::periodic_interest;
use crate::CloResult;

/// Result of measuring one coverage-test group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTestOutcome {
    pub group: String,
    pub rank_cutoff: u32,
    /// Outstanding balance of classes at or above the cut-off.
    pub balance_sum: Money,
    /// Periodic interest due on those classes.
    pub interest_due_sum: Money,
    pub oc_ratio: Rate,
    pub oc_required: Rate,
    pub oc_cure_required: Money,
    pub ic_ratio: Rate,
    pub ic_required: Rate,
    pub ic_cure_required: Money,
}

impl CoverageTestOutcome {
    pub fn oc_pass(&self) -> bool {
        self.oc_ratio >= self.oc_required
    }

    pub fn ic_pass(&self) -> bool {
        self.ic_ratio >= self.ic_required
    }
}

/// Measure a coverage-test group against current balances.
///
/// Returns `None` when the classes in scope have no balance or no interest
/// due; there is nothing to test then.
pub fn evaluate_coverage_test(
    definition: &DealDefinition,
    store: &DealStateStore,
    group: &str,
    interest_collected: Money,
    rate: Rate,
) -> CloResult<Option<CoverageTestOutcome>> {
    let requirement = definition.coverage_requirement(group).ok_or_else(|| {
        CloError::config(
            format!("coverage_test.{group}"),
            "No coverage-test requirement for this group.",
        )
    })?;
    let rank_cutoff = definition.coverage_group_rank(group).ok_or_else(|| {
        CloError::config(
            format!("coverage_test.{group}"),
            "No tranche is assigned to this coverage-test group.",
        )
    })?;

    let info = store.deal_info();
    let mut balance_sum = Decimal::ZERO;
    let mut interest_due_sum = Decimal::ZERO;
    for (class, tranche) in store.tranches() {
        if tranche.rank > rank_cutoff {
            continue;
        }
        let spread = definition
            .tranche(class)
            .map(|t| t.spread)
            .ok_or_else(|| CloError::config(format!("tranche.{class}"), "Tranche is not defined."))?;
        balance_sum += tranche.balance;
        interest_due_sum += periodic_interest(tranche.balance, rate, spread, info.payment_frequency);
    }

    if balance_sum <= Decimal::ZERO || interest_due_sum <= Decimal::ZERO {
        return Ok(None);
    }

    let hundred = dec!(100);
    let oc_ratio = info.current_collateral_value / balance_sum * hundred;
    let ic_ratio = interest_collected / interest_due_sum * hundred;

    let oc_cure_required = if oc_ratio < requirement.oc_required {
        balance_sum * (requirement.oc_required / hundred) - balance_sum * (oc_ratio / hundred)
    } else {
        Decimal::ZERO
    };
    let ic_cure_required = if ic_ratio < requirement.ic_required {
        interest_due_sum * (requirement.ic_required / hundred)
            - interest_due_sum * (ic_ratio / hundred)
    } else {
        Decimal::ZERO
    };

    Ok(Some(CoverageTestOutcome {
        group: group.to_string(),
        rank_cutoff,
        balance_sum,
        interest_due_sum,
        oc_ratio,
        oc_required: requirement.oc_required,
        oc_cure_required: oc_cure_required.max(Decimal::ZERO),
        ic_ratio,
        ic_required: requirement.ic_required,
        ic_cure_required: ic_cure_required.max(Decimal::ZERO),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{
        CoverageTestRequirement, DealInputs, EquityTerms, InterestAction, InterestStep,
        RateModel, TrancheDefinition,
    };
    use crate::state::{DealInfo, DealState};
    use chrono::NaiveDate;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn definition(oc_required: Rate, ic_required: Rate) -> DealDefinition {
        DealDefinition {
            name: None,
            inputs: DealInputs {
                initial_portfolio_value: dec!(1_000_000),
                current_portfolio_value: dec!(1_000_000),
                current_collateral_value: dec!(1_000_000),
                reinvestment_period_end: 4,
                portfolio_was: dec!(2),
                first_coupon_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                payment_frequency: 4,
                legal_maturity: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
                run_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
                prepayment_rate: Decimal::ZERO,
                default_rate: Decimal::ZERO,
            },
            tranches: vec![
                TrancheDefinition {
                    class: "A".into(),
                    balance: dec!(600_000),
                    rank: 1,
                    spread: dec!(1),
                    rating: Some("AAA".into()),
                    coverage_test_group: Some("A/B".into()),
                },
                TrancheDefinition {
                    class: "B".into(),
                    balance: dec!(300_000),
                    rank: 2,
                    spread: dec!(2),
                    rating: Some("AA".into()),
                    coverage_test_group: Some("A/B".into()),
                },
                TrancheDefinition {
                    class: "Subordinated notes".into(),
                    balance: dec!(100_000),
                    rank: 3,
                    spread: Decimal::ZERO,
                    rating: None,
                    coverage_test_group: None,
                },
            ],
            fees: vec![],
            interest_waterfall: vec![InterestStep {
                beneficiary: "A/B".into(),
                action: InterestAction::CoverageTest,
            }],
            principal_waterfall: vec![],
            coverage_tests: vec![CoverageTestRequirement {
                group: "A/B".into(),
                oc_required,
                ic_required,
            }],
            rate_model: RateModel::default(),
            balloon_schedule: Default::default(),
            equity_terms: EquityTerms::default(),
        }
    }

    fn store_for(def: &DealDefinition) -> DealStateStore {
        let mut store =
            DealStateStore::in_memory(DealState::new(DealInfo::from_inputs(&def.inputs)));
        store.initialize_tranches(&def.tranches);
        store
    }

    #[test]
    fn test_oc_breach_sizes_cure() {
        let def = definition(dec!(120), Decimal::ZERO);
        let store = store_for(&def);
        let outcome = evaluate_coverage_test(&def, &store, "A/B", dec!(17_500), dec!(5))
            .unwrap()
            .unwrap();
        assert_eq!(outcome.rank_cutoff, 2);
        assert_eq!(outcome.balance_sum, dec!(900_000));
        // 1,000,000 / 900,000 = 111.1%
        assert!(approx_eq(outcome.oc_ratio, dec!(111.1111), dec!(0.001)));
        assert!(!outcome.oc_pass());
        // 900,000 × 1.20 − 900,000 × 1.111 = 80,000
        assert!(approx_eq(outcome.oc_cure_required, dec!(80_000), dec!(0.01)));
    }

    #[test]
    fn test_ic_ratio_uses_interest_due_of_classes_in_scope() {
        let def = definition(Decimal::ZERO, dec!(150));
        let store = store_for(&def);
        let outcome = evaluate_coverage_test(&def, &store, "A/B", dec!(15_000), dec!(5))
            .unwrap()
            .unwrap();
        // A: 600,000 × 6% / 4 = 9,000; B: 300,000 × 7% / 4 = 5,250
        assert_eq!(outcome.interest_due_sum, dec!(14_250));
        assert!(!outcome.ic_pass());
        // 14,250 × 1.5 − 15,000 = 6,375
        assert!(approx_eq(outcome.ic_cure_required, dec!(6_375), dec!(0.01)));
        assert!(outcome.oc_pass());
        assert_eq!(outcome.oc_cure_required, Decimal::ZERO);
    }

    #[test]
    fn test_passing_tests_need_no_cure() {
        let def = definition(dec!(105), dec!(100));
        let store = store_for(&def);
        let outcome = evaluate_coverage_test(&def, &store, "A/B", dec!(20_000), dec!(5))
            .unwrap()
            .unwrap();
        assert!(outcome.oc_pass() && outcome.ic_pass());
        assert_eq!(outcome.oc_cure_required + outcome.ic_cure_required, Decimal::ZERO);
    }

    #[test]
    fn test_retired_classes_are_not_tested() {
        let def = definition(dec!(120), dec!(120));
        let mut store = store_for(&def);
        store.set_tranche_balance("A", Decimal::ZERO);
        store.set_tranche_balance("B", Decimal::ZERO);
        let outcome = evaluate_coverage_test(&def, &store, "A/B", dec!(17_500), dec!(5)).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_unknown_group_is_a_configuration_error() {
        let def = definition(dec!(120), dec!(120));
        let store = store_for(&def);
        assert!(evaluate_coverage_test(&def, &store, "C", dec!(1), dec!(5)).is_err());
    }
}
