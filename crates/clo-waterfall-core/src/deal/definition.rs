//! Typed deal definition.
//!
//! Everything the simulation needs to know about a deal before the first
//! period runs: the capital structure, the fee schedule, the ordered
//! interest and principal priority of payments, coverage-test triggers and
//! the scalar deal inputs. Shape and cross-references are checked once by
//! [`DealDefinition::validate`], so the engines can look things up without
//! re-checking at every step.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CloError;
use crate::types::{Money, Period, Rate};
use crate::CloResult;

// ---------------------------------------------------------------------------
// Capital structure
// ---------------------------------------------------------------------------

/// A single class of notes in the capital structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheDefinition {
    /// Class name (e.g. "A-1", "C", "Subordinated notes").
    pub class: String,
    /// Balance at closing.
    pub balance: Money,
    /// Seniority rank; lower is more senior. Classes may share a rank.
    pub rank: u32,
    /// Spread over the reference rate, in percent (1.30 = 130bp).
    #[serde(default)]
    pub spread: Rate,
    /// Preliminary rating. Unrated classes do not absorb default losses.
    #[serde(default)]
    pub rating: Option<String>,
    /// Coverage-test group this class is measured under.
    #[serde(default)]
    pub coverage_test_group: Option<String>,
}

impl TrancheDefinition {
    pub fn is_rated(&self) -> bool {
        self.rating
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A fee or expense paid from interest proceeds as a fraction of collateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub name: String,
    /// Per-period fraction of current collateral value.
    pub rate: Rate,
}

/// Coverage-test triggers for one test group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTestRequirement {
    pub group: String,
    /// Required over-collateralisation ratio, in percent.
    pub oc_required: Rate,
    /// Required interest-coverage ratio, in percent.
    pub ic_required: Rate,
}

// ---------------------------------------------------------------------------
// Priority of payments
// ---------------------------------------------------------------------------

/// Interest priority-of-payments action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestAction {
    /// All-or-nothing fee on collateral value.
    #[serde(rename = "fee/must_pay", alias = "fee_must_pay")]
    FeeMustPay,
    /// Current-pay interest; a shortfall is a senior default.
    Interest,
    /// O/C and I/C tests for a group; cures are diverted to principal.
    CoverageTest,
    /// Interest whose shortfall is deferred.
    DeferrableInterest,
    /// Catch-up of previously deferred interest.
    AccruedInterest,
    /// Equity distribution up to a discounted hurdle.
    Residual,
    /// Share of remaining proceeds to the incentive fee.
    Incentive,
    /// Sweep of everything left once the incentive fee is paid.
    SimpleResidual,
}

impl InterestAction {
    /// Payment-type label used in the payment history.
    pub fn label(self) -> &'static str {
        match self {
            InterestAction::FeeMustPay => "fee/must_pay",
            InterestAction::Interest => "interest",
            InterestAction::CoverageTest => "coverage_test",
            InterestAction::DeferrableInterest => "deferrable_interest",
            InterestAction::AccruedInterest => "accrued_interest",
            InterestAction::Residual => "residual",
            InterestAction::Incentive => "incentive",
            InterestAction::SimpleResidual => "simple_residual",
        }
    }
}

/// Principal priority-of-payments action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalAction {
    /// Sequential paydown of the class balance.
    Principal,
    /// Pro rata paydown of balance and deferred interest.
    PrincipalDeferredInterest,
    /// Deferred interest paid from principal proceeds.
    Interest,
}

impl PrincipalAction {
    pub fn label(self) -> &'static str {
        match self {
            PrincipalAction::Principal => "principal",
            PrincipalAction::PrincipalDeferredInterest => "principal_deferred_interest",
            PrincipalAction::Interest => "interest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestStep {
    pub beneficiary: String,
    pub action: InterestAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalStep {
    pub beneficiary: String,
    pub action: PrincipalAction,
}

// ---------------------------------------------------------------------------
// Scalar inputs and models
// ---------------------------------------------------------------------------

/// Scalar deal inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInputs {
    pub initial_portfolio_value: Money,
    pub current_portfolio_value: Money,
    pub current_collateral_value: Money,
    /// Last period of the reinvestment window.
    pub reinvestment_period_end: Period,
    /// Portfolio weighted-average spread, in percent.
    pub portfolio_was: Rate,
    pub first_coupon_date: NaiveDate,
    /// Payments per year.
    pub payment_frequency: u32,
    pub legal_maturity: NaiveDate,
    /// Valuation date; the simulation starts in the period containing it.
    pub run_date: NaiveDate,
    /// Annual prepayment rate (decimal).
    #[serde(default)]
    pub prepayment_rate: Rate,
    /// Annual default rate (decimal).
    #[serde(default)]
    pub default_rate: Rate,
}

/// Mean-reverting random walk for the reference rate, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateModel {
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,
    #[serde(default = "default_mean_reversion")]
    pub mean_reversion: f64,
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(default = "default_rate_floor")]
    pub floor: f64,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_base_rate() -> f64 {
    5.3
}
fn default_mean_reversion() -> f64 {
    0.02
}
fn default_volatility() -> f64 {
    0.05
}
fn default_rate_floor() -> f64 {
    0.2
}

impl Default for RateModel {
    fn default() -> Self {
        Self {
            base_rate: default_base_rate(),
            mean_reversion: default_mean_reversion(),
            volatility: default_volatility(),
            floor: default_rate_floor(),
            seed: None,
        }
    }
}

/// Terms governing distributions to equity and the incentive fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityTerms {
    /// Class whose outstanding balance switches the incentive fee on.
    #[serde(default = "default_incentive_tranche")]
    pub incentive_tranche: String,
    /// Share of remaining proceeds paid as incentive fee.
    #[serde(default = "default_incentive_share")]
    pub incentive_share: Rate,
    /// Annual hurdle rate for residual distributions (decimal).
    #[serde(default = "default_hurdle_rate")]
    pub hurdle_rate: Rate,
    /// Prior residual payments needed before the hurdle applies.
    #[serde(default = "default_bootstrap_payments")]
    pub bootstrap_payments: usize,
}

fn default_incentive_tranche() -> String {
    "Subordinated notes".to_string()
}
fn default_incentive_share() -> Rate {
    dec!(0.20)
}
fn default_hurdle_rate() -> Rate {
    dec!(0.12)
}
fn default_bootstrap_payments() -> usize {
    5
}

impl Default for EquityTerms {
    fn default() -> Self {
        Self {
            incentive_tranche: default_incentive_tranche(),
            incentive_share: default_incentive_share(),
            hurdle_rate: default_hurdle_rate(),
            bootstrap_payments: default_bootstrap_payments(),
        }
    }
}

/// Scheduled loan maturities: period to fraction of collateral repaid.
pub fn default_balloon_schedule() -> BTreeMap<Period, Rate> {
    BTreeMap::from([(20, dec!(0.30)), (28, dec!(0.30)), (35, dec!(1))])
}

// ---------------------------------------------------------------------------
// Deal definition
// ---------------------------------------------------------------------------

/// Complete definition of a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub inputs: DealInputs,
    /// Classes ordered as in the offering document, senior first.
    pub tranches: Vec<TrancheDefinition>,
    #[serde(default)]
    pub fees: Vec<FeeDefinition>,
    pub interest_waterfall: Vec<InterestStep>,
    pub principal_waterfall: Vec<PrincipalStep>,
    #[serde(default)]
    pub coverage_tests: Vec<CoverageTestRequirement>,
    #[serde(default)]
    pub rate_model: RateModel,
    #[serde(default = "default_balloon_schedule")]
    pub balloon_schedule: BTreeMap<Period, Rate>,
    #[serde(default)]
    pub equity_terms: EquityTerms,
}

impl DealDefinition {
    /// Parse and validate a JSON deal definition.
    pub fn from_json(json: &str) -> CloResult<Self> {
        let definition: DealDefinition = serde_json::from_str(json)
            .map_err(|e| CloError::config("deal definition", e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn tranche(&self, class: &str) -> Option<&TrancheDefinition> {
        self.tranches.iter().find(|t| t.class == class)
    }

    pub fn fee(&self, name: &str) -> Option<&FeeDefinition> {
        self.fees.iter().find(|f| f.name == name)
    }

    pub fn coverage_requirement(&self, group: &str) -> Option<&CoverageTestRequirement> {
        self.coverage_tests.iter().find(|c| c.group == group)
    }

    /// Rank cut-off for a coverage-test group: the most junior rank among
    /// classes assigned to it. When a group mixes ranks the cut-off does not
    /// depend on listing order, so a senior class listed first cannot shrink
    /// the test to itself.
    pub fn coverage_group_rank(&self, group: &str) -> Option<u32> {
        self.tranches
            .iter()
            .filter(|t| t.coverage_test_group.as_deref() == Some(group))
            .map(|t| t.rank)
            .max()
    }

    /// Rated classes in the order they absorb default losses: most junior
    /// rank first, ties in reverse listing order.
    pub fn loss_absorption_order(&self) -> Vec<&TrancheDefinition> {
        let mut rated: Vec<&TrancheDefinition> =
            self.tranches.iter().filter(|t| t.is_rated()).rev().collect();
        rated.sort_by(|a, b| b.rank.cmp(&a.rank));
        rated
    }

    pub fn validate(&self) -> CloResult<()> {
        self.validate_inputs()?;
        self.validate_tranches()?;
        self.validate_fees()?;
        self.validate_coverage_tests()?;
        self.validate_interest_waterfall()?;
        self.validate_principal_waterfall()?;
        self.validate_models()?;
        Ok(())
    }

    fn validate_inputs(&self) -> CloResult<()> {
        let inputs = &self.inputs;
        if inputs.payment_frequency == 0 || 12 % inputs.payment_frequency != 0 {
            return Err(CloError::config(
                "inputs.payment_frequency",
                "Payment frequency must be one of 1, 2, 3, 4, 6 or 12.",
            ));
        }
        for (field, value) in [
            ("inputs.initial_portfolio_value", inputs.initial_portfolio_value),
            ("inputs.current_portfolio_value", inputs.current_portfolio_value),
            ("inputs.current_collateral_value", inputs.current_collateral_value),
        ] {
            if value < Decimal::ZERO {
                return Err(CloError::config(field, "Value cannot be negative."));
            }
        }
        for (field, value) in [
            ("inputs.prepayment_rate", inputs.prepayment_rate),
            ("inputs.default_rate", inputs.default_rate),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(CloError::config(field, "Rate must be in [0, 1]."));
            }
        }
        if inputs.legal_maturity < inputs.run_date {
            return Err(CloError::config(
                "inputs.legal_maturity",
                "Legal maturity cannot precede the run date.",
            ));
        }
        Ok(())
    }

    fn validate_tranches(&self) -> CloResult<()> {
        if self.tranches.is_empty() {
            return Err(CloError::config(
                "tranches",
                "At least one tranche is required.",
            ));
        }
        let mut seen = HashSet::new();
        for t in &self.tranches {
            if t.class.trim().is_empty() {
                return Err(CloError::config("tranches.class", "Class name is empty."));
            }
            if !seen.insert(t.class.as_str()) {
                return Err(CloError::config(
                    format!("tranche.{}", t.class),
                    "Duplicate class name.",
                ));
            }
            if t.balance < Decimal::ZERO {
                return Err(CloError::config(
                    format!("tranche.{}.balance", t.class),
                    "Tranche balance cannot be negative.",
                ));
            }
        }
        Ok(())
    }

    fn validate_fees(&self) -> CloResult<()> {
        for f in &self.fees {
            if f.rate < Decimal::ZERO {
                return Err(CloError::config(
                    format!("fee.{}.rate", f.name),
                    "Fee rate cannot be negative.",
                ));
            }
            if self.tranche(&f.name).is_some() {
                return Err(CloError::config(
                    format!("fee.{}", f.name),
                    "Fee name collides with a tranche class.",
                ));
            }
        }
        Ok(())
    }

    fn validate_coverage_tests(&self) -> CloResult<()> {
        for c in &self.coverage_tests {
            if c.oc_required < Decimal::ZERO || c.ic_required < Decimal::ZERO {
                return Err(CloError::config(
                    format!("coverage_test.{}", c.group),
                    "Required ratios cannot be negative.",
                ));
            }
            if self.coverage_group_rank(&c.group).is_none() {
                return Err(CloError::config(
                    format!("coverage_test.{}", c.group),
                    "No tranche is assigned to this coverage-test group.",
                ));
            }
        }
        Ok(())
    }

    fn validate_interest_waterfall(&self) -> CloResult<()> {
        if self.interest_waterfall.is_empty() {
            return Err(CloError::config(
                "interest_waterfall",
                "At least one interest step is required.",
            ));
        }
        for (i, step) in self.interest_waterfall.iter().enumerate() {
            let field = format!("interest_waterfall[{i}].beneficiary");
            match step.action {
                InterestAction::FeeMustPay => {
                    if self.fee(&step.beneficiary).is_none() {
                        return Err(CloError::config(
                            field,
                            format!("Unknown fee '{}'.", step.beneficiary),
                        ));
                    }
                }
                InterestAction::Interest
                | InterestAction::DeferrableInterest
                | InterestAction::AccruedInterest
                | InterestAction::Residual => self.require_tranche(&field, &step.beneficiary)?,
                InterestAction::CoverageTest => {
                    if self.coverage_requirement(&step.beneficiary).is_none() {
                        return Err(CloError::config(
                            field,
                            format!("No coverage-test requirement for '{}'.", step.beneficiary),
                        ));
                    }
                }
                InterestAction::Incentive | InterestAction::SimpleResidual => {
                    if step.beneficiary.trim().is_empty() {
                        return Err(CloError::config(field, "Beneficiary is empty."));
                    }
                    self.require_tranche(
                        "equity_terms.incentive_tranche",
                        &self.equity_terms.incentive_tranche,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn validate_principal_waterfall(&self) -> CloResult<()> {
        for (i, step) in self.principal_waterfall.iter().enumerate() {
            self.require_tranche(
                &format!("principal_waterfall[{i}].beneficiary"),
                &step.beneficiary,
            )?;
        }
        Ok(())
    }

    fn validate_models(&self) -> CloResult<()> {
        let model = &self.rate_model;
        if !model.volatility.is_finite() || model.volatility < 0.0 {
            return Err(CloError::config(
                "rate_model.volatility",
                "Volatility must be a non-negative number.",
            ));
        }
        if !model.base_rate.is_finite() || !model.mean_reversion.is_finite() || !model.floor.is_finite() {
            return Err(CloError::config(
                "rate_model",
                "Rate model parameters must be finite.",
            ));
        }
        for (period, fraction) in &self.balloon_schedule {
            if *fraction < Decimal::ZERO || *fraction > Decimal::ONE {
                return Err(CloError::config(
                    format!("balloon_schedule.{period}"),
                    "Matured fraction must be in [0, 1].",
                ));
            }
        }
        let terms = &self.equity_terms;
        if terms.incentive_share < Decimal::ZERO || terms.incentive_share > Decimal::ONE {
            return Err(CloError::config(
                "equity_terms.incentive_share",
                "Incentive share must be in [0, 1].",
            ));
        }
        if terms.hurdle_rate <= Decimal::NEGATIVE_ONE {
            return Err(CloError::config(
                "equity_terms.hurdle_rate",
                "Hurdle rate must be greater than -100%.",
            ));
        }
        Ok(())
    }

    fn require_tranche(&self, field: &str, class: &str) -> CloResult<()> {
        if self.tranche(class).is_none() {
            return Err(CloError::config(
                field,
                format!("Unknown tranche '{class}'."),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tranche(class: &str, balance: Money, rank: u32, rating: Option<&str>) -> TrancheDefinition {
        TrancheDefinition {
            class: class.into(),
            balance,
            rank,
            spread: dec!(1.5),
            rating: rating.map(String::from),
            coverage_test_group: None,
        }
    }

    fn sample_definition() -> DealDefinition {
        let mut a = tranche("A", dec!(600), 1, Some("AAA"));
        a.coverage_test_group = Some("A".into());
        DealDefinition {
            name: None,
            inputs: DealInputs {
                initial_portfolio_value: dec!(1000),
                current_portfolio_value: dec!(1000),
                current_collateral_value: dec!(1000),
                reinvestment_period_end: 4,
                portfolio_was: dec!(3.36),
                first_coupon_date: date(2026, 1, 15),
                payment_frequency: 4,
                legal_maturity: date(2030, 1, 15),
                run_date: date(2025, 12, 15),
                prepayment_rate: dec!(0.02),
                default_rate: dec!(0.02),
            },
            tranches: vec![
                a,
                tranche("B", dec!(200), 2, Some("BB")),
                tranche("C", dec!(100), 2, Some("B")),
                tranche("Subordinated notes", dec!(100), 3, None),
            ],
            fees: vec![FeeDefinition {
                name: "Trustee fee".into(),
                rate: dec!(0.0001),
            }],
            interest_waterfall: vec![
                InterestStep {
                    beneficiary: "Trustee fee".into(),
                    action: InterestAction::FeeMustPay,
                },
                InterestStep {
                    beneficiary: "A".into(),
                    action: InterestAction::Interest,
                },
                InterestStep {
                    beneficiary: "A".into(),
                    action: InterestAction::CoverageTest,
                },
                InterestStep {
                    beneficiary: "Incentive fee".into(),
                    action: InterestAction::Incentive,
                },
            ],
            principal_waterfall: vec![PrincipalStep {
                beneficiary: "A".into(),
                action: PrincipalAction::Principal,
            }],
            coverage_tests: vec![CoverageTestRequirement {
                group: "A".into(),
                oc_required: dec!(120),
                ic_required: dec!(110),
            }],
            rate_model: RateModel::default(),
            balloon_schedule: default_balloon_schedule(),
            equity_terms: EquityTerms::default(),
        }
    }

    #[test]
    fn test_sample_definition_is_valid() {
        assert!(sample_definition().validate().is_ok());
    }

    #[test]
    fn test_action_labels_match_serde_names() {
        let json = serde_json::to_string(&InterestAction::FeeMustPay).unwrap();
        assert_eq!(json, "\"fee/must_pay\"");
        let parsed: InterestAction = serde_json::from_str("\"simple_residual\"").unwrap();
        assert_eq!(parsed.label(), "simple_residual");
        let parsed: PrincipalAction =
            serde_json::from_str("\"principal_deferred_interest\"").unwrap();
        assert_eq!(parsed.label(), "principal_deferred_interest");
    }

    #[test]
    fn test_unknown_action_is_rejected_at_parse_time() {
        let parsed: Result<InterestAction, _> = serde_json::from_str("\"turbo\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_loss_absorption_order_is_by_rank_descending() {
        let def = sample_definition();
        let order: Vec<&str> = def
            .loss_absorption_order()
            .iter()
            .map(|t| t.class.as_str())
            .collect();
        // Unrated subordinated notes are excluded; the B/C tie keeps reverse listing order
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_coverage_group_rank() {
        let mut def = sample_definition();
        assert_eq!(def.coverage_group_rank("A"), Some(1));
        def.tranches[1].coverage_test_group = Some("A".into());
        assert_eq!(def.coverage_group_rank("A"), Some(2));
        assert_eq!(def.coverage_group_rank("Z"), None);
    }

    #[test]
    fn test_coverage_group_rank_ignores_listing_order() {
        let mut def = sample_definition();
        def.tranches[1].coverage_test_group = Some("A".into());
        def.tranches.swap(0, 1);
        assert_eq!(def.tranches[0].class, "B");
        assert_eq!(def.coverage_group_rank("A"), Some(2));
        def.tranches.swap(0, 1);
        assert_eq!(def.coverage_group_rank("A"), Some(2));
    }

    #[test]
    fn test_reject_unknown_interest_beneficiary() {
        let mut def = sample_definition();
        def.interest_waterfall[1].beneficiary = "AAA".into();
        assert!(matches!(
            def.validate(),
            Err(CloError::Configuration { .. })
        ));
    }

    #[test]
    fn test_reject_fee_step_without_fee() {
        let mut def = sample_definition();
        def.fees.clear();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_coverage_step_without_requirement() {
        let mut def = sample_definition();
        def.coverage_tests.clear();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_coverage_group_without_members() {
        let mut def = sample_definition();
        def.tranches[0].coverage_test_group = None;
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_incentive_without_reference_tranche() {
        let mut def = sample_definition();
        def.equity_terms.incentive_tranche = "Equity".into();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_bad_frequency() {
        let mut def = sample_definition();
        def.inputs.payment_frequency = 5;
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_duplicate_class() {
        let mut def = sample_definition();
        def.tranches[1].class = "A".into();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_negative_balance() {
        let mut def = sample_definition();
        def.tranches[2].balance = dec!(-1);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_default_rate_out_of_range() {
        let mut def = sample_definition();
        def.inputs.default_rate = dec!(1.5);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_balloon_fraction_above_one() {
        let mut def = sample_definition();
        def.balloon_schedule.insert(10, dec!(1.2));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reject_empty_interest_waterfall() {
        let mut def = sample_definition();
        def.interest_waterfall.clear();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_json_defaults_are_applied() {
        let json = serde_json::json!({
            "inputs": {
                "initial_portfolio_value": "1000",
                "current_portfolio_value": "1000",
                "current_collateral_value": "1000",
                "reinvestment_period_end": 4,
                "portfolio_was": "3.36",
                "first_coupon_date": "2026-01-15",
                "payment_frequency": 4,
                "legal_maturity": "2030-01-15",
                "run_date": "2025-12-15"
            },
            "tranches": [{ "class": "A", "balance": "900", "rank": 1, "spread": "1.3", "rating": "AAA" }],
            "interest_waterfall": [{ "beneficiary": "A", "action": "interest" }],
            "principal_waterfall": [{ "beneficiary": "A", "action": "principal" }]
        });
        let def = DealDefinition::from_json(&json.to_string()).unwrap();
        assert_eq!(def.equity_terms.incentive_tranche, "Subordinated notes");
        assert_eq!(def.balloon_schedule.get(&35), Some(&dec!(1)));
        assert_eq!(def.inputs.default_rate, Decimal::ZERO);
        assert_eq!(def.rate_model.seed, None);
    }

    #[test]
    fn test_from_json_reports_missing_section_as_configuration_error() {
        let err = DealDefinition::from_json("{\"tranches\": []}").unwrap_err();
        assert!(matches!(err, CloError::Configuration { .. }));
    }
}
