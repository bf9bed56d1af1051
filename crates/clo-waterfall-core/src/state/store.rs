//! Deal-state store.
//!
//! Owns the [`DealState`] document and, when opened against a file, its
//! persistence. All mutation goes through the methods below; none of them
//! validate across entities, that is the callers' job.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::deal::{DealInputs, TrancheDefinition};
use crate::error::CloError;
use crate::state::records::{
    CoverageTestEvent, CoverageTestKind, DealInfo, DealState, DeferredInterestEntry,
    PaymentRecord, TrancheState,
};
use crate::types::{Money, Period, Rate};
use crate::CloResult;

#[derive(Debug, Clone)]
pub struct DealStateStore {
    path: Option<PathBuf>,
    state: DealState,
}

impl DealStateStore {
    /// Store that is never written to disk.
    pub fn in_memory(state: DealState) -> Self {
        Self { path: None, state }
    }

    /// Restore the state file at `path`, or start from `inputs` when no file
    /// exists yet. A file that exists but does not parse is a storage error.
    pub fn load(path: impl Into<PathBuf>, inputs: &DealInputs) -> CloResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let state = read_state(&path)?;
            info!(
                "restored deal state from {} (last completed period: {:?})",
                path.display(),
                state.deal_info.last_completed_period
            );
            state
        } else {
            info!("no state at {}; initializing deal state", path.display());
            DealState::new(DealInfo::from_inputs(inputs))
        };
        Ok(Self {
            path: Some(path),
            state,
        })
    }

    /// Read a state file that must already exist.
    pub fn open(path: impl Into<PathBuf>) -> CloResult<Self> {
        let path = path.into();
        let state = read_state(&path)?;
        Ok(Self {
            path: Some(path),
            state,
        })
    }

    /// Write the whole state: serialize to a sibling temporary file, then
    /// rename it over the target. No-op for in-memory stores.
    pub fn save(&self) -> CloResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_state(path, &self.state)?;
        debug!("saved deal state to {}", path.display());
        Ok(())
    }

    /// Write the current, possibly half-applied, state next to the state
    /// file (`<file>.failed`) without touching the file itself. Returns the
    /// path written, or `None` for in-memory stores.
    pub fn save_failed(&self) -> CloResult<Option<PathBuf>> {
        let Some(failed) = self.failed_path() else {
            return Ok(None);
        };
        write_state(&failed, &self.state)?;
        Ok(Some(failed))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Where [`save_failed`](Self::save_failed) writes.
    pub fn failed_path(&self) -> Option<PathBuf> {
        self.path.as_ref().map(|p| suffixed(p, ".failed"))
    }

    /// Replace the in-memory state, e.g. to roll back a failed period.
    pub fn restore(&mut self, state: DealState) {
        self.state = state;
    }

    pub fn state(&self) -> &DealState {
        &self.state
    }

    pub fn into_state(self) -> DealState {
        self.state
    }

    // -----------------------------------------------------------------------
    // Deal info
    // -----------------------------------------------------------------------

    pub fn deal_info(&self) -> &DealInfo {
        &self.state.deal_info
    }

    pub fn set_current_collateral_value(&mut self, value: Money) {
        self.state.deal_info.current_collateral_value = value;
    }

    pub fn set_current_portfolio_value(&mut self, value: Money) {
        self.state.deal_info.current_portfolio_value = value;
    }

    pub fn set_last_completed_period(&mut self, period: Period) {
        self.state.deal_info.last_completed_period = Some(period);
    }

    // -----------------------------------------------------------------------
    // Tranches
    // -----------------------------------------------------------------------

    pub fn has_tranches(&self) -> bool {
        !self.state.tranches.is_empty()
    }

    /// Seed tranche balances and ranks from closing definitions.
    pub fn initialize_tranches<'a>(
        &mut self,
        tranches: impl IntoIterator<Item = &'a TrancheDefinition>,
    ) {
        for t in tranches {
            self.state.tranches.insert(
                t.class.clone(),
                TrancheState {
                    balance: t.balance,
                    rank: t.rank,
                },
            );
        }
    }

    pub fn tranches(&self) -> &BTreeMap<String, TrancheState> {
        &self.state.tranches
    }

    pub fn tranche_balance(&self, class: &str) -> CloResult<Money> {
        self.state
            .tranches
            .get(class)
            .map(|t| t.balance)
            .ok_or_else(|| CloError::Storage(format!("tranche '{class}' is not in the deal state")))
    }

    pub fn set_tranche_balance(&mut self, class: &str, balance: Money) {
        match self.state.tranches.get_mut(class) {
            Some(t) => t.balance = balance,
            None => warn!("ignoring balance update for unknown tranche '{class}'"),
        }
    }

    pub fn total_tranche_balance(&self) -> Money {
        self.state.tranches.values().map(|t| t.balance).sum()
    }

    // -----------------------------------------------------------------------
    // Payment history
    // -----------------------------------------------------------------------

    pub fn record_payment(
        &mut self,
        period: Period,
        payment_type: &str,
        beneficiary: &str,
        amount: Money,
    ) {
        self.state.payment_history.push(PaymentRecord {
            period,
            payment_type: payment_type.to_string(),
            beneficiary: beneficiary.to_string(),
            amount,
        });
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.state.payment_history
    }

    // -----------------------------------------------------------------------
    // Deferred interest
    // -----------------------------------------------------------------------

    /// Add to the entry for `period`, creating it (and the period-0 seed)
    /// when missing. Entries stay sorted by period.
    pub fn add_deferred_interest(&mut self, period: Period, tranche: &str, amount: Money) {
        let entries = self
            .state
            .deferred_interest
            .entry(tranche.to_string())
            .or_insert_with(|| vec![DeferredInterestEntry::seed()]);
        match entries.binary_search_by_key(&period, |e| e.period) {
            Ok(i) => entries[i].amount += amount,
            Err(i) => entries.insert(i, DeferredInterestEntry { period, amount }),
        }
    }

    /// Amount recorded against exactly `period`.
    pub fn deferred_interest_at(&self, tranche: &str, period: Period) -> Money {
        self.state
            .deferred_interest
            .get(tranche)
            .and_then(|entries| entries.iter().find(|e| e.period == period))
            .map(|e| e.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Deferred interest still owed from entries up to and including
    /// `through_period`.
    pub fn outstanding_deferred_interest(&self, tranche: &str, through_period: Period) -> Money {
        self.state
            .deferred_interest
            .get(tranche)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.period <= through_period)
                    .map(|e| e.amount)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Reduce outstanding deferred interest up to `through_period` by
    /// `amount`, oldest entry first. Entries are kept at zero rather than
    /// removed. Returns the amount actually settled.
    pub fn settle_deferred_interest(
        &mut self,
        tranche: &str,
        through_period: Period,
        amount: Money,
    ) -> Money {
        let Some(entries) = self.state.deferred_interest.get_mut(tranche) else {
            return Decimal::ZERO;
        };
        let mut left = amount;
        for entry in entries.iter_mut().filter(|e| e.period <= through_period) {
            if left <= Decimal::ZERO {
                break;
            }
            if entry.amount <= Decimal::ZERO {
                continue;
            }
            let take = entry.amount.min(left);
            entry.amount -= take;
            left -= take;
        }
        amount - left
    }

    pub fn deferred_interest(&self) -> &BTreeMap<String, Vec<DeferredInterestEntry>> {
        &self.state.deferred_interest
    }

    // -----------------------------------------------------------------------
    // Coverage tests
    // -----------------------------------------------------------------------

    pub fn record_coverage_test_event(
        &mut self,
        period: Period,
        group: &str,
        amount: Money,
        kind: CoverageTestKind,
    ) {
        self.state
            .coverage_test_history
            .entry(group.to_string())
            .or_insert_with(|| {
                vec![CoverageTestEvent {
                    period: 0,
                    amount: Decimal::ZERO,
                    kind: None,
                }]
            })
            .push(CoverageTestEvent {
                period,
                amount,
                kind: Some(kind),
            });
    }

    pub fn coverage_test_history(&self) -> &BTreeMap<String, Vec<CoverageTestEvent>> {
        &self.state.coverage_test_history
    }

    // -----------------------------------------------------------------------
    // Reserves and rates
    // -----------------------------------------------------------------------

    pub fn set_reserve_account(&mut self, period: Period, amount: Money) {
        self.state.reserve_accounts.insert(period, amount);
    }

    pub fn reserve_account(&self, period: Period) -> Money {
        self.state
            .reserve_accounts
            .get(&period)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn rate_for_period(&self, period: Period) -> Option<Rate> {
        self.state.sofr.get(&period).copied()
    }

    pub fn rate_curve(&self) -> &BTreeMap<Period, Rate> {
        &self.state.sofr
    }

    /// Add simulated rates for periods that have none; persisted rates win.
    pub fn extend_rate_curve(&mut self, curve: BTreeMap<Period, Rate>) {
        for (period, rate) in curve {
            self.state.sofr.entry(period).or_insert(rate);
        }
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_state(path: &Path, state: &DealState) -> CloResult<()> {
    let json = serde_json::to_string_pretty(state)?;
    let tmp = suffixed(path, ".tmp");
    fs::write(&tmp, json)
        .map_err(|e| CloError::Storage(format!("failed to write '{}': {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        CloError::Storage(format!("failed to replace '{}': {e}", path.display()))
    })
}

fn read_state(path: &Path) -> CloResult<DealState> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CloError::Storage(format!("failed to read '{}': {e}", path.display())))?;
    serde_json::from_str(&contents).map_err(|e| {
        CloError::Storage(format!("invalid deal state in '{}': {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_inputs() -> DealInputs {
        DealInputs {
            initial_portfolio_value: dec!(1_000_000),
            current_portfolio_value: dec!(1_000_000),
            current_collateral_value: dec!(1_000_000),
            reinvestment_period_end: 4,
            portfolio_was: dec!(2),
            first_coupon_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            payment_frequency: 4,
            legal_maturity: NaiveDate::from_ymd_opt(2028, 1, 15).unwrap(),
            run_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            prepayment_rate: dec!(0.02),
            default_rate: dec!(0.02),
        }
    }

    fn memory_store() -> DealStateStore {
        let mut store =
            DealStateStore::in_memory(DealState::new(DealInfo::from_inputs(&sample_inputs())));
        store.initialize_tranches(&[TrancheDefinition {
            class: "C".into(),
            balance: dec!(500),
            rank: 3,
            spread: dec!(3),
            rating: Some("A".into()),
            coverage_test_group: None,
        }]);
        store
    }

    #[test]
    fn test_add_deferred_interest_seeds_and_increments() {
        let mut store = memory_store();
        store.add_deferred_interest(2, "C", dec!(10));
        store.add_deferred_interest(2, "C", dec!(5));
        let entries = &store.deferred_interest()["C"];
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], DeferredInterestEntry::seed());
        assert_eq!(entries[1].amount, dec!(15));
    }

    #[test]
    fn test_add_deferred_interest_keeps_period_order() {
        let mut store = memory_store();
        store.add_deferred_interest(3, "C", dec!(1));
        store.add_deferred_interest(2, "C", dec!(2));
        let periods: Vec<Period> = store.deferred_interest()["C"]
            .iter()
            .map(|e| e.period)
            .collect();
        assert_eq!(periods, vec![0, 2, 3]);
    }

    #[test]
    fn test_outstanding_and_settle_oldest_first() {
        let mut store = memory_store();
        store.add_deferred_interest(1, "C", dec!(10));
        store.add_deferred_interest(2, "C", dec!(20));
        store.add_deferred_interest(3, "C", dec!(40));
        assert_eq!(store.outstanding_deferred_interest("C", 2), dec!(30));

        let settled = store.settle_deferred_interest("C", 2, dec!(15));
        assert_eq!(settled, dec!(15));
        assert_eq!(store.deferred_interest_at("C", 1), dec!(0));
        assert_eq!(store.deferred_interest_at("C", 2), dec!(15));
        assert_eq!(store.deferred_interest_at("C", 3), dec!(40));
        // Entries are zeroed, never removed
        assert_eq!(store.deferred_interest()["C"].len(), 4);
    }

    #[test]
    fn test_settle_is_capped_at_outstanding() {
        let mut store = memory_store();
        store.add_deferred_interest(1, "C", dec!(10));
        assert_eq!(store.settle_deferred_interest("C", 1, dec!(25)), dec!(10));
        assert_eq!(store.settle_deferred_interest("D", 1, dec!(25)), dec!(0));
    }

    #[test]
    fn test_coverage_history_is_seeded() {
        let mut store = memory_store();
        store.record_coverage_test_event(3, "A/B", dec!(80_000), CoverageTestKind::Oc);
        let events = &store.coverage_test_history()["A/B"];
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, None);
        assert_eq!(events[1].kind, Some(CoverageTestKind::Oc));
    }

    #[test]
    fn test_reserve_account_upserts() {
        let mut store = memory_store();
        store.set_reserve_account(1, dec!(10));
        store.set_reserve_account(1, dec!(12));
        assert_eq!(store.reserve_account(1), dec!(12));
        assert_eq!(store.reserve_account(2), dec!(0));
    }

    #[test]
    fn test_unknown_tranche_balance_is_an_error() {
        let store = memory_store();
        assert!(store.tranche_balance("Z").is_err());
        assert_eq!(store.tranche_balance("C").unwrap(), dec!(500));
    }

    #[test]
    fn test_extend_rate_curve_keeps_persisted_rates() {
        let mut store = memory_store();
        store.extend_rate_curve(BTreeMap::from([(1, dec!(5.1))]));
        store.extend_rate_curve(BTreeMap::from([(1, dec!(9.9)), (2, dec!(5.2))]));
        assert_eq!(store.rate_for_period(1), Some(dec!(5.1)));
        assert_eq!(store.rate_for_period(2), Some(dec!(5.2)));
    }

    #[test]
    fn test_save_then_load_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clo_state.json");
        let mut store = DealStateStore::load(&path, &sample_inputs()).unwrap();
        store.initialize_tranches(&[TrancheDefinition {
            class: "A".into(),
            balance: dec!(900_000.125),
            rank: 1,
            spread: dec!(1.3),
            rating: Some("AAA".into()),
            coverage_test_group: None,
        }]);
        store.record_payment(1, "interest", "A", dec!(17_500.5));
        store.add_deferred_interest(1, "A", dec!(3.25));
        store.record_coverage_test_event(1, "A", dec!(7), CoverageTestKind::Ic);
        store.set_reserve_account(1, dec!(0.01));
        store.extend_rate_curve(BTreeMap::from([(1, dec!(5.28))]));
        store.set_last_completed_period(1);
        store.save().unwrap();

        let reloaded = DealStateStore::load(&path, &sample_inputs()).unwrap();
        assert_eq!(reloaded.state(), store.state());
    }

    #[test]
    fn test_load_rejects_structurally_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clo_state.json");
        fs::write(&path, r#"{"deal_info": {}, "tranches": {}}"#).unwrap();
        let err = DealStateStore::load(&path, &sample_inputs()).unwrap_err();
        assert!(matches!(err, CloError::Storage(_)));
    }

    #[test]
    fn test_save_failed_leaves_state_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clo_state.json");
        let mut store = DealStateStore::load(&path, &sample_inputs()).unwrap();
        store.save().unwrap();
        let good = store.state().clone();

        store.record_payment(1, "fee/must_pay", "Trustee", dec!(100));
        let failed = store.save_failed().unwrap().unwrap();
        assert_eq!(failed, dir.path().join("clo_state.json.failed"));
        assert_eq!(DealStateStore::open(&failed).unwrap().payments().len(), 1);
        assert_eq!(DealStateStore::open(&path).unwrap().state(), &good);

        store.restore(good.clone());
        assert_eq!(store.state(), &good);
    }

    #[test]
    fn test_in_memory_store_has_no_failed_file() {
        let store = memory_store();
        assert_eq!(store.failed_path(), None);
        assert_eq!(store.save_failed().unwrap(), None);
    }

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DealStateStore::open(dir.path().join("missing.json")).is_err());
    }
}
