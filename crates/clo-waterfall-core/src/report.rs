//! Flat views of the deal-state ledgers, one row per entry, for export.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::{DealState, PaymentRecord};
use crate::types::{Money, Period, Rate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTotal {
    pub beneficiary: String,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub payments: usize,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTestRow {
    pub period: Period,
    pub group: String,
    pub test: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredInterestRow {
    pub period: Period,
    pub tranche: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheRow {
    pub class: String,
    pub rank: u32,
    pub balance: Money,
    /// Deferred interest still owed across all periods.
    pub deferred_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub period: Period,
    pub rate: Option<Rate>,
    pub reserves: Money,
}

/// Payment history sorted by period, beneficiary and type. Entries with the
/// same key keep their recording order.
pub fn payment_records(state: &DealState) -> Vec<PaymentRecord> {
    let mut rows = state.payment_history.clone();
    rows.sort_by(|a, b| {
        (a.period, &a.beneficiary, &a.payment_type).cmp(&(b.period, &b.beneficiary, &b.payment_type))
    });
    rows
}

/// Amounts summed by beneficiary and payment type.
pub fn payment_totals(state: &DealState) -> Vec<PaymentTotal> {
    let mut totals: BTreeMap<(&str, &str), (usize, Money)> = BTreeMap::new();
    for p in &state.payment_history {
        let entry = totals
            .entry((p.beneficiary.as_str(), p.payment_type.as_str()))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += p.amount;
    }
    totals
        .into_iter()
        .map(|((beneficiary, payment_type), (payments, amount))| PaymentTotal {
            beneficiary: beneficiary.to_string(),
            payment_type: payment_type.to_string(),
            payments,
            amount,
        })
        .collect()
}

/// Cure diversions, without the per-group seed entries.
pub fn coverage_test_records(state: &DealState) -> Vec<CoverageTestRow> {
    let mut rows: Vec<CoverageTestRow> = state
        .coverage_test_history
        .iter()
        .flat_map(|(group, events)| {
            events.iter().filter_map(move |e| {
                e.kind.map(|kind| CoverageTestRow {
                    period: e.period,
                    group: group.clone(),
                    test: kind.label().to_string(),
                    amount: e.amount,
                })
            })
        })
        .collect();
    rows.sort_by(|a, b| (a.period, &a.group, &a.test).cmp(&(b.period, &b.group, &b.test)));
    rows
}

/// Deferred-interest ledger entries still carrying a balance.
pub fn deferred_interest_records(state: &DealState) -> Vec<DeferredInterestRow> {
    flatten_deferred_interest(state, |amount| !amount.is_zero())
}

/// Every deferred-interest ledger entry, including the period-0 seeds and
/// entries settled down to zero.
pub fn deferred_interest_log(state: &DealState) -> Vec<DeferredInterestRow> {
    flatten_deferred_interest(state, |_| true)
}

fn flatten_deferred_interest(
    state: &DealState,
    keep: impl Fn(Money) -> bool + Copy,
) -> Vec<DeferredInterestRow> {
    let mut rows: Vec<DeferredInterestRow> = state
        .deferred_interest
        .iter()
        .flat_map(|(tranche, entries)| {
            entries
                .iter()
                .filter(move |e| keep(e.amount))
                .map(move |e| DeferredInterestRow {
                    period: e.period,
                    tranche: tranche.clone(),
                    amount: e.amount,
                })
        })
        .collect();
    rows.sort_by(|a, b| (a.period, &a.tranche).cmp(&(b.period, &b.tranche)));
    rows
}

/// Current balances, senior first.
pub fn tranche_records(state: &DealState) -> Vec<TrancheRow> {
    let mut rows: Vec<TrancheRow> = state
        .tranches
        .iter()
        .map(|(class, t)| TrancheRow {
            class: class.clone(),
            rank: t.rank,
            balance: t.balance,
            deferred_interest: state
                .deferred_interest
                .get(class)
                .map(|entries| entries.iter().map(|e| e.amount).sum())
                .unwrap_or(Decimal::ZERO),
        })
        .collect();
    rows.sort_by(|a, b| (a.rank, &a.class).cmp(&(b.rank, &b.class)));
    rows
}

/// Rate and reserve sweep for every period that has either.
pub fn period_records(state: &DealState) -> Vec<PeriodRow> {
    let mut periods: Vec<Period> = state
        .sofr
        .keys()
        .chain(state.reserve_accounts.keys())
        .copied()
        .collect();
    periods.sort_unstable();
    periods.dedup();
    periods
        .into_iter()
        .map(|period| PeriodRow {
            period,
            rate: state.sofr.get(&period).copied(),
            reserves: state
                .reserve_accounts
                .get(&period)
                .copied()
                .unwrap_or(Decimal::ZERO),
        })
        .collect()
}
