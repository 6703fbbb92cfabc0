pub mod migrations;
pub mod store;

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::ProgramId;

pub use store::WalletStore;

/// One stored balance row. `program` stays a raw slug: rows for programs we
/// do not recognize are carried through for display but never priced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletRecord {
    pub user_email: String,
    pub program: String,
    pub points: u64,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    pub fn new(user_email: impl Into<String>, program: impl Into<String>, points: u64) -> Self {
        Self {
            user_email: user_email.into(),
            program: program.into(),
            points,
            updated_at: Utc::now(),
        }
    }
}

/// Where wallet rows come from. The evaluator never sees this seam; the
/// caller loads rows, aggregates them, and hands the evaluator a
/// `BalanceSheet`.
pub trait WalletSource {
    fn load_wallets(&self, user_email: &str) -> Result<Vec<WalletRecord>>;
}

/// In-memory source for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticWallets(pub Vec<WalletRecord>);

impl WalletSource for StaticWallets {
    fn load_wallets(&self, user_email: &str) -> Result<Vec<WalletRecord>> {
        Ok(self
            .0
            .iter()
            .filter(|w| w.user_email == user_email)
            .cloned()
            .collect())
    }
}

/// Aggregated balances: recognized programs summed per program, unrecognized
/// slugs preserved separately for pass-through display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheet {
    pub known: BTreeMap<ProgramId, u64>,
    pub unrecognized: BTreeMap<String, u64>,
}

impl BalanceSheet {
    /// Absent programs answer 0, never an error.
    pub fn points_in(&self, program: ProgramId) -> u64 {
        self.known.get(&program).copied().unwrap_or(0)
    }

    pub fn set_points(&mut self, program: ProgramId, points: u64) {
        self.known.insert(program, points);
    }

    pub fn credit(&mut self, program: ProgramId, amount: u64) {
        let current = self.points_in(program);
        self.known.insert(program, current.saturating_add(amount));
    }

    pub fn with_points(mut self, program: ProgramId, points: u64) -> Self {
        self.set_points(program, points);
        self
    }

    pub fn total_points(&self) -> u64 {
        self.known
            .values()
            .chain(self.unrecognized.values())
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Reduces wallet rows into a `BalanceSheet`. Rows for the same program
/// accumulate; they are never overwritten.
pub fn aggregate(records: &[WalletRecord]) -> BalanceSheet {
    let mut sheet = BalanceSheet::default();
    for record in records {
        match ProgramId::from_str(&record.program) {
            Ok(program) => {
                let entry = sheet.known.entry(program).or_insert(0);
                *entry = entry.saturating_add(record.points);
            }
            Err(_) => {
                let entry = sheet.unrecognized.entry(record.program.clone()).or_insert(0);
                *entry = entry.saturating_add(record.points);
            }
        }
    }
    sheet
}

/// Tolerant normalization for user-entered point amounts: non-finite or
/// negative input degrades to 0 instead of erroring.
pub fn normalize_points(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.floor() as u64
}

#[cfg(test)]
mod tests {
    use super::{aggregate, normalize_points, BalanceSheet, StaticWallets, WalletRecord, WalletSource};
    use crate::chart::ProgramId;

    #[test]
    fn aggregation_sums_duplicate_program_rows() {
        let rows = vec![
            WalletRecord::new("demo@points.local", "amex_mr", 40_000),
            WalletRecord::new("demo@points.local", "amex_mr", 5_000),
            WalletRecord::new("demo@points.local", "chase_ur", 30_000),
        ];
        let sheet = aggregate(&rows);
        assert_eq!(sheet.points_in(ProgramId::AmexMr), 45_000);
        assert_eq!(sheet.points_in(ProgramId::ChaseUr), 30_000);
        assert_eq!(sheet.points_in(ProgramId::Delta), 0);
    }

    #[test]
    fn unknown_programs_are_preserved_but_separate() {
        let rows = vec![
            WalletRecord::new("demo@points.local", "united", 10_000),
            WalletRecord::new("demo@points.local", "united", 2_500),
            WalletRecord::new("demo@points.local", "alaska", 1_000),
        ];
        let sheet = aggregate(&rows);
        assert_eq!(sheet.unrecognized.get("united"), Some(&12_500));
        assert_eq!(sheet.points_in(ProgramId::Alaska), 1_000);
        assert_eq!(sheet.known.len(), 1);
    }

    #[test]
    fn static_source_filters_by_user() {
        let source = StaticWallets(vec![
            WalletRecord::new("demo@points.local", "delta", 25_000),
            WalletRecord::new("other@points.local", "delta", 99_000),
        ]);
        let rows = source
            .load_wallets("demo@points.local")
            .expect("load wallets");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 25_000);
    }

    #[test]
    fn normalize_points_degrades_bad_input_to_zero() {
        assert_eq!(normalize_points(1234.9), 1234);
        assert_eq!(normalize_points(0.0), 0);
        assert_eq!(normalize_points(-5.0), 0);
        assert_eq!(normalize_points(f64::NAN), 0);
        assert_eq!(normalize_points(f64::INFINITY), 0);
    }

    #[test]
    fn credit_saturates() {
        let mut sheet = BalanceSheet::default().with_points(ProgramId::Delta, u64::MAX - 1);
        sheet.credit(ProgramId::Delta, 10);
        assert_eq!(sheet.points_in(ProgramId::Delta), u64::MAX);
    }
}
