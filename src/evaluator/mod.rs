pub mod evaluate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::{ProgramId, Route};

pub use evaluate::evaluate_route;

/// Per-program bookability for one route query. Ephemeral: recomputed on
/// every evaluation, never persisted.
///
/// Invariants: `direct_enough` implies `transfer_possible`, and
/// `transfer_shortfall == max(0, required - (direct_balance + transferable))`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRow {
    pub program: ProgramId,
    pub required: u64,
    pub direct_balance: u64,
    pub direct_enough: bool,
    pub transfer_possible: bool,
    pub transfer_shortfall: u64,
    pub transfer_sources: BTreeMap<ProgramId, u64>,
}

impl EvaluationRow {
    pub fn bookable(&self) -> bool {
        self.direct_enough || self.transfer_possible
    }

    pub fn transferable_total(&self) -> u64 {
        self.transfer_sources
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Flat cash estimate for covering the remaining shortfall.
    pub fn cash_top_up_usd(&self, cents_per_point: f64) -> f64 {
        self.transfer_shortfall as f64 * cents_per_point / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteEvaluation {
    pub route: Route,
    pub rows: Vec<EvaluationRow>,
    /// Cheapest listed price regardless of bookability; ties go to the
    /// lexicographically-first program slug.
    pub cheapest_overall: Option<ProgramId>,
    /// Cheapest price the user can actually book right now (direct or with
    /// transfers); absent when nothing qualifies.
    pub best_bookable_now: Option<ProgramId>,
}

impl RouteEvaluation {
    /// An empty row set means the chart has no data for this route; callers
    /// must render "no chart data", not a zero-cost result.
    pub fn has_chart(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn row(&self, program: ProgramId) -> Option<&EvaluationRow> {
        self.rows.iter().find(|r| r.program == program)
    }

    pub fn bookable_count(&self) -> usize {
        self.rows.iter().filter(|r| r.bookable()).count()
    }
}
