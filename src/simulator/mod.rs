pub mod topup;

use serde::{Deserialize, Serialize};

use crate::chart::ProgramId;
use crate::evaluator::RouteEvaluation;

pub use topup::{normalize_top_up_amount, simulate_top_up};

/// A hypothetical addition of points to one program's balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopUp {
    pub program: ProgramId,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopUpOutcome {
    /// The top-up actually applied; `None` when the request normalized to a
    /// no-op.
    pub top_up: Option<TopUp>,
    pub before: RouteEvaluation,
    pub after: RouteEvaluation,
    /// Programs bookable after the top-up that were not before. A top-up
    /// never removes bookability, so there is no "lost" counterpart.
    pub newly_bookable: Vec<ProgramId>,
}
