pub mod graph;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::ProgramId;

pub use graph::TransferGraph;

/// What could flow into a target program right now: every positive-balance
/// source with a configured edge, and their sum.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferableIn {
    pub total: u64,
    pub sources: BTreeMap<ProgramId, u64>,
}
