use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use tracing::warn;

use crate::chart::ProgramId;
use crate::transfer::TransferableIn;
use crate::wallet::BalanceSheet;

/// Static 1:1 transfer partnerships, source program to the targets it can
/// fund. Self-edges and duplicates are dropped at construction, so the
/// computation below never has to re-check them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferGraph {
    edges: BTreeMap<ProgramId, BTreeSet<ProgramId>>,
}

impl TransferGraph {
    /// The bank currencies fund their partner airlines: Amex MR into Delta,
    /// Chase UR into Southwest.
    pub fn with_defaults() -> Self {
        Self::from_edges([
            (ProgramId::AmexMr, ProgramId::Delta),
            (ProgramId::ChaseUr, ProgramId::Southwest),
        ])
    }

    pub fn from_edges(edges: impl IntoIterator<Item = (ProgramId, ProgramId)>) -> Self {
        let mut graph = Self::default();
        for (source, target) in edges {
            if source == target {
                continue;
            }
            graph.edges.entry(source).or_default().insert(target);
        }
        graph
    }

    /// Builds the graph from the `[transfers]` config table. Unknown slugs
    /// are skipped with a warning rather than failing the whole config.
    pub fn from_config(table: &BTreeMap<String, Vec<String>>) -> Self {
        let mut edges = Vec::new();
        for (source_slug, target_slugs) in table {
            let Ok(source) = ProgramId::from_str(source_slug) else {
                warn!("transfers config: skipping unknown source program {source_slug}");
                continue;
            };
            for target_slug in target_slugs {
                match ProgramId::from_str(target_slug) {
                    Ok(target) => edges.push((source, target)),
                    Err(_) => {
                        warn!("transfers config: skipping unknown target program {target_slug}")
                    }
                }
            }
        }
        Self::from_edges(edges)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn targets_of(&self, source: ProgramId) -> impl Iterator<Item = ProgramId> + '_ {
        self.edges
            .get(&source)
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// Everything transferable into `target` given current balances. Only
    /// sources with a configured edge and a positive balance appear; no
    /// edge in means `{0, {}}`.
    pub fn transferable_into(&self, target: ProgramId, balances: &BalanceSheet) -> TransferableIn {
        let mut incoming = TransferableIn::default();
        for (&source, targets) in &self.edges {
            if !targets.contains(&target) {
                continue;
            }
            let balance = balances.points_in(source);
            if balance == 0 {
                continue;
            }
            incoming.sources.insert(source, balance);
            incoming.total = incoming.total.saturating_add(balance);
        }
        incoming
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::TransferGraph;
    use crate::chart::ProgramId;
    use crate::wallet::BalanceSheet;

    #[test]
    fn no_edges_in_means_nothing_transferable() {
        let graph = TransferGraph::with_defaults();
        let balances = BalanceSheet::default().with_points(ProgramId::AmexMr, 50_000);
        let incoming = graph.transferable_into(ProgramId::Alaska, &balances);
        assert_eq!(incoming.total, 0);
        assert!(incoming.sources.is_empty());
    }

    #[test]
    fn zero_balance_sources_are_excluded() {
        let graph = TransferGraph::with_defaults();
        let balances = BalanceSheet::default().with_points(ProgramId::AmexMr, 0);
        let incoming = graph.transferable_into(ProgramId::Delta, &balances);
        assert_eq!(incoming.total, 0);
        assert!(incoming.sources.is_empty());
    }

    #[test]
    fn positive_sources_sum_into_total() {
        let graph = TransferGraph::from_edges([
            (ProgramId::AmexMr, ProgramId::Delta),
            (ProgramId::ChaseUr, ProgramId::Delta),
        ]);
        let balances = BalanceSheet::default()
            .with_points(ProgramId::AmexMr, 40_000)
            .with_points(ProgramId::ChaseUr, 25_000);
        let incoming = graph.transferable_into(ProgramId::Delta, &balances);
        assert_eq!(incoming.total, 65_000);
        assert_eq!(incoming.sources.get(&ProgramId::AmexMr), Some(&40_000));
        assert_eq!(incoming.sources.get(&ProgramId::ChaseUr), Some(&25_000));
    }

    #[test]
    fn self_edges_and_duplicates_are_dropped() {
        let graph = TransferGraph::from_edges([
            (ProgramId::Delta, ProgramId::Delta),
            (ProgramId::AmexMr, ProgramId::Delta),
            (ProgramId::AmexMr, ProgramId::Delta),
        ]);
        let balances = BalanceSheet::default()
            .with_points(ProgramId::Delta, 99_000)
            .with_points(ProgramId::AmexMr, 10_000);
        let incoming = graph.transferable_into(ProgramId::Delta, &balances);
        assert_eq!(incoming.total, 10_000);
        assert_eq!(incoming.sources.len(), 1);
    }

    #[test]
    fn config_table_skips_unknown_slugs() {
        let mut table = BTreeMap::new();
        table.insert(
            "amex_mr".to_string(),
            vec!["delta".to_string(), "united".to_string()],
        );
        table.insert("velocity".to_string(), vec!["delta".to_string()]);
        let graph = TransferGraph::from_config(&table);
        let targets: Vec<_> = graph.targets_of(ProgramId::AmexMr).collect();
        assert_eq!(targets, vec![ProgramId::Delta]);
    }
}
