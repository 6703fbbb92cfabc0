use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::schema::{AwardChart, ProgramId, Route};

/// How a route key is matched against the chart. `Bidirectional` tries the
/// exact key first and falls back to the reverse direction at lookup time,
/// so reciprocal routes already listed in the data are never double-counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    Directional,
    Bidirectional,
}

/// The only read path onto the chart. Every component that needs a price
/// list goes through `lookup`, so the configured policy applies uniformly.
#[derive(Debug, Clone)]
pub struct ChartResolver {
    chart: AwardChart,
    policy: ResolvePolicy,
}

impl ChartResolver {
    pub fn new(chart: AwardChart, policy: ResolvePolicy) -> Self {
        Self { chart, policy }
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    pub fn lookup(&self, route: &Route) -> Option<&BTreeMap<ProgramId, u64>> {
        if let Some(entry) = self.chart.entry(route) {
            return Some(entry);
        }
        match self.policy {
            ResolvePolicy::Directional => None,
            ResolvePolicy::Bidirectional => self.chart.entry(&route.reversed()),
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = (&Route, &BTreeMap<ProgramId, u64>)> {
        self.chart.routes()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartResolver, ResolvePolicy};
    use crate::chart::schema::{AwardChart, ProgramId, Route};

    fn lax_lhr() -> Route {
        "LAX-LHR".parse().expect("route parses")
    }

    #[test]
    fn bidirectional_falls_back_to_reverse_key() {
        let resolver = ChartResolver::new(AwardChart::builtin(), ResolvePolicy::Bidirectional);
        let forward = resolver.lookup(&lax_lhr()).expect("forward entry");
        let reverse = resolver.lookup(&lax_lhr().reversed()).expect("reverse entry");
        assert_eq!(forward, reverse);
        assert_eq!(forward.get(&ProgramId::AmexMr), Some(&60_000));
    }

    #[test]
    fn directional_does_not_fall_back() {
        let resolver = ChartResolver::new(AwardChart::builtin(), ResolvePolicy::Directional);
        assert!(resolver.lookup(&lax_lhr()).is_some());
        assert!(resolver.lookup(&lax_lhr().reversed()).is_none());
    }

    #[test]
    fn listed_reverse_entry_wins_over_fallback() {
        let mut chart = AwardChart::builtin();
        chart.insert(lax_lhr().reversed(), ProgramId::Delta, 80_000);
        let resolver = ChartResolver::new(chart, ResolvePolicy::Bidirectional);
        let entry = resolver.lookup(&lax_lhr().reversed()).expect("reverse entry");
        assert_eq!(entry.get(&ProgramId::Delta), Some(&80_000));
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn unlisted_route_is_absent() {
        let resolver = ChartResolver::new(AwardChart::builtin(), ResolvePolicy::Bidirectional);
        let route: Route = "LAX-NRT".parse().expect("route parses");
        assert!(resolver.lookup(&route).is_none());
    }
}
