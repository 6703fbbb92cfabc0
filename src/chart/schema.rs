use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of loyalty programs the chart and transfer graph know about.
/// Wallet rows may carry slugs outside this set; those are kept for display
/// only and never participate in pricing or transfers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProgramId {
    Alaska,
    AmexMr,
    ChaseUr,
    Delta,
    Southwest,
}

impl ProgramId {
    pub const ALL: [ProgramId; 5] = [
        ProgramId::Alaska,
        ProgramId::AmexMr,
        ProgramId::ChaseUr,
        ProgramId::Delta,
        ProgramId::Southwest,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Alaska => "alaska",
            Self::AmexMr => "amex_mr",
            Self::ChaseUr => "chase_ur",
            Self::Delta => "delta",
            Self::Southwest => "southwest",
        }
    }
}

impl Display for ProgramId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Alaska => "Alaska",
            Self::AmexMr => "Amex MR",
            Self::ChaseUr => "Chase UR",
            Self::Delta => "Delta",
            Self::Southwest => "Southwest",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown program id: {0}")]
pub struct ProgramParseError(pub String);

impl FromStr for ProgramId {
    type Err = ProgramParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "alaska" => Ok(Self::Alaska),
            "amex_mr" | "amex" => Ok(Self::AmexMr),
            "chase_ur" | "chase" => Ok(Self::ChaseUr),
            "delta" => Ok(Self::Delta),
            "southwest" => Ok(Self::Southwest),
            _ => Err(ProgramParseError(s.to_string())),
        }
    }
}

/// Directed origin/destination pair. A route and its reverse are distinct
/// keys; any reverse fallback happens in the resolver, never here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Error)]
#[error("invalid route key: {0}")]
pub struct RouteParseError(pub String);

impl Route {
    /// Fails closed: anything that is not two 3-letter location codes is
    /// rejected here so it can never mis-key a chart lookup downstream.
    pub fn new(origin: &str, destination: &str) -> Result<Self, RouteParseError> {
        let origin = normalize_location_code(origin)
            .ok_or_else(|| RouteParseError(format!("{origin}-{destination}")))?;
        let destination = normalize_location_code(destination)
            .ok_or_else(|| RouteParseError(format!("{origin}-{destination}")))?;
        Ok(Self {
            origin,
            destination,
        })
    }

    pub fn reversed(&self) -> Self {
        Self {
            origin: self.destination.clone(),
            destination: self.origin.clone(),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

impl FromStr for Route {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (origin, destination) = s
            .split_once('-')
            .ok_or_else(|| RouteParseError(s.to_string()))?;
        Self::new(origin, destination)
    }
}

fn normalize_location_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// The static redemption-cost table. Absence of a program on a route means
/// "no listed price", not zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardChart {
    routes: BTreeMap<Route, BTreeMap<ProgramId, u64>>,
}

impl AwardChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock one-way economy prices for the seeded demo routes.
    pub fn builtin() -> Self {
        let mut chart = Self::new();
        chart.set_price("LAX-LHR", ProgramId::Alaska, 70_000);
        chart.set_price("LAX-LHR", ProgramId::AmexMr, 60_000);
        chart.set_price("LAX-LHR", ProgramId::ChaseUr, 62_500);
        chart.set_price("LAX-LHR", ProgramId::Delta, 95_000);
        chart.set_price("JFK-NRT", ProgramId::Alaska, 85_000);
        chart.set_price("JFK-NRT", ProgramId::AmexMr, 90_000);
        chart.set_price("JFK-NRT", ProgramId::ChaseUr, 95_000);
        chart.set_price("JFK-NRT", ProgramId::Delta, 95_000);
        chart.set_price("SFO-CDG", ProgramId::Alaska, 80_000);
        chart.set_price("SFO-CDG", ProgramId::AmexMr, 70_000);
        chart.set_price("SFO-CDG", ProgramId::ChaseUr, 75_000);
        chart.set_price("SFO-CDG", ProgramId::Delta, 90_000);
        chart
    }

    pub fn insert(&mut self, route: Route, program: ProgramId, points: u64) {
        self.routes.entry(route).or_default().insert(program, points);
    }

    pub fn entry(&self, route: &Route) -> Option<&BTreeMap<ProgramId, u64>> {
        self.routes.get(route)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&Route, &BTreeMap<ProgramId, u64>)> {
        self.routes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn set_price(&mut self, key: &str, program: ProgramId, points: u64) {
        let route = key.parse::<Route>().expect("builtin chart route key");
        self.insert(route, program, points);
    }
}

#[cfg(test)]
mod tests {
    use super::{ProgramId, Route};

    #[test]
    fn program_slugs_round_trip() {
        for id in ProgramId::ALL {
            let parsed = id.as_slug().parse::<ProgramId>().expect("slug parses");
            assert_eq!(parsed, id);
        }
        assert!("united".parse::<ProgramId>().is_err());
    }

    #[test]
    fn program_ordering_is_slug_alphabetical() {
        // Ranking tie-breaks lean on this: ProgramId order == slug order.
        let slugs: Vec<&str> = ProgramId::ALL.iter().map(|p| p.as_slug()).collect();
        let mut sorted = slugs.clone();
        sorted.sort();
        assert_eq!(slugs, sorted);
    }

    #[test]
    fn route_keys_fail_closed() {
        assert!("LAX-LHR".parse::<Route>().is_ok());
        assert!("lax-lhr".parse::<Route>().is_ok());
        assert!("LAXLHR".parse::<Route>().is_err());
        assert!("LA-LHR".parse::<Route>().is_err());
        assert!("L4X-LHR".parse::<Route>().is_err());
        assert!("".parse::<Route>().is_err());
    }

    #[test]
    fn route_normalizes_and_reverses() {
        let route = Route::new(" lax ", "lhr").expect("route parses");
        assert_eq!(route.to_string(), "LAX-LHR");
        assert_eq!(route.reversed().to_string(), "LHR-LAX");
    }
}
