use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::chart::schema::{AwardChart, ProgramId, Route};

#[derive(Debug, Deserialize)]
struct ChartFile {
    #[serde(default)]
    routes: BTreeMap<String, BTreeMap<String, u64>>,
}

/// Loads a chart override from TOML:
///
/// ```toml
/// [routes."LAX-LHR"]
/// alaska = 70000
/// amex_mr = 60000
/// ```
///
/// Bad route keys abort the load (a mis-keyed route would silently never
/// match); unknown program slugs are skipped with a warning.
pub fn load_chart(path: &Path) -> Result<AwardChart> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading chart file: {}", path.display()))?;
    let parsed: ChartFile = toml::from_str(&data)
        .with_context(|| format!("failed parsing TOML chart: {}", path.display()))?;

    let mut chart = AwardChart::new();
    for (route_key, prices) in parsed.routes {
        let route = Route::from_str(&route_key)
            .with_context(|| format!("chart file {}: bad route key", path.display()))?;
        for (slug, points) in prices {
            match ProgramId::from_str(&slug) {
                Ok(program) => chart.insert(route.clone(), program, points),
                Err(_) => warn!("chart file {route_key}: skipping unknown program {slug}"),
            }
        }
    }
    if chart.is_empty() {
        bail!("chart file {} contains no routes", path.display());
    }
    Ok(chart)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::load_chart;
    use crate::chart::schema::ProgramId;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("award-oracle-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write chart file");
        path
    }

    #[test]
    fn loads_routes_and_skips_unknown_programs() {
        let path = write_temp(
            "chart-ok.toml",
            r#"
[routes."LAX-LHR"]
alaska = 70000
united = 60000
"#,
        );
        let chart = load_chart(&path).expect("chart loads");
        let route = "LAX-LHR".parse().expect("route parses");
        let entry = chart.entry(&route).expect("route present");
        assert_eq!(entry.get(&ProgramId::Alaska), Some(&70_000));
        assert_eq!(entry.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn rejects_bad_route_keys() {
        let path = write_temp(
            "chart-bad.toml",
            r#"
[routes."LAXLHR"]
alaska = 70000
"#,
        );
        assert!(load_chart(&path).is_err());
        let _ = std::fs::remove_file(path);
    }
}
