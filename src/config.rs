use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chart::ResolvePolicy;
use crate::transfer::TransferGraph;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    /// Transfer partnerships, source slug to target slugs. Empty means the
    /// built-in defaults.
    #[serde(default)]
    pub transfers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub valuation: ValuationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_email")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_resolve_policy")]
    pub policy: ResolvePolicy,
    /// Optional TOML chart override; empty means the built-in chart.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    #[serde(default = "default_top_up_cents_per_point")]
    pub top_up_cents_per_point: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub user_email: Option<String>,
    pub db_path: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/award-oracle/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(user_email) = overrides.user_email {
            self.user.email = user_email;
        }
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_chart_path(&self) -> Option<PathBuf> {
        let trimmed = self.chart.path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(expand_tilde(trimmed))
        }
    }

    pub fn transfer_graph(&self) -> TransferGraph {
        if self.transfers.is_empty() {
            TransferGraph::with_defaults()
        } else {
            TransferGraph::from_config(&self.transfers)
        }
    }

    pub fn default_template() -> String {
        let template = r#"[user]
email = "demo@points.local"

[storage]
db_path = "~/.local/share/award-oracle/wallets.db"

[chart]
policy = "bidirectional"
path = ""

[transfers]
amex_mr = ["delta"]
chase_ur = ["southwest"]

[valuation]
top_up_cents_per_point = 1.5
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: UserConfig::default(),
            storage: StorageConfig::default(),
            chart: ChartConfig::default(),
            transfers: BTreeMap::new(),
            valuation: ValuationConfig::default(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            email: default_user_email(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            policy: default_resolve_policy(),
            path: String::new(),
        }
    }
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            top_up_cents_per_point: default_top_up_cents_per_point(),
        }
    }
}

fn default_user_email() -> String {
    "demo@points.local".to_string()
}

fn default_db_path() -> String {
    "~/.local/share/award-oracle/wallets.db".to_string()
}

fn default_resolve_policy() -> ResolvePolicy {
    ResolvePolicy::Bidirectional
}

fn default_top_up_cents_per_point() -> f64 {
    1.5
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::chart::{ProgramId, ResolvePolicy};

    #[test]
    fn template_parses_back_into_config() {
        let config: Config =
            toml::from_str(&Config::default_template()).expect("template parses");
        assert_eq!(config.user.email, "demo@points.local");
        assert_eq!(config.chart.policy, ResolvePolicy::Bidirectional);
        let graph = config.transfer_graph();
        let targets: Vec<_> = graph.targets_of(ProgramId::AmexMr).collect();
        assert_eq!(targets, vec![ProgramId::Delta]);
    }

    #[test]
    fn empty_transfers_table_falls_back_to_defaults() {
        let config = Config::default();
        assert!(!config.transfer_graph().is_empty());
    }
}
