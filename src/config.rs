//! Dashboard configuration.
//!
//! Resolution order: the JSON file named by `TOBACCO_DASHBOARD_CONFIG`, then
//! `dashboard.json` in the working directory, then built-in defaults. Every
//! field is optional in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TOBACCO_DASHBOARD_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.json";

const REMOTE_BASE: &str = "https://raw.githubusercontent.com/JulioCandela1993/VisualAnalytics/master";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding the local CSV (or Parquet) files.
    pub data_dir: PathBuf,
    pub deaths_by_age_file: String,
    pub risk_factors_file: String,
    pub sales_file: String,
    /// URL or local path of the control-policy scores.
    pub control_policy_source: String,
    /// URL or local path of the smoking death counts.
    pub deaths_source: String,
    /// URL or local path of the TopoJSON world boundaries.
    pub boundaries_source: String,
    /// Object inside the TopoJSON document holding the countries.
    pub boundaries_object: String,
    pub request_timeout_secs: u64,
    /// Reference years of the percentage-change scatterplot.
    pub change_years: (i64, i64),
    pub default_sales_countries: Vec<String>,
    pub default_sales_years: (i64, i64),
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            deaths_by_age_file: "smoking-deaths-by-age.csv".into(),
            risk_factors_file: "number-of-deaths-by-risk-factor.csv".into(),
            sales_file: "sales-of-cigarettes-per-adult-per-day.csv".into(),
            control_policy_source: format!("{REMOTE_BASE}/data/control_policy.csv"),
            deaths_source: format!("{REMOTE_BASE}/data/deaths.csv"),
            boundaries_source: format!("{REMOTE_BASE}/world-countries.json"),
            boundaries_object: "countries1".into(),
            request_timeout_secs: 30,
            change_years: (2008, 2016),
            default_sales_countries: vec!["France".into(), "Germany".into(), "Spain".into()],
            default_sales_years: (1980, 2000),
        }
    }
}

impl DashboardConfig {
    /// Load the configuration following the resolution order above.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        log::info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Point every dataset at files inside `dir`, including the reference
    /// files that normally come from the remote host.
    pub fn with_local_dir(mut self, dir: &Path) -> Self {
        self.data_dir = dir.to_path_buf();
        let local = |name: &str| dir.join(name).to_string_lossy().into_owned();
        self.control_policy_source = local("control_policy.csv");
        self.deaths_source = local("deaths.csv");
        self.boundaries_source = local("world-countries.json");
        self
    }

    pub fn deaths_by_age_path(&self) -> PathBuf {
        self.data_dir.join(&self.deaths_by_age_file)
    }

    pub fn risk_factors_path(&self) -> PathBuf {
        self.data_dir.join(&self.risk_factors_file)
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(&self.sales_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/tobacco", "change_years": [2010, 2018]}"#,
        )
        .unwrap();

        let config = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/tobacco"));
        assert_eq!(config.change_years, (2010, 2018));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.boundaries_object, "countries1");
        assert_eq!(
            config.sales_path(),
            PathBuf::from("/srv/tobacco/sales-of-cigarettes-per-adult-per-day.csv")
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DashboardConfig::from_file(&path).is_err());
    }

    #[test]
    fn local_dir_redirects_remote_sources() {
        let config = DashboardConfig::default().with_local_dir(Path::new("/tmp/sample"));
        assert_eq!(config.deaths_source, "/tmp/sample/deaths.csv");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sample"));
    }
}
