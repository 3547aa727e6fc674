// 🔧 Application Config - data paths and engine settings for the CLI
//
// Defaults, then an optional `budget-explorer.{toml,yaml,json}` file, then
// `BUDGET_*` environment variables. The engine itself never reads config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Where the CLI finds its input documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory of parsed budget documents (`*.json`)
    pub budgets_dir: PathBuf,
    pub administrative_units: PathBuf,
    /// CPI series, `.json` (CpiData) or `.csv` (year,value[,notes])
    pub cpi: PathBuf,
    pub classification_overlay: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Falls back to the CPI index's base year
    pub base_year: Option<i32>,
    /// Extra label -> unit name aliases on top of City/Metro
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            budgets_dir: PathBuf::from("data/parsed_budgets"),
            administrative_units: PathBuf::from("data/administrative-units.json"),
            cpi: PathBuf::from("data/cpi.json"),
            classification_overlay: Some(PathBuf::from("data/capital-vs-operating.json")),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `budget-explorer` file
    /// and `BUDGET_*` environment variables (`__` between sections)
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("budget-explorer").required(false));

        // e.g. BUDGET_DATA__CPI=data/cpi.csv, BUDGET_ENGINE__BASE_YEAR=2024
        config = config.add_source(
            config::Environment::with_prefix("BUDGET")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }
}
