use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

const DEFAULT_CONFIG_PATH: &str = "dashboard-config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub dir: PathBuf,
    pub suffix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            suffix: ".csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub chart_path: PathBuf,
    /// TrueType font for chart text. Well-known system locations are tried
    /// when unset.
    pub chart_font: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            chart_path: PathBuf::from("dashboard.png"),
            chart_font: None,
        }
    }
}

impl OutputConfig {
    pub fn cleaned_data_path(&self) -> PathBuf {
        self.dir.join("cleaned_energy_data.csv")
    }

    pub fn daily_totals_path(&self) -> PathBuf {
        self.dir.join("daily_totals.csv")
    }

    pub fn weekly_totals_path(&self) -> PathBuf {
        self.dir.join("weekly_totals.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join("summary.txt")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub reject_negative: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reject_negative: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub validation: ValidationConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Loads the file named by `DASHBOARD_CONFIG`, else `dashboard-config.toml`
    /// when present, else the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        match env::var("DASHBOARD_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
