use crate::core::section::ViewMode;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Dashboard API serving the section endpoints
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UpbitProviderConfig {
    pub base_url: String,
}

/// Rates used when the live lookup fails
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FallbackRates {
    pub usd_krw: f64,
    pub usdt_krw: f64,
}

impl Default for FallbackRates {
    fn default() -> Self {
        FallbackRates {
            usd_krw: 1450.0,
            usdt_krw: 1450.0,
        }
    }
}

/// Rate providers left out fall back to their public endpoints.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub upbit: Option<UpbitProviderConfig>,
    pub fallback: FallbackRates,
}


#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub cooldown_secs: u64,
    /// One of 30, 60 or 300. Absent means auto-refresh is off.
    pub auto_refresh_secs: Option<u64>,
    pub initial_view: ViewMode,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            cooldown_secs: 5,
            auto_refresh_secs: None,
            initial_view: ViewMode::Crypto,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub top_volume: usize,
    pub whale_alerts: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            top_volume: 10,
            whale_alerts: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub providers: ProvidersConfig,
    pub refresh: RefreshConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "tickview", "tickview")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }

    pub fn upbit_base_url(&self) -> &str {
        self.providers
            .upbit
            .as_ref()
            .map_or("https://api.upbit.com", |p| &p.base_url)
    }
}
