//! Application configuration.

use crate::error::{AppError, AppResult};
use hedge_core::Position;
use hedge_engine::{EngineConfig, MonitorConfig};
use hedge_executor::PaperConfig;
use hedge_feed::FeedConfig;
use hedge_telemetry::DEFAULT_LOG_FILTER;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `HEDGE__MONITOR__INTERVAL_MS=5000`.
pub const ENV_PREFIX: &str = "HEDGE";
const ENV_SEPARATOR: &str = "__";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Analyze and plan only, never place orders.
    #[default]
    Observation,
    /// Execute hedges through the paper gateway.
    Trading,
}

/// Where quotes and tickers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Underlying prices recorded on the configured positions.
    #[default]
    Static,
    /// Public REST ticker endpoints.
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default)]
    pub source: FeedSource,
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    /// REST request timeout (ms). Default: 10,000.
    #[serde(default = "default_rest_timeout_ms")]
    pub rest_timeout_ms: u64,
    #[serde(default)]
    pub service: FeedConfig,
}

fn default_rest_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_rest_timeout_ms() -> u64 {
    10_000
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::default(),
            rest_base_url: default_rest_base_url(),
            rest_timeout_ms: default_rest_timeout_ms(),
            service: FeedConfig::default(),
        }
    }
}

impl MarketDataConfig {
    pub fn rest_timeout(&self) -> Duration {
        Duration::from_millis(self.rest_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// JSON weight artifact. Without one, hedge ratios are rule-based only.
    #[serde(default)]
    pub model_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    /// Used when `RUST_LOG` is unset. Default: "info,hedge=debug".
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Hedging statistics summary interval (s). Default: 3,600.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub feed: MarketDataConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub positions: Vec<Position>,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_stats_interval_secs() -> u64 {
    3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            log_filter: default_log_filter(),
            stats_interval_secs: default_stats_interval_secs(),
            engine: EngineConfig::default(),
            monitor: MonitorConfig::default(),
            feed: MarketDataConfig::default(),
            paper: PaperConfig::default(),
            classifier: ClassifierConfig::default(),
            positions: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load `path` (when present) layered with `HEDGE__` environment
    /// overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut builder = config::Config::builder();
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Plain TOML file, no environment layering.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        self.engine.validate()?;
        self.monitor.validate()?;
        self.feed.service.validate().map_err(AppError::Config)?;
        // Quotes older than one tick must be refetched or flagged stale.
        if self.feed.service.quote_ttl_ms > self.monitor.interval_ms {
            return Err(AppError::Config(format!(
                "feed.service.quote_ttl_ms ({}) must not exceed monitor.interval_ms ({})",
                self.feed.service.quote_ttl_ms, self.monitor.interval_ms
            )));
        }
        if self.feed.source == FeedSource::Rest && self.feed.rest_base_url.is_empty() {
            return Err(AppError::Config(
                "feed.rest_base_url is required for the rest source".to_string(),
            ));
        }
        if self.feed.rest_timeout_ms == 0 || self.stats_interval_secs == 0 {
            return Err(AppError::Config(
                "feed.rest_timeout_ms and stats_interval_secs must be positive".to_string(),
            ));
        }
        if !(self.paper.slippage >= 0.0 && self.paper.commission_rate >= 0.0) {
            return Err(AppError::Config(format!(
                "paper slippage ({}) and commission_rate ({}) must not be negative",
                self.paper.slippage, self.paper.commission_rate
            )));
        }
        for position in &self.positions {
            position.validate()?;
        }
        Ok(())
    }

    pub fn is_observation_mode(&self) -> bool {
        self.mode == OperatingMode::Observation
    }

    /// Force observation mode (the `--observe` flag).
    pub fn force_observation(&mut self) {
        self.mode = OperatingMode::Observation;
    }

    /// Monitor settings with the operating mode applied.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            observe_only: self.monitor.observe_only || self.is_observation_mode(),
            ..self.monitor.clone()
        }
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_core::OptionType;
    use hedge_feed::FeedConfig;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
mode = "trading"
log_filter = "info"

[monitor]
interval_ms = 5000

[engine]
min_balance = "250"

[engine.strategy.thresholds]
low = 400000.0
medium = 900000.0
high = 1800000.0
extreme = 4000000.0

[feed]
source = "rest"
rest_base_url = "https://example.invalid"

[feed.service]
quote_ttl_ms = 5000

[[positions]]
symbol = "BTCUSDT"
strike = "95000"
expiration = "2030-03-28T08:00:00Z"
option_type = "CALL"
quantity = 2.5
underlying_price = 97000.0
implied_volatility = 0.55

[[positions]]
symbol = "ETHUSDT"
strike = "3200"
expiration = "2030-03-28T08:00:00Z"
option_type = "PUT"
quantity = -10.0
underlying_price = 3200.0
implied_volatility = 0.65
risk_free_rate = 0.04
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.is_observation_mode());
        assert!(config.monitor_config().observe_only);
        assert_eq!(config.feed.source, FeedSource::Static);
        assert!(config.positions.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.stats_interval_secs, 3600);
        assert_eq!(config.feed.service, FeedConfig::default());
    }

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.mode, OperatingMode::Trading);
        assert!(!config.monitor_config().observe_only);
        assert_eq!(config.monitor.interval_ms, 5000);
        assert_eq!(config.engine.min_balance, dec!(250));
        assert_eq!(config.engine.strategy.thresholds.extreme, 4_000_000.0);
        assert_eq!(config.feed.source, FeedSource::Rest);
        assert_eq!(config.feed.service.quote_ttl_ms, 5000);

        assert_eq!(config.positions.len(), 2);
        assert_eq!(config.positions[0].strike, dec!(95000));
        assert_eq!(config.positions[0].option_type, OptionType::Call);
        assert_eq!(config.positions[1].quantity, -10.0);
        assert_eq!(config.positions[1].risk_free_rate, 0.04);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_force_observation() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.force_observation();
        assert!(config.monitor_config().observe_only);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.engine.strategy.thresholds.medium = 100.0;
        assert!(matches!(config.validate(), Err(AppError::Engine(_))));

        let mut config = AppConfig::default();
        config.monitor.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quote_ttl_longer_than_tick_rejected() {
        let mut config = AppConfig::default();
        config.monitor.interval_ms = 5000;
        config.feed.service.quote_ttl_ms = 30_000;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.feed.service.quote_ttl_ms = 5000;
        assert!(config.validate().is_ok());
        config.feed.service.quote_ttl_ms = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_position_rejected() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.positions[0].quantity = f64::NAN;
        assert!(matches!(config.validate(), Err(AppError::Position(_))));
    }

    #[test]
    fn test_load_layers_environment() {
        let path = std::env::temp_dir().join(format!("hedge-bot-config-{}.toml", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        std::env::set_var("HEDGE__STATS_INTERVAL_SECS", "120");

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        std::env::remove_var("HEDGE__STATS_INTERVAL_SECS");
        std::fs::remove_file(&path).ok();

        assert_eq!(config.stats_interval_secs, 120);
        assert_eq!(config.mode, OperatingMode::Trading);
        assert_eq!(config.positions.len(), 2);
        assert_eq!(config.positions[0].strike, dec!(95000));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/hedge.toml").unwrap();
        assert!(config.positions.is_empty());
        assert_eq!(config.monitor.interval_ms, 30_000);
    }
}
