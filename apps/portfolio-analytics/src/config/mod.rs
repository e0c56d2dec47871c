//! Configuration for the analytics engine.
//!
//! Loads YAML with `${VAR}` / `${VAR:-default}` environment interpolation and
//! validates every section before anything is computed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use portfolio_analytics::config::load_config;
//!
//! let config = load_config(Some("analytics.yaml"))?;
//! println!("starting capital: {}", config.engine.starting_capital);
//! ```

mod engine;
mod monte_carlo;
mod observability;
mod rolling;

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::EngineConfig;
pub use monte_carlo::MonteCarloConfig;
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use rolling::RollingConfig;

use crate::daily::DailyAnalyticsOptions;
use crate::metrics::MetricsOptions;
use crate::monte_carlo::MonteCarloOptions;
use crate::normalize::NormalizeOptions;

/// Why an analytics config could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("Cannot read analytics config '{path}': {source}")]
    ReadError {
        /// File that was requested.
        path: String,
        /// IO failure.
        source: std::io::Error,
    },

    /// The YAML is malformed or has a field of the wrong type.
    #[error("Invalid analytics config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// A value is out of range.
    #[error("Analytics config rejected: {0}")]
    ValidationError(String),
}

/// Every setting the report binary reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Capital, annualization and timezone.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Rolling and daily windows.
    #[serde(default)]
    pub rolling: RollingConfig,
    /// Monte Carlo projection.
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    /// Contract-size ratio per strategy id.
    #[serde(default)]
    pub contract_ratios: HashMap<String, Decimal>,
    /// Log output.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AnalyticsConfig {
    /// Annualization settings for the metrics calculator.
    #[must_use]
    pub const fn metrics_options(&self) -> MetricsOptions {
        MetricsOptions {
            periods_per_year: self.engine.periods_per_year,
            risk_free_rate: self.engine.risk_free_rate,
        }
    }

    /// Timezone and contract ratios for the normalizer.
    pub fn normalize_options(&self) -> Result<NormalizeOptions, ConfigError> {
        let mut options = NormalizeOptions::default()
            .with_offset_minutes(self.engine.reporting_utc_offset_minutes)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        for (strategy, ratio) in &self.contract_ratios {
            options = options
                .with_contract_ratio(strategy, *ratio)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(options)
    }

    /// Windows for the daily analytics columns.
    #[must_use]
    pub const fn daily_options(&self) -> DailyAnalyticsOptions {
        DailyAnalyticsOptions {
            volatility_window: self.rolling.volatility_window_days,
            sharpe_window: self.rolling.sharpe_window_days,
            beta_window: self.rolling.beta_window_days,
            metrics: self.metrics_options(),
        }
    }

    /// Projection options starting after `start_date`.
    #[must_use]
    pub const fn monte_carlo_options(&self, start_date: Option<NaiveDate>) -> MonteCarloOptions {
        MonteCarloOptions {
            start_date,
            seed: self.monte_carlo.seed,
        }
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Read, interpolate and validate a YAML config file.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "analytics.yaml".
///
/// # Errors
///
/// Fails with `ReadError`, `ParseError` or `ValidationError`.
pub fn load_config(path: Option<&str>) -> Result<AnalyticsConfig, ConfigError> {
    let path = path.unwrap_or("analytics.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Interpolate and validate YAML already in memory.
///
/// # Errors
///
/// Fails with `ParseError` or `ValidationError`.
pub fn load_config_from_string(yaml: &str) -> Result<AnalyticsConfig, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: AnalyticsConfig = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
///
/// An unset or empty variable takes the default, or the empty string.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Range-check every section.
pub fn validate_config(config: &AnalyticsConfig) -> Result<(), ConfigError> {
    let engine = &config.engine;

    if engine.starting_capital < Decimal::ZERO {
        return Err(invalid("engine.starting_capital must not be negative"));
    }

    if engine.periods_per_year == 0 {
        return Err(invalid("engine.periods_per_year must be positive"));
    }

    if !(0.0..=1.0).contains(&engine.risk_free_rate) {
        return Err(invalid("engine.risk_free_rate must be between 0.0 and 1.0"));
    }

    if engine.reporting_utc_offset_minutes.abs() >= 24 * 60 {
        return Err(invalid(
            "engine.reporting_utc_offset_minutes must be within +/-1439",
        ));
    }

    if engine.drawdown_threshold_percent > Decimal::ZERO {
        return Err(invalid(
            "engine.drawdown_threshold_percent must be zero or negative",
        ));
    }

    let rolling = &config.rolling;
    if rolling.window_days.is_empty() || rolling.window_days.contains(&0) {
        return Err(invalid("rolling.window_days must list positive windows"));
    }

    if let (Some(start), Some(end)) = (rolling.report_start, rolling.report_end) {
        if end < start {
            return Err(invalid("rolling.report_end must not precede report_start"));
        }
    }

    if rolling.volatility_window_days == 0
        || rolling.sharpe_window_days == 0
        || rolling.beta_window_days == 0
    {
        return Err(invalid("rolling daily windows must be positive"));
    }

    if config.monte_carlo.horizon_days == 0 || config.monte_carlo.simulation_count == 0 {
        return Err(invalid(
            "monte_carlo.horizon_days and simulation_count must be positive",
        ));
    }

    if let Some((strategy, _)) = config
        .contract_ratios
        .iter()
        .find(|(_, ratio)| **ratio <= Decimal::ZERO)
    {
        return Err(ConfigError::ValidationError(format!(
            "contract_ratios.{strategy} must be positive"
        )));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
