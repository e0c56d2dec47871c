//! Core engine settings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::TRADING_DAYS;

/// Capital, annualization and reporting-timezone settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capital the equity curve starts from.
    #[serde(default = "default_starting_capital")]
    pub starting_capital: Decimal,
    /// Return periods per year.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    /// Annual risk-free rate (fraction).
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Reporting timezone as minutes east of UTC.
    #[serde(default)]
    pub reporting_utc_offset_minutes: i32,
    /// Drawdown episodes shallower than this percent are ignored.
    #[serde(default = "default_drawdown_threshold")]
    pub drawdown_threshold_percent: Decimal,
    /// Label for the benchmark series.
    #[serde(default = "default_benchmark_label")]
    pub benchmark_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_capital: default_starting_capital(),
            periods_per_year: default_periods_per_year(),
            risk_free_rate: 0.0,
            reporting_utc_offset_minutes: 0,
            drawdown_threshold_percent: default_drawdown_threshold(),
            benchmark_label: default_benchmark_label(),
        }
    }
}

fn default_starting_capital() -> Decimal {
    Decimal::new(100_000, 0)
}

const fn default_periods_per_year() -> u32 {
    TRADING_DAYS
}

fn default_drawdown_threshold() -> Decimal {
    Decimal::new(-10, 0)
}

fn default_benchmark_label() -> String {
    "Benchmark".to_string()
}
