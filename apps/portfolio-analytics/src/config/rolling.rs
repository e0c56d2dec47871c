//! Rolling-window and daily analytics settings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{BETA_WINDOW_DAYS, SHARPE_WINDOW_DAYS, VOLATILITY_WINDOW_DAYS};

/// Trailing windows and the reporting range they are evaluated over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Windows (days) for rolling metrics.
    #[serde(default = "default_window_days")]
    pub window_days: Vec<usize>,
    /// First reported date (defaults to the start of history).
    #[serde(default)]
    pub report_start: Option<NaiveDate>,
    /// Last reported date (defaults to the end of history).
    #[serde(default)]
    pub report_end: Option<NaiveDate>,
    /// Window for the daily volatility column.
    #[serde(default = "default_volatility_window")]
    pub volatility_window_days: usize,
    /// Window for the daily Sharpe column.
    #[serde(default = "default_sharpe_window")]
    pub sharpe_window_days: usize,
    /// Window for the daily beta/alpha columns.
    #[serde(default = "default_beta_window")]
    pub beta_window_days: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            report_start: None,
            report_end: None,
            volatility_window_days: default_volatility_window(),
            sharpe_window_days: default_sharpe_window(),
            beta_window_days: default_beta_window(),
        }
    }
}

fn default_window_days() -> Vec<usize> {
    vec![30, 90, 180]
}

const fn default_volatility_window() -> usize {
    VOLATILITY_WINDOW_DAYS
}

const fn default_sharpe_window() -> usize {
    SHARPE_WINDOW_DAYS
}

const fn default_beta_window() -> usize {
    BETA_WINDOW_DAYS
}
