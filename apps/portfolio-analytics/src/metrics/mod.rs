//! Return and risk metrics over a trade ledger.
//!
//! Implements the standard performance measures on the forward-filled daily
//! equity curve:
//! - Total and annualized return
//! - Volatility (daily and annualized)
//! - Sharpe ratio (risk-adjusted returns)
//! - Sortino ratio (downside risk-adjusted returns)
//! - Calmar ratio (drawdown-adjusted returns)
//! - Maximum drawdown (peak-to-trough decline)
//! - Profit factor, win rate, expectancy, and trade statistics

mod calculator;
mod types;

pub use calculator::{
    MetricsOptions, PerformanceCalculator, annualized_return, compute_metrics,
    compute_metrics_with, sharpe_ratio, sortino_ratio,
};
pub use types::{PerformanceMetrics, TradeStats};
