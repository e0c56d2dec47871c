//! Performance calculator over a trade ledger.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::types::{PerformanceMetrics, TradeStats};
use crate::constants::{TRADING_DAYS, ZERO_TOLERANCE};
use crate::drawdown::max_drawdown;
use crate::equity::{daily_returns, filled_equity_curve, simple_return};
use crate::error::{AnalyticsError, Result};
use crate::math::{downside_deviation, mean, std_dev};
use crate::types::{Ratio, Sign, Trade};

/// Annualization and risk-free settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsOptions {
    /// Return periods per year (252 trading days by default).
    pub periods_per_year: u32,
    /// Annual risk-free rate as a fraction.
    pub risk_free_rate: f64,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            periods_per_year: TRADING_DAYS,
            risk_free_rate: 0.0,
        }
    }
}

impl MetricsOptions {
    /// Reject a zero year length or a non-finite rate.
    pub fn validate(&self) -> Result<()> {
        if self.periods_per_year == 0 {
            return Err(AnalyticsError::invalid(
                "periods_per_year",
                "must be positive",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AnalyticsError::invalid("risk_free_rate", "must be finite"));
        }
        Ok(())
    }

    fn excess_mean(&self, returns: &[f64]) -> Option<f64> {
        Some(mean(returns)? - self.risk_free_rate / f64::from(self.periods_per_year))
    }

    fn annualizer(&self) -> f64 {
        f64::from(self.periods_per_year).sqrt()
    }
}

/// Performance calculator for a trade ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceCalculator {
    options: MetricsOptions,
}

impl PerformanceCalculator {
    /// Create a calculator with the given options.
    pub fn new(options: MetricsOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> &MetricsOptions {
        &self.options
    }

    /// Calculate all performance metrics.
    pub fn calculate(&self, trades: &[Trade], starting_capital: Decimal) -> Result<PerformanceMetrics> {
        let curve = filled_equity_curve(trades, starting_capital)?;
        if curve.is_empty() {
            return Ok(PerformanceMetrics::empty(starting_capital));
        }

        let final_equity = curve.last().map_or(starting_capital, |p| p.equity);
        let total_return = simple_return(starting_capital, final_equity);

        let returns = daily_returns(&curve);
        let volatility = std_dev(&returns).unwrap_or(0.0);
        let annualized_return = annualized_return(
            total_return,
            returns.len(),
            self.options.periods_per_year,
        );

        let max_drawdown = max_drawdown(&curve);
        let calmar_ratio = if max_drawdown == Decimal::ZERO {
            Ratio::ZERO
        } else {
            Ratio::from_quotient(
                annualized_return,
                max_drawdown.abs().to_f64().unwrap_or(0.0),
            )
        };

        let mut ordered: Vec<&Trade> = trades.iter().collect();
        ordered.sort_by_key(|t| t.exit_date);
        let trade_stats = TradeStats::collect(ordered);

        Ok(PerformanceMetrics {
            total_return,
            annualized_return,
            volatility,
            annualized_volatility: volatility * self.options.annualizer(),
            sharpe_ratio: self.sharpe(&returns),
            sortino_ratio: self.sortino(&returns),
            calmar_ratio,
            max_drawdown,
            win_rate: trade_stats.win_rate(),
            profit_factor: trade_stats.profit_factor(),
            avg_win: trade_stats.avg_win(),
            avg_loss: trade_stats.avg_loss(),
            expectancy: trade_stats.expectancy(),
            avg_trade: trade_stats.avg_trade(),
            payoff_ratio: trade_stats.payoff_ratio(),
            initial_equity: starting_capital,
            final_equity,
            trading_days: curve.len(),
            trade_stats,
        })
    }

    /// Calculate Sharpe ratio.
    /// Sharpe = (Mean Return - Risk Free Rate) / StdDev(Returns) x sqrt(periods)
    #[must_use]
    pub fn sharpe(&self, returns: &[f64]) -> Ratio {
        let (Some(excess), Some(std)) = (self.options.excess_mean(returns), std_dev(returns)) else {
            return Ratio::Undefined;
        };
        self.risk_adjusted(excess, std)
    }

    /// Calculate Sortino ratio.
    /// Sortino = (Mean Return - Risk Free Rate) / Downside Deviation x sqrt(periods)
    #[must_use]
    pub fn sortino(&self, returns: &[f64]) -> Ratio {
        let (Some(excess), Some(downside)) = (
            self.options.excess_mean(returns),
            downside_deviation(returns),
        ) else {
            return Ratio::Undefined;
        };
        self.risk_adjusted(excess, downside)
    }

    fn risk_adjusted(&self, excess: f64, deviation: f64) -> Ratio {
        if deviation <= ZERO_TOLERANCE {
            if excess.abs() <= ZERO_TOLERANCE {
                return Ratio::ZERO;
            }
            return Ratio::Unbounded(Sign::of(excess));
        }
        Ratio::finite_or_unbounded(excess / deviation * self.options.annualizer())
    }
}

/// Metrics with the default 252-day year and zero risk-free rate.
pub fn compute_metrics(trades: &[Trade], starting_capital: Decimal) -> Result<PerformanceMetrics> {
    compute_metrics_with(trades, starting_capital, &MetricsOptions::default())
}

/// Metrics with explicit options.
pub fn compute_metrics_with(
    trades: &[Trade],
    starting_capital: Decimal,
    options: &MetricsOptions,
) -> Result<PerformanceMetrics> {
    PerformanceCalculator::new(*options)?.calculate(trades, starting_capital)
}

/// Annualized Sharpe ratio of a return series.
pub fn sharpe_ratio(returns: &[f64], options: &MetricsOptions) -> Result<Ratio> {
    Ok(PerformanceCalculator::new(*options)?.sharpe(returns))
}

/// Annualized Sortino ratio of a return series.
pub fn sortino_ratio(returns: &[f64], options: &MetricsOptions) -> Result<Ratio> {
    Ok(PerformanceCalculator::new(*options)?.sortino(returns))
}

/// Compound a total return over `periods` observations to an annual rate.
///
/// Histories shorter than a year, or a total loss beyond -100%, report the
/// total return unchanged.
#[must_use]
pub fn annualized_return(total_return: f64, periods: usize, periods_per_year: u32) -> f64 {
    let growth = 1.0 + total_return;
    if periods == 0 || periods < periods_per_year as usize || growth <= 0.0 {
        return total_return;
    }

    let annualized = growth.powf(f64::from(periods_per_year) / periods as f64) - 1.0;
    if annualized.is_finite() {
        annualized
    } else {
        total_return
    }
}
