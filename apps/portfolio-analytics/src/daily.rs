//! Per-day analytics rows for charting.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{BETA_WINDOW_DAYS, SHARPE_WINDOW_DAYS, VOLATILITY_WINDOW_DAYS};
use crate::drawdown::compute_underwater;
use crate::equity::{daily_returns, forward_fill, simple_return};
use crate::error::{AnalyticsError, Result};
use crate::math::std_dev;
use crate::metrics::{MetricsOptions, PerformanceCalculator};
use crate::rolling::{beta_alpha, ensure_daily};
use crate::types::{EquityPoint, Ratio};

/// One day of the portfolio with its trailing statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalytics {
    /// Calendar day.
    pub date: NaiveDate,
    /// Equity at the end of the day.
    pub equity: Decimal,
    /// Return since the previous day (0 on the first day).
    pub return_pct: f64,
    /// Return since the first day.
    pub cum_return: f64,
    /// Fraction below the running peak.
    pub drawdown: Decimal,
    /// Annualized volatility over the trailing volatility window.
    pub volatility_20d: Option<f64>,
    /// Sharpe ratio over the trailing Sharpe window.
    pub sharpe_60d: Option<Ratio>,
    /// Beta against the benchmark over the trailing beta window.
    pub beta_60d: Option<Ratio>,
    /// Annualized alpha against the benchmark over the same window.
    pub alpha_60d: Option<f64>,
}

/// Window lengths (in daily returns) for the trailing columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalyticsOptions {
    /// Volatility window.
    pub volatility_window: usize,
    /// Sharpe window.
    pub sharpe_window: usize,
    /// Beta/alpha window.
    pub beta_window: usize,
    /// Annualization settings.
    pub metrics: MetricsOptions,
}

impl Default for DailyAnalyticsOptions {
    fn default() -> Self {
        Self {
            volatility_window: VOLATILITY_WINDOW_DAYS,
            sharpe_window: SHARPE_WINDOW_DAYS,
            beta_window: BETA_WINDOW_DAYS,
            metrics: MetricsOptions::default(),
        }
    }
}

/// Build one row per day of a gap-free portfolio curve.
///
/// The benchmark may be sparse (trading days only); it is forward-filled
/// onto the portfolio's calendar before returns are paired. Trailing columns
/// stay `None` until their window has filled.
pub fn compute_daily_analytics(
    portfolio: &[EquityPoint],
    benchmark: Option<&[EquityPoint]>,
    options: &DailyAnalyticsOptions,
) -> Result<Vec<DailyAnalytics>> {
    let calculator = PerformanceCalculator::new(options.metrics)?;
    for (name, window) in [
        ("volatility_window", options.volatility_window),
        ("sharpe_window", options.sharpe_window),
        ("beta_window", options.beta_window),
    ] {
        if window == 0 {
            return Err(AnalyticsError::invalid(name, "must be positive"));
        }
    }
    ensure_daily(portfolio)?;

    let (Some(first), Some(last)) = (portfolio.first(), portfolio.last()) else {
        return Ok(Vec::new());
    };

    let returns = daily_returns(portfolio);
    let bench_returns = match benchmark {
        Some(points) if !points.is_empty() => {
            let seed = points
                .iter()
                .min_by_key(|p| p.date)
                .map(|p| p.equity)
                .unwrap_or_default();
            let filled = forward_fill(points, first.date, last.date, seed)?;
            Some(daily_returns(&filled))
        }
        _ => None,
    };

    let ppy = options.metrics.periods_per_year;
    let annualizer = f64::from(ppy).sqrt();
    let trailing = |i: usize, window: usize| (i >= window).then(|| i - window..i);

    let rows = compute_underwater(portfolio)
        .into_iter()
        .enumerate()
        .map(|(i, point)| {
            let volatility_20d = trailing(i, options.volatility_window)
                .and_then(|r| std_dev(&returns[r]))
                .map(|std| std * annualizer);
            let sharpe_60d =
                trailing(i, options.sharpe_window).map(|r| calculator.sharpe(&returns[r]));
            let (beta_60d, alpha_60d) = match (&bench_returns, trailing(i, options.beta_window)) {
                (Some(bench), Some(r)) => {
                    let (beta, alpha) = beta_alpha(&returns[r.clone()], &bench[r], ppy);
                    (Some(beta), alpha)
                }
                _ => (None, None),
            };

            DailyAnalytics {
                date: point.date,
                return_pct: i.checked_sub(1).map_or(0.0, |prev| returns[prev]),
                cum_return: simple_return(first.equity, point.equity),
                equity: point.equity,
                drawdown: point.drawdown,
                volatility_20d,
                sharpe_60d,
                beta_60d,
                alpha_60d,
            }
        })
        .collect();

    Ok(rows)
}
