//! Trailing-window metrics and benchmark beta.
//!
//! A window of `w` days covers `w` daily returns, so it reads `w + 1`
//! consecutive points ending on the reported date. Windows may reach back
//! before the report range; they may not reach past the start of history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::ZERO_TOLERANCE;
use crate::drawdown::max_drawdown;
use crate::equity::{daily_returns, simple_return};
use crate::error::{AnalyticsError, Result};
use crate::math::{covariance, mean, std_dev};
use crate::metrics::{MetricsOptions, PerformanceCalculator};
use crate::types::{EquityPoint, Ratio};

/// Metrics over the trailing window ending on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMetricPoint {
    /// Last day of the window.
    pub date: NaiveDate,
    /// Window length in days.
    pub window_days: usize,
    /// Return over the window.
    pub total_return: f64,
    /// Annualized volatility over the window.
    pub volatility: f64,
    /// Sharpe ratio over the window.
    pub sharpe_ratio: Ratio,
    /// Sortino ratio over the window.
    pub sortino_ratio: Ratio,
    /// Deepest drawdown inside the window.
    pub max_drawdown: Decimal,
}

/// Beta and alpha against a benchmark over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingBetaPoint {
    /// Last day of the window.
    pub date: NaiveDate,
    /// Window length in returns.
    pub window_days: usize,
    /// Covariance with the benchmark over benchmark variance.
    pub beta: Ratio,
    /// Annualized excess of mean return over `beta x` benchmark mean.
    pub alpha: Option<f64>,
}

/// Rolling metrics with the default 252-day year.
pub fn compute_rolling_metrics(
    full_history: &[EquityPoint],
    window_days: &[usize],
    report_start: NaiveDate,
    report_end: NaiveDate,
) -> Result<Vec<RollingMetricPoint>> {
    compute_rolling_metrics_with(
        full_history,
        window_days,
        report_start,
        report_end,
        &MetricsOptions::default(),
    )
}

/// Rolling metrics for each window, reported for end dates in
/// `[report_start, report_end]`.
///
/// `full_history` must be a gap-free daily series (see
/// [`forward_fill`](crate::equity::forward_fill)). Output is grouped by
/// window in request order, then by date.
pub fn compute_rolling_metrics_with(
    full_history: &[EquityPoint],
    window_days: &[usize],
    report_start: NaiveDate,
    report_end: NaiveDate,
    options: &MetricsOptions,
) -> Result<Vec<RollingMetricPoint>> {
    let calculator = PerformanceCalculator::new(*options)?;
    if window_days.is_empty() {
        return Err(AnalyticsError::invalid("window_days", "no windows requested"));
    }
    if window_days.contains(&0) {
        return Err(AnalyticsError::invalid("window_days", "windows must be positive"));
    }
    if report_end < report_start {
        return Err(AnalyticsError::invalid(
            "report_end",
            format!("{report_end} precedes {report_start}"),
        ));
    }
    ensure_daily(full_history)?;

    for &window in window_days {
        if window + 1 > full_history.len() {
            return Err(AnalyticsError::insufficient(
                format!("{window}-day rolling window"),
                window + 1,
                full_history.len(),
            ));
        }
    }

    let annualizer = f64::from(options.periods_per_year).sqrt();
    let mut points = Vec::new();

    for &window in window_days {
        for end in window..full_history.len() {
            let date = full_history[end].date;
            if date < report_start || date > report_end {
                continue;
            }

            let slice = &full_history[end - window..=end];
            let returns = daily_returns(slice);
            points.push(RollingMetricPoint {
                date,
                window_days: window,
                total_return: simple_return(slice[0].equity, slice[window].equity),
                volatility: std_dev(&returns).unwrap_or(0.0) * annualizer,
                sharpe_ratio: calculator.sharpe(&returns),
                sortino_ratio: calculator.sortino(&returns),
                max_drawdown: max_drawdown(slice),
            });
        }
    }

    Ok(points)
}

pub(crate) fn ensure_daily(history: &[EquityPoint]) -> Result<()> {
    let contiguous = history
        .windows(2)
        .all(|w| w[0].date.succ_opt() == Some(w[1].date));
    if contiguous {
        Ok(())
    } else {
        Err(AnalyticsError::invalid(
            "full_history",
            "must be a gap-free daily series",
        ))
    }
}

/// Rolling beta and alpha of `portfolio` against `benchmark`.
///
/// Returns are taken between consecutive dates present in both series. A
/// window is `window_days` such returns. Beta is `Undefined` when the
/// benchmark did not move within the window.
pub fn compute_rolling_beta(
    portfolio: &[EquityPoint],
    benchmark: &[EquityPoint],
    window_days: usize,
    periods_per_year: u32,
) -> Result<Vec<RollingBetaPoint>> {
    if window_days == 0 {
        return Err(AnalyticsError::invalid("window_days", "must be positive"));
    }
    if periods_per_year == 0 {
        return Err(AnalyticsError::invalid("periods_per_year", "must be positive"));
    }

    let aligned = aligned_returns(portfolio, benchmark);
    if aligned.len() < window_days {
        return Err(AnalyticsError::insufficient(
            format!("{window_days}-day rolling beta"),
            window_days,
            aligned.len(),
        ));
    }

    let points = aligned
        .windows(window_days)
        .filter_map(|window| {
            let date = window.last()?.0;
            let port: Vec<f64> = window.iter().map(|r| r.1).collect();
            let bench: Vec<f64> = window.iter().map(|r| r.2).collect();
            let (beta, alpha) = beta_alpha(&port, &bench, periods_per_year);
            Some(RollingBetaPoint {
                date,
                window_days,
                beta,
                alpha,
            })
        })
        .collect();

    Ok(points)
}

/// Daily returns on dates both series share: `(date, portfolio, benchmark)`.
pub(crate) fn aligned_returns(
    portfolio: &[EquityPoint],
    benchmark: &[EquityPoint],
) -> Vec<(NaiveDate, f64, f64)> {
    let bench: BTreeMap<NaiveDate, Decimal> =
        benchmark.iter().map(|p| (p.date, p.equity)).collect();
    let mut ordered: Vec<&EquityPoint> = portfolio.iter().collect();
    ordered.sort_by_key(|p| p.date);

    let mut aligned = Vec::new();
    let mut previous: Option<(Decimal, Decimal)> = None;
    for point in ordered {
        let Some(&b) = bench.get(&point.date) else {
            continue;
        };
        if let Some((prev_p, prev_b)) = previous {
            aligned.push((
                point.date,
                simple_return(prev_p, point.equity),
                simple_return(prev_b, b),
            ));
        }
        previous = Some((point.equity, b));
    }
    aligned
}

/// Beta and annualized alpha of paired return samples.
pub(crate) fn beta_alpha(
    portfolio: &[f64],
    benchmark: &[f64],
    periods_per_year: u32,
) -> (Ratio, Option<f64>) {
    let (Some(cov), Some(var), Some(mean_p), Some(mean_b)) = (
        covariance(portfolio, benchmark),
        covariance(benchmark, benchmark),
        mean(portfolio),
        mean(benchmark),
    ) else {
        return (Ratio::Undefined, None);
    };
    if var <= ZERO_TOLERANCE * ZERO_TOLERANCE {
        return (Ratio::Undefined, None);
    }

    let beta = cov / var;
    let alpha = (mean_p - beta * mean_b) * f64::from(periods_per_year);
    (
        Ratio::finite_or_unbounded(beta),
        alpha.is_finite().then_some(alpha),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::Sign;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
    }

    fn daily(equities: &[Decimal]) -> Vec<EquityPoint> {
        equities
            .iter()
            .enumerate()
            .map(|(i, e)| EquityPoint::new(day(i as u64), *e))
            .collect()
    }

    #[test]
    fn test_window_reads_history_before_report_start() {
        let history = daily(&[dec!(100), dec!(110), dec!(99), dec!(108.9), dec!(119.79)]);
        let points = compute_rolling_metrics(&history, &[2], day(3), day(4)).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, day(3));
        // Window ending day 3 spans days 1..=3: 110 -> 108.9.
        assert!((points[0].total_return + 0.01).abs() < 1e-12);
        assert_eq!(points[0].max_drawdown, dec!(-0.1));
        assert!((points[1].total_return - 0.21).abs() < 1e-12);
        assert_eq!(points[1].max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_output_grouped_by_window_then_date() {
        let history = daily(&[dec!(100); 10]);
        let points = compute_rolling_metrics(&history, &[5, 2], day(0), day(9)).unwrap();

        let windows: Vec<usize> = points.iter().map(|p| p.window_days).collect();
        assert_eq!(windows[..5], [5; 5]);
        assert_eq!(windows[5..], [2; 8]);
        assert_eq!(points[0].date, day(5));
        assert_eq!(points[5].date, day(2));
        assert_eq!(points[0].sharpe_ratio, Ratio::ZERO);
    }

    #[test]
    fn test_window_longer_than_history() {
        let history = daily(&[dec!(100), dec!(101), dec!(102)]);
        let Err(err) = compute_rolling_metrics(&history, &[2, 30], day(0), day(2)) else {
            panic!("30-day window over 3 points should fail");
        };
        assert!(err.is_insufficient_data());
        assert!(compute_rolling_metrics(&history, &[2], day(0), day(2)).is_ok());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let history = daily(&[dec!(100), dec!(101), dec!(102)]);
        assert!(compute_rolling_metrics(&history, &[], day(0), day(2)).is_err());
        assert!(compute_rolling_metrics(&history, &[0], day(0), day(2)).is_err());
        assert!(compute_rolling_metrics(&history, &[1], day(2), day(0)).is_err());

        let mut gapped = history.clone();
        gapped[2].date = day(5);
        assert!(matches!(
            compute_rolling_metrics(&gapped, &[1], day(0), day(5)),
            Err(AnalyticsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rolling_beta_of_levered_portfolio() {
        let bench = daily(&[dec!(100), dec!(101), dec!(99), dec!(102), dec!(100), dec!(103)]);
        // Twice the benchmark's daily move, compounded from 1000.
        let mut equity = dec!(1000);
        let mut port = vec![EquityPoint::new(day(0), equity)];
        for pair in bench.windows(2) {
            let move_ = (pair[1].equity - pair[0].equity) / pair[0].equity;
            equity += equity * move_ * dec!(2);
            port.push(EquityPoint::new(pair[1].date, equity));
        }

        let points = compute_rolling_beta(&port, &bench, 3, 252).unwrap();
        assert_eq!(points.len(), 3);
        for point in &points {
            let Some(beta) = point.beta.as_f64() else {
                panic!("beta should be finite");
            };
            assert!((beta - 2.0).abs() < 1e-9);
            assert!(point.alpha.unwrap().abs() < 1e-6);
        }
        assert_eq!(points[2].date, day(5));
    }

    #[test]
    fn test_flat_benchmark_gives_undefined_beta() {
        let bench = daily(&[dec!(100); 4]);
        let port = daily(&[dec!(100), dec!(101), dec!(102), dec!(101)]);
        let points = compute_rolling_beta(&port, &bench, 2, 252).unwrap();
        assert!(points.iter().all(|p| p.beta == Ratio::Undefined && p.alpha.is_none()));
        assert_ne!(points[0].beta, Ratio::Unbounded(Sign::Positive));
    }

    #[test]
    fn test_beta_uses_common_dates_only() {
        let bench = daily(&[dec!(100), dec!(101), dec!(102)]);
        let port = vec![
            EquityPoint::new(day(0), dec!(50)),
            EquityPoint::new(day(2), dec!(51)),
            EquityPoint::new(day(9), dec!(52)),
        ];
        let aligned = aligned_returns(&port, &bench);
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].0, day(2));
        assert!(compute_rolling_beta(&port, &bench, 2, 252).unwrap_err().is_insufficient_data());
    }
}
