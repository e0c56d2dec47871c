//! Full analytics report over one ledger.
//!
//! Runs every stage against the combined portfolio (and each strategy where
//! that makes sense). A section that lacks data is left empty with a note
//! explaining why; misuse still fails the whole report.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calendar::PeriodType;
use crate::config::AnalyticsConfig;
use crate::correlation::{CorrelationMatrix, LabeledSeries, compute_correlation_matrix};
use crate::daily::{DailyAnalytics, compute_daily_analytics};
use crate::drawdown::{DrawdownEpisode, compute_underwater, detect_major_drawdowns};
use crate::equity::{
    build_benchmark_curve, build_equity_curve, daily_returns, filled_equity_curve, forward_fill,
    metrics_window,
};
use crate::error::{AnalyticsError, Result};
use crate::metrics::{PerformanceMetrics, compute_metrics_with};
use crate::monte_carlo::{ProjectionBands, run_monte_carlo_with};
use crate::normalize::{
    RawBenchmarkRow, RawTradeRow, RejectedRow, normalize_benchmark, normalize_trades,
};
use crate::periods::{PeriodPerformance, aggregate_by_period};
use crate::rolling::{
    RollingBetaPoint, RollingMetricPoint, compute_rolling_beta, compute_rolling_metrics_with,
};
use crate::types::{EquityPoint, Trade};

/// Label of the all-strategies series in the correlation matrix.
pub const COMBINED_LABEL: &str = "Combined";

/// Raw ledger as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    /// Closed trades.
    #[serde(default)]
    pub trades: Vec<RawTradeRow>,
    /// Benchmark closes.
    #[serde(default)]
    pub benchmark: Vec<RawBenchmarkRow>,
}

/// Summary of a Monte Carlo projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    /// Seed that reproduces the run.
    pub seed: u64,
    /// Days projected.
    pub horizon_days: usize,
    /// Paths simulated.
    pub simulation_count: usize,
    /// Last projected date.
    pub horizon_date: Option<NaiveDate>,
    /// Final-equity distribution.
    pub bands: ProjectionBands,
}

/// Everything the engine computes for one ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    /// Capital the curves start from.
    pub starting_capital: Decimal,
    /// First day of the evaluated calendar.
    pub start_date: Option<NaiveDate>,
    /// Last day of the evaluated calendar.
    pub end_date: Option<NaiveDate>,
    /// Combined portfolio metrics.
    pub metrics: PerformanceMetrics,
    /// Metrics per strategy id.
    pub strategy_metrics: BTreeMap<String, PerformanceMetrics>,
    /// Daily equity with drawdown filled in.
    pub equity_curve: Vec<EquityPoint>,
    /// Drawdowns deeper than the configured threshold.
    pub drawdown_episodes: Vec<DrawdownEpisode>,
    /// Period breakdowns keyed by granularity (`day`, `week`, ...).
    pub periods: BTreeMap<String, Vec<PeriodPerformance>>,
    /// Strategies, combined portfolio and benchmark.
    pub correlation: Option<CorrelationMatrix>,
    /// Rolling metrics for every window that fits the history.
    pub rolling_metrics: Vec<RollingMetricPoint>,
    /// Rolling beta against the benchmark.
    pub rolling_beta: Option<Vec<RollingBetaPoint>>,
    /// One row per day.
    pub daily: Vec<DailyAnalytics>,
    /// Projection of the combined portfolio.
    pub monte_carlo: Option<ProjectionSummary>,
    /// Trade rows refused by the normalizer.
    pub rejected_trades: Vec<RejectedRow>,
    /// Benchmark rows refused by the normalizer.
    pub rejected_benchmark: Vec<RejectedRow>,
    /// Sections that were skipped and why.
    pub notes: Vec<String>,
}

/// Normalize the ledger and run every analytics stage.
pub fn build_report(input: &ReportInput, config: &AnalyticsConfig) -> Result<AnalyticsReport> {
    let normalize_options = config
        .normalize_options()
        .map_err(|e| AnalyticsError::invalid("config", e.to_string()))?;
    let normalized = normalize_trades(&input.trades, &normalize_options);
    let benchmark = normalize_benchmark(&input.benchmark, &normalize_options);

    let capital = config.engine.starting_capital;
    let metrics_options = config.metrics_options();
    let trades = normalized.trades;

    let mut report = AnalyticsReport {
        starting_capital: capital,
        start_date: None,
        end_date: None,
        metrics: compute_metrics_with(&trades, capital, &metrics_options)?,
        strategy_metrics: BTreeMap::new(),
        equity_curve: Vec::new(),
        drawdown_episodes: Vec::new(),
        periods: BTreeMap::new(),
        correlation: None,
        rolling_metrics: Vec::new(),
        rolling_beta: None,
        daily: Vec::new(),
        monte_carlo: None,
        rejected_trades: normalized.rejected,
        rejected_benchmark: benchmark.rejected,
        notes: Vec::new(),
    };

    let Some((start, end)) = metrics_window(&trades) else {
        report.notes.push("no valid trades; time-series sections skipped".to_string());
        return Ok(report);
    };
    report.start_date = Some(start);
    report.end_date = Some(end);

    let by_strategy = group_by_strategy(&trades);
    for (strategy, strategy_trades) in &by_strategy {
        let metrics = compute_metrics_with(strategy_trades, capital, &metrics_options)?;
        report.strategy_metrics.insert(strategy.clone(), metrics);
    }

    let curve = forward_fill(&build_equity_curve(&trades, capital)?, start, end, capital)?;
    report.equity_curve = compute_underwater(&curve);
    report.drawdown_episodes =
        detect_major_drawdowns(&curve, config.engine.drawdown_threshold_percent)?;

    for period in PeriodType::ALL {
        let breakdown = aggregate_by_period(&trades, period, capital)?;
        report.periods.insert(period.as_str().to_string(), breakdown);
    }

    let benchmark_curve = if benchmark.points.is_empty() {
        None
    } else {
        Some(build_benchmark_curve(&benchmark.points, capital)?)
    };

    let mut series = Vec::with_capacity(by_strategy.len() + 2);
    for (strategy, strategy_trades) in &by_strategy {
        series.push(LabeledSeries::new(
            strategy.clone(),
            filled_equity_curve(strategy_trades, capital)?,
        ));
    }
    let mut taken: HashSet<String> = by_strategy.keys().cloned().collect();
    series.push(LabeledSeries::new(
        unique_label(COMBINED_LABEL, &mut taken),
        curve.clone(),
    ));
    if let Some(bench) = &benchmark_curve {
        let inside: Vec<EquityPoint> = bench
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect();
        if inside.is_empty() {
            report
                .notes
                .push("benchmark has no closes inside the trade window".to_string());
        } else {
            series.push(LabeledSeries::new(
                unique_label(&config.engine.benchmark_label, &mut taken),
                inside,
            ));
        }
    }
    report.correlation = section(&mut report.notes, "correlation", || {
        compute_correlation_matrix(&series)
    })?;

    let report_start = config.rolling.report_start.unwrap_or(start);
    let report_end = config.rolling.report_end.unwrap_or(end);
    if report_end < report_start {
        report.notes.push(format!(
            "rolling: report range {report_start}..{report_end} is empty"
        ));
    } else {
        for &window in &config.rolling.window_days {
            let points = section(&mut report.notes, "rolling", || {
                compute_rolling_metrics_with(
                    &curve,
                    &[window],
                    report_start,
                    report_end,
                    &metrics_options,
                )
            })?;
            report.rolling_metrics.extend(points.into_iter().flatten());
        }
    }

    if let Some(bench) = &benchmark_curve {
        report.rolling_beta = section(&mut report.notes, "rolling beta", || {
            compute_rolling_beta(
                &curve,
                &forward_fill(bench, start, end, first_equity(bench, capital))?,
                config.rolling.beta_window_days,
                metrics_options.periods_per_year,
            )
        })?;
    }

    report.daily =
        compute_daily_analytics(&curve, benchmark_curve.as_deref(), &config.daily_options())?;

    if config.monte_carlo.enabled {
        report.monte_carlo = project(&curve, config, end, &mut report.notes)?;
    }

    info!(
        trades = trades.len(),
        strategies = by_strategy.len(),
        rejected = report.rejected_trades.len(),
        days = report.equity_curve.len(),
        notes = report.notes.len(),
        "Built analytics report"
    );

    Ok(report)
}

fn project(
    curve: &[EquityPoint],
    config: &AnalyticsConfig,
    end: NaiveDate,
    notes: &mut Vec<String>,
) -> Result<Option<ProjectionSummary>> {
    let current = curve.last().map_or(Decimal::ZERO, |p| p.equity);
    if current < Decimal::ZERO {
        notes.push("monte carlo: equity is negative; projection skipped".to_string());
        return Ok(None);
    }

    let returns = daily_returns(curve);
    let result = section(notes, "monte carlo", || {
        run_monte_carlo_with(
            current,
            &returns,
            config.monte_carlo.horizon_days,
            config.monte_carlo.simulation_count,
            &config.monte_carlo_options(Some(end)),
        )
    })?;

    Ok(result.map(|r| ProjectionSummary {
        seed: r.seed,
        horizon_days: r.horizon_days,
        simulation_count: r.simulation_count,
        horizon_date: r.future_dates.last().copied(),
        bands: r.bands(),
    }))
}

/// Run one section, turning missing data into a note.
fn section<T>(
    notes: &mut Vec<String>,
    name: &str,
    run: impl FnOnce() -> Result<T>,
) -> Result<Option<T>> {
    match run() {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_insufficient_data() => {
            notes.push(format!("{name}: {err}"));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// `base`, or `base (2)`, `base (3)`, ... when a strategy already uses it.
fn unique_label(base: &str, taken: &mut HashSet<String>) -> String {
    let label = (1..)
        .map(|n| {
            if n == 1 {
                base.to_string()
            } else {
                format!("{base} ({n})")
            }
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string());
    taken.insert(label.clone());
    label
}

fn group_by_strategy(trades: &[Trade]) -> BTreeMap<String, Vec<Trade>> {
    let mut groups: BTreeMap<String, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups
            .entry(trade.strategy_id.clone())
            .or_default()
            .push(trade.clone());
    }
    groups
}

fn first_equity(points: &[EquityPoint], fallback: Decimal) -> Decimal {
    points
        .iter()
        .min_by_key(|p| p.date)
        .map_or(fallback, |p| p.equity)
}
