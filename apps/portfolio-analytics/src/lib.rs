// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_collect,
        clippy::items_after_statements,
        clippy::cast_possible_wrap
    )
)]

//! Portfolio Analytics - Rust Core Library
//!
//! Deterministic analytics over a ledger of closed trades for the Cream
//! trading system. Every stage is a pure function of its inputs; the only
//! randomness is the Monte Carlo projection, which records its seed.
//!
//! # Pipeline
//!
//! - `normalize`: raw rows in, validated trades and benchmark closes out
//! - `equity`: realized equity curves, calendar forward-fill, daily returns
//! - `metrics`: return, risk and trade statistics
//! - `drawdown`: underwater curve and major drawdown episodes
//! - `calendar` / `periods`: day, week, month, quarter and year buckets
//! - `correlation`: pairwise return correlation across strategies
//! - `rolling` / `daily`: trailing-window metrics, beta and alpha
//! - `monte_carlo`: bootstrap projection of future equity
//! - `report`: all of the above for one ledger, driven by `config`
//!
//! Money (P&L, equity, drawdown) is `Decimal`. Statistics over returns are
//! `f64`. Ratios whose denominator vanishes are reported as [`Ratio`]
//! instead of a sentinel number.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

mod constants;

pub mod calendar;
pub mod config;
pub mod correlation;
pub mod daily;
pub mod drawdown;
pub mod equity;
pub mod error;
pub mod math;
pub mod metrics;
pub mod monte_carlo;
pub mod normalize;
pub mod periods;
pub mod report;
pub mod rolling;
pub mod telemetry;
pub mod types;

pub use calendar::PeriodType;
pub use config::{AnalyticsConfig, ConfigError, load_config, load_config_from_string};
pub use correlation::{CorrelationMatrix, LabeledSeries, compute_correlation_matrix};
pub use daily::{DailyAnalytics, DailyAnalyticsOptions, compute_daily_analytics};
pub use drawdown::{DrawdownEpisode, EpisodeStatus, compute_underwater, detect_major_drawdowns};
pub use equity::{build_benchmark_curve, build_equity_curve, forward_fill};
pub use error::{AnalyticsError, Result};
pub use metrics::{MetricsOptions, PerformanceMetrics, compute_metrics, compute_metrics_with};
pub use monte_carlo::{MonteCarloOptions, MonteCarloResult, run_monte_carlo, run_monte_carlo_with};
pub use normalize::{NormalizeOptions, RawBenchmarkRow, RawTradeRow, normalize_benchmark, normalize_trades};
pub use periods::{PeriodPerformance, aggregate_by_period};
pub use report::{AnalyticsReport, ReportInput, build_report};
pub use rolling::{RollingBetaPoint, RollingMetricPoint, compute_rolling_beta, compute_rolling_metrics};
pub use types::{BenchmarkPoint, Direction, EquityPoint, Ratio, Sign, Trade};
