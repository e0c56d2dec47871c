//! Bootstrap Monte Carlo projection of future equity.
//!
//! Each simulated path resamples historical daily returns with replacement
//! and compounds them from the current equity. The seed is always recorded
//! so any run can be replayed.

use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnalyticsError, Result, ensure_non_negative};
use crate::math::{mean, percentile};

/// Optional knobs for a projection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloOptions {
    /// Day before the first projected date (defaults to today, UTC).
    pub start_date: Option<NaiveDate>,
    /// RNG seed (None = random).
    pub seed: Option<u64>,
}

/// Simulated distribution of equity at the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Projected calendar days, one per step.
    pub future_dates: Vec<NaiveDate>,
    /// Final equity of every path, ascending.
    pub final_equities: Vec<f64>,
    /// Equity every path starts from.
    pub current_equity: Decimal,
    /// Steps per path.
    pub horizon_days: usize,
    /// Number of paths.
    pub simulation_count: usize,
    /// Seed that reproduces this run.
    pub seed: u64,
}

/// Summary percentiles of the final-equity distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionBands {
    /// 5th percentile.
    pub p5: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 95th percentile.
    pub p95: f64,
    /// Mean final equity.
    pub mean: f64,
    /// Share of paths ending below the current equity.
    pub prob_loss: f64,
}

impl MonteCarloResult {
    /// Final equity at percentile `pct` (0..=100), linearly interpolated.
    #[must_use]
    pub fn percentile(&self, pct: f64) -> f64 {
        percentile(&self.final_equities, pct).unwrap_or(0.0)
    }

    /// Standard percentile bands plus mean and probability of loss.
    #[must_use]
    pub fn bands(&self) -> ProjectionBands {
        let start = self.current_equity.to_f64().unwrap_or(0.0);
        let losing = self.final_equities.iter().filter(|e| **e < start).count();
        let prob_loss = if self.final_equities.is_empty() {
            0.0
        } else {
            losing as f64 / self.final_equities.len() as f64
        };

        ProjectionBands {
            p5: self.percentile(5.0),
            p25: self.percentile(25.0),
            p50: self.percentile(50.0),
            p75: self.percentile(75.0),
            p95: self.percentile(95.0),
            mean: mean(&self.final_equities).unwrap_or(0.0),
            prob_loss,
        }
    }
}

/// Project with a random seed starting today.
pub fn run_monte_carlo(
    current_equity: Decimal,
    historical_returns: &[f64],
    horizon_days: usize,
    simulation_count: usize,
) -> Result<MonteCarloResult> {
    run_monte_carlo_with(
        current_equity,
        historical_returns,
        horizon_days,
        simulation_count,
        &MonteCarloOptions::default(),
    )
}

/// Project `simulation_count` paths of `horizon_days` resampled returns.
pub fn run_monte_carlo_with(
    current_equity: Decimal,
    historical_returns: &[f64],
    horizon_days: usize,
    simulation_count: usize,
    options: &MonteCarloOptions,
) -> Result<MonteCarloResult> {
    ensure_non_negative("current_equity", current_equity)?;
    if horizon_days == 0 {
        return Err(AnalyticsError::invalid("horizon_days", "must be positive"));
    }
    if simulation_count == 0 {
        return Err(AnalyticsError::invalid("simulation_count", "must be positive"));
    }
    if historical_returns.is_empty() {
        return Err(AnalyticsError::insufficient("monte carlo returns", 1, 0));
    }
    if let Some(bad) = historical_returns.iter().find(|r| !r.is_finite()) {
        return Err(AnalyticsError::invalid(
            "historical_returns",
            format!("non-finite return {bad}"),
        ));
    }

    let start_date = options
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let future_dates = (1..=horizon_days as u64)
        .map(|offset| start_date.checked_add_days(Days::new(offset)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AnalyticsError::invalid("horizon_days", "runs past the calendar"))?;

    let seed = options.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    let start = current_equity.to_f64().unwrap_or(0.0);

    info!(
        simulations = simulation_count,
        horizon = horizon_days,
        samples = historical_returns.len(),
        seed,
        "Running Monte Carlo projection"
    );

    let mut final_equities: Vec<f64> = (0..simulation_count)
        .map(|_| {
            (0..horizon_days).fold(start, |equity, _| {
                let r = historical_returns[rng.random_range(0..historical_returns.len())];
                equity * (1.0 + r)
            })
        })
        .collect();
    final_equities.sort_by(f64::total_cmp);

    Ok(MonteCarloResult {
        future_dates,
        final_equities,
        current_equity,
        horizon_days,
        simulation_count,
        seed,
    })
}
