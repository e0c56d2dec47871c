//! Equity curve construction and calendar forward-fill.
//!
//! Trades are sparse in time; every downstream statistic is evaluated on a
//! continuous daily calendar, so the usual pipeline is
//! [`build_equity_curve`] followed by [`forward_fill`].

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{AnalyticsError, Result, ensure_non_negative};
use crate::types::{BenchmarkPoint, EquityPoint, Trade};

/// Fold trades into one equity point per distinct exit date.
///
/// Same-day trades are netted into a single point. Dates without exits
/// produce no point.
pub fn build_equity_curve(trades: &[Trade], starting_capital: Decimal) -> Result<Vec<EquityPoint>> {
    ensure_non_negative("starting_capital", starting_capital)?;

    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.exit_date);

    let mut curve: Vec<EquityPoint> = Vec::new();
    let mut equity = starting_capital;

    for trade in ordered {
        equity = equity.checked_add(trade.pnl).ok_or_else(|| {
            AnalyticsError::invalid(
                "trades",
                format!("cumulative P&L overflows on {}", trade.exit_date),
            )
        })?;
        match curve.last_mut() {
            Some(last) if last.date == trade.exit_date => last.equity = equity,
            _ => curve.push(EquityPoint::new(trade.exit_date, equity)),
        }
    }

    Ok(curve)
}

/// Convert benchmark closes into an equity-equivalent curve.
///
/// The first close maps to `starting_capital`; each later point compounds the
/// close-to-close change.
pub fn build_benchmark_curve(
    points: &[BenchmarkPoint],
    starting_capital: Decimal,
) -> Result<Vec<EquityPoint>> {
    ensure_non_negative("starting_capital", starting_capital)?;

    let mut ordered: Vec<&BenchmarkPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.date);

    let mut curve: Vec<EquityPoint> = Vec::with_capacity(ordered.len());
    let mut previous: Option<&BenchmarkPoint> = None;
    let mut equity = starting_capital;

    for point in ordered {
        if point.close <= Decimal::ZERO {
            return Err(AnalyticsError::invalid(
                "benchmark",
                format!("close on {} must be positive", point.date),
            ));
        }
        if let Some(prev) = previous {
            if prev.date == point.date {
                continue;
            }
            equity = equity
                .checked_mul(point.close)
                .and_then(|scaled| scaled.checked_div(prev.close))
                .ok_or_else(|| {
                    AnalyticsError::invalid(
                        "benchmark",
                        format!("compounded equity overflows on {}", point.date),
                    )
                })?;
        }
        curve.push(EquityPoint::new(point.date, equity));
        previous = Some(point);
    }

    Ok(curve)
}

/// Expand a sparse series to one point per calendar day in `[start, end]`.
///
/// Each day carries the latest point dated on or before it. Days before the
/// first point carry `seed` (normally the starting capital).
pub fn forward_fill(
    points: &[EquityPoint],
    start: NaiveDate,
    end: NaiveDate,
    seed: Decimal,
) -> Result<Vec<EquityPoint>> {
    if end < start {
        return Err(AnalyticsError::invalid(
            "end",
            format!("end {end} precedes start {start}"),
        ));
    }

    let mut ordered: Vec<&EquityPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.date);

    let mut carried = EquityPoint::new(start, seed);
    let mut next = 0;
    let mut filled = Vec::with_capacity(days_between(start, end) + 1);

    for day in start.iter_days().take_while(|d| *d <= end) {
        while let Some(point) = ordered.get(next).filter(|p| p.date <= day) {
            carried = (*point).clone();
            next += 1;
        }
        filled.push(EquityPoint {
            date: day,
            ..carried.clone()
        });
    }

    Ok(filled)
}

/// Calendar range analytics use for a trade set.
///
/// Starts the day before the first exit (or at the earliest entry when that
/// is earlier) so the first trade's P&L registers as a daily return; ends on
/// the last exit. `None` for an empty ledger.
pub fn metrics_window(trades: &[Trade]) -> Option<(NaiveDate, NaiveDate)> {
    let first_exit = trades.iter().map(|t| t.exit_date).min()?;
    let last_exit = trades.iter().map(|t| t.exit_date).max()?;
    let earliest_entry = trades.iter().map(|t| t.entry_date).min()?;

    let anchor = first_exit
        .checked_sub_days(Days::new(1))
        .unwrap_or(first_exit)
        .min(earliest_entry);

    Some((anchor, last_exit))
}

/// Build the equity curve and forward-fill it over [`metrics_window`].
///
/// Empty for an empty ledger.
pub fn filled_equity_curve(trades: &[Trade], starting_capital: Decimal) -> Result<Vec<EquityPoint>> {
    let sparse = build_equity_curve(trades, starting_capital)?;
    match metrics_window(trades) {
        Some((start, end)) => forward_fill(&sparse, start, end, starting_capital),
        None => Ok(Vec::new()),
    }
}

/// Simple returns between consecutive points.
///
/// A non-positive previous equity yields a 0 return.
pub fn daily_returns(points: &[EquityPoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| simple_return(w[0].equity, w[1].equity))
        .collect()
}

/// Daily returns paired with the date they were realized on.
pub fn dated_returns(points: &[EquityPoint]) -> Vec<(NaiveDate, f64)> {
    points
        .windows(2)
        .map(|w| (w[1].date, simple_return(w[0].equity, w[1].equity)))
        .collect()
}

/// `to / from - 1`, or 0 when `from` is not positive.
pub(crate) fn simple_return(from: Decimal, to: Decimal) -> f64 {
    if from <= Decimal::ZERO {
        return 0.0;
    }
    to.checked_sub(from)
        .and_then(|change| change.checked_div(from))
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
}

fn days_between(start: NaiveDate, end: NaiveDate) -> usize {
    usize::try_from((end - start).num_days()).unwrap_or(0)
}
