//! Per-period performance breakdown.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::calendar::{PeriodType, bucket_end, bucket_label, bucket_start, next_bucket_start};
use crate::constants::HUNDRED;
use crate::error::{AnalyticsError, Result, ensure_non_negative};
use crate::metrics::TradeStats;
use crate::types::{Ratio, Trade};

/// Performance of the trades that exited inside one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPerformance {
    /// Bucket label such as `2024-03` or `2024-W11`.
    pub period: String,
    /// Bucket granularity.
    pub period_type: PeriodType,
    /// First day of the bucket.
    pub start_date: NaiveDate,
    /// Last day of the bucket.
    pub end_date: NaiveDate,
    /// Trades exited in the bucket.
    pub total_trades: u64,
    /// Winners.
    pub winning_trades: u64,
    /// Losers.
    pub losing_trades: u64,
    /// Net P&L.
    pub total_pnl: Decimal,
    /// P&L as a percent of equity at bucket start.
    pub return_percent: f64,
    /// Win rate (percent).
    pub win_rate: f64,
    /// Average winner.
    pub avg_win: Decimal,
    /// Average loser (negative).
    pub avg_loss: Decimal,
    /// Gross profit / gross loss.
    pub profit_factor: Ratio,
    /// Equity before the bucket's trades.
    pub starting_equity: Decimal,
    /// Equity after the bucket's trades.
    pub ending_equity: Decimal,
}

/// Group trades by exit-date bucket, newest bucket first.
///
/// Every bucket between the first and last exit is present; buckets with no
/// exits carry zeroed statistics and flat equity.
pub fn aggregate_by_period(
    trades: &[Trade],
    period_type: PeriodType,
    starting_capital: Decimal,
) -> Result<Vec<PeriodPerformance>> {
    ensure_non_negative("starting_capital", starting_capital)?;

    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.exit_date);

    let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
        return Ok(Vec::new());
    };
    let last_bucket = bucket_start(last.exit_date, period_type);

    let mut periods = Vec::new();
    let mut equity = starting_capital;
    let mut cursor = Some(bucket_start(first.exit_date, period_type));
    let mut remaining = ordered.as_slice();

    while let Some(start) = cursor.filter(|s| *s <= last_bucket) {
        let end = bucket_end(start, period_type);
        let split = remaining.partition_point(|t| t.exit_date <= end);
        let (inside, rest) = remaining.split_at(split);
        remaining = rest;

        let stats = TradeStats::collect(inside.iter().copied());
        let starting_equity = equity;
        equity = equity.checked_add(stats.total_pnl).ok_or_else(|| {
            AnalyticsError::invalid("trades", format!("cumulative P&L overflows in {start}"))
        })?;

        periods.push(PeriodPerformance {
            period: bucket_label(start, period_type),
            period_type,
            start_date: start,
            end_date: end,
            total_trades: stats.total,
            winning_trades: stats.winning,
            losing_trades: stats.losing,
            total_pnl: stats.total_pnl,
            return_percent: return_percent(stats.total_pnl, starting_equity),
            win_rate: stats.win_rate(),
            avg_win: stats.avg_win(),
            avg_loss: stats.avg_loss(),
            profit_factor: stats.profit_factor(),
            starting_equity,
            ending_equity: equity,
        });

        cursor = next_bucket_start(start, period_type);
    }

    periods.reverse();
    Ok(periods)
}

fn return_percent(pnl: Decimal, starting_equity: Decimal) -> f64 {
    if starting_equity <= Decimal::ZERO {
        return 0.0;
    }
    pnl.checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(starting_equity))
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::Direction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(exit: NaiveDate, pnl: Decimal) -> Trade {
        Trade {
            strategy_id: "CLBreakout".to_string(),
            direction: Direction::Short,
            entry_date: exit,
            exit_date: exit,
            entry_price: dec!(75),
            exit_price: dec!(74),
            quantity: dec!(1),
            pnl,
        }
    }

    #[test]
    fn test_monthly_breakdown_backfills_gaps() {
        let trades = vec![
            trade(date(2024, 1, 10), dec!(1000)),
            trade(date(2024, 1, 20), dec!(-400)),
            trade(date(2024, 4, 2), dec!(500)),
        ];
        let months = aggregate_by_period(&trades, PeriodType::Month, dec!(100000)).unwrap();

        let labels: Vec<&str> = months.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(labels, vec!["2024-04", "2024-03", "2024-02", "2024-01"]);

        let january = &months[3];
        assert_eq!(january.total_trades, 2);
        assert_eq!(january.total_pnl, dec!(600));
        assert!((january.return_percent - 0.6).abs() < 1e-12);
        assert_eq!(january.win_rate, 50.0);
        assert_eq!(january.avg_loss, dec!(-400));
        assert_eq!(january.ending_equity, dec!(100600));
        assert_eq!(january.start_date, date(2024, 1, 1));
        assert_eq!(january.end_date, date(2024, 1, 31));

        let february = &months[2];
        assert_eq!(february.total_trades, 0);
        assert_eq!(february.total_pnl, Decimal::ZERO);
        assert_eq!(february.return_percent, 0.0);
        assert_eq!(february.profit_factor, Ratio::ZERO);
        assert_eq!(february.starting_equity, dec!(100600));

        let april = &months[0];
        assert_eq!(april.starting_equity, dec!(100600));
        assert_eq!(april.ending_equity, dec!(101100));
    }

    #[test]
    fn test_weekly_labels_use_iso_year() {
        let trades = vec![trade(date(2024, 12, 31), dec!(10))];
        let weeks = aggregate_by_period(&trades, PeriodType::Week, dec!(1000)).unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].period, "2025-W01");
        assert_eq!(weeks[0].start_date, date(2024, 12, 30));
    }

    #[test]
    fn test_zero_equity_gives_zero_return() {
        let trades = vec![trade(date(2024, 1, 2), dec!(50))];
        let days = aggregate_by_period(&trades, PeriodType::Day, Decimal::ZERO).unwrap();
        assert_eq!(days[0].return_percent, 0.0);
        assert_eq!(days[0].ending_equity, dec!(50));
    }

    #[test]
    fn test_empty_ledger() {
        assert!(aggregate_by_period(&[], PeriodType::Year, dec!(1)).unwrap().is_empty());
        assert!(aggregate_by_period(&[], PeriodType::Year, dec!(-1)).is_err());
    }

    proptest! {
        #[test]
        fn prop_buckets_cover_every_trade(
            entries in prop::collection::vec((0u64..500, -1_000i64..1_000), 1..40),
            period in prop::sample::select(PeriodType::ALL.to_vec()),
        ) {
            let base = date(2023, 1, 1);
            let trades: Vec<Trade> = entries
                .iter()
                .map(|(offset, pnl)| trade(base + chrono::Days::new(*offset), Decimal::from(*pnl)))
                .collect();
            let periods = aggregate_by_period(&trades, period, dec!(100000)).unwrap();

            let pnl: Decimal = periods.iter().map(|p| p.total_pnl).sum();
            let expected: Decimal = trades.iter().map(|t| t.pnl).sum();
            prop_assert_eq!(pnl, expected);

            let count: u64 = periods.iter().map(|p| p.total_trades).sum();
            prop_assert_eq!(count, trades.len() as u64);

            for pair in periods.windows(2) {
                prop_assert_eq!(pair[1].end_date.succ_opt(), Some(pair[0].start_date));
                prop_assert_eq!(pair[1].ending_equity, pair[0].starting_equity);
            }
        }
    }
}
