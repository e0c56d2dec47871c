//! Record normalizer: raw ledger rows into canonical trades and benchmark points.
//!
//! Rows that fail validation are reported back by index with a reason and the
//! rest of the batch is processed. Invalid numbers are never coerced.
//!
//! Accepted encodings:
//! - numbers as JSON integers, JSON floats or decimal strings
//! - timestamps as RFC 3339 (converted to the reporting offset), naive
//!   `YYYY-MM-DD HH:MM[:SS]` (already in reporting time) or `YYYY-MM-DD`

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::MONEY_SCALE;
use crate::error::{AnalyticsError, Result};
use crate::types::{BenchmarkPoint, Direction, Trade};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// A number in whatever encoding the upstream row used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// JSON integer.
    Integer(i64),
    /// JSON float.
    Float(f64),
    /// Decimal string, e.g. `"4512.25"`.
    Text(String),
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Decimal> for RawNumber {
    fn from(value: Decimal) -> Self {
        Self::Text(value.to_string())
    }
}

/// A closed trade as delivered by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTradeRow {
    /// Originating strategy.
    #[serde(alias = "strategyId")]
    pub strategy_id: String,
    /// `long`/`short` (or `buy`/`sell`).
    #[serde(alias = "side")]
    pub direction: String,
    /// Entry timestamp.
    #[serde(alias = "entryTime", alias = "entry_date", alias = "entryDate")]
    pub entry_time: String,
    /// Exit timestamp.
    #[serde(alias = "exitTime", alias = "exit_date", alias = "exitDate")]
    pub exit_time: String,
    /// Entry price.
    #[serde(alias = "entryPrice")]
    pub entry_price: RawNumber,
    /// Exit price.
    #[serde(alias = "exitPrice")]
    pub exit_price: RawNumber,
    /// Position size.
    pub quantity: RawNumber,
    /// Realized P&L; derived from prices when absent.
    #[serde(default)]
    pub pnl: Option<RawNumber>,
}

/// A benchmark close as delivered by the price store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBenchmarkRow {
    /// Trading date or timestamp.
    #[serde(alias = "time")]
    pub date: String,
    /// Closing price.
    pub close: RawNumber,
}

/// Why a row was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// Strategy identifier is empty.
    #[error("strategy id is blank")]
    BlankStrategy,

    /// Direction is not long/short.
    #[error("unknown direction '{value}'")]
    UnknownDirection {
        /// Raw direction text.
        value: String,
    },

    /// Timestamp could not be parsed.
    #[error("{field} '{value}' is not a recognised timestamp")]
    InvalidTimestamp {
        /// Field name.
        field: &'static str,
        /// Raw text.
        value: String,
    },

    /// Exit precedes entry.
    #[error("exit {exit} precedes entry {entry}")]
    ExitBeforeEntry {
        /// Parsed entry instant.
        entry: String,
        /// Parsed exit instant.
        exit: String,
    },

    /// Number could not be parsed.
    #[error("{field} '{value}' is not a number")]
    Unparseable {
        /// Field name.
        field: &'static str,
        /// Raw text.
        value: String,
    },

    /// NaN or infinity.
    #[error("{field} is not finite")]
    NonFinite {
        /// Field name.
        field: &'static str,
    },

    /// Zero or negative where a positive value is required.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Field name.
        field: &'static str,
        /// Parsed value.
        value: String,
    },

    /// A second benchmark close for the same date.
    #[error("duplicate benchmark date {date}")]
    DuplicateDate {
        /// Repeated date.
        date: NaiveDate,
    },
}

/// A refused row and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// Position of the row in the input batch.
    pub index: usize,
    /// Why it was refused.
    pub reason: RejectionReason,
}

/// Normalized trades plus the rejection report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedTrades {
    /// Accepted trades, input order.
    pub trades: Vec<Trade>,
    /// Refused rows.
    pub rejected: Vec<RejectedRow>,
}

/// Normalized benchmark points plus the rejection report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedBenchmark {
    /// Accepted points, ascending by date.
    pub points: Vec<BenchmarkPoint>,
    /// Refused rows.
    pub rejected: Vec<RejectedRow>,
}

/// Normalization settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Timezone all timestamps are reported in.
    pub reporting_offset: FixedOffset,
    /// Contract-size conversion per strategy; P&L and quantity are multiplied.
    pub contract_ratios: HashMap<String, Decimal>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            reporting_offset: Utc.fix(),
            contract_ratios: HashMap::new(),
        }
    }
}

impl NormalizeOptions {
    /// Report in a fixed offset east of UTC.
    pub fn with_offset_minutes(mut self, minutes: i32) -> Result<Self> {
        self.reporting_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AnalyticsError::invalid(
                    "reporting_offset",
                    format!("{minutes} minutes is outside +/-24h"),
                )
            })?;
        Ok(self)
    }

    /// Rescale one strategy's trades by `ratio`.
    pub fn with_contract_ratio(mut self, strategy_id: &str, ratio: Decimal) -> Result<Self> {
        if ratio <= Decimal::ZERO {
            return Err(AnalyticsError::invalid(
                "contract_ratio",
                format!("ratio for '{strategy_id}' must be positive, got {ratio}"),
            ));
        }
        self.contract_ratios.insert(strategy_id.to_string(), ratio);
        Ok(self)
    }
}

/// Normalize a batch of raw trade rows.
#[must_use]
pub fn normalize_trades(rows: &[RawTradeRow], options: &NormalizeOptions) -> NormalizedTrades {
    let mut result = NormalizedTrades::default();

    for (index, row) in rows.iter().enumerate() {
        match normalize_trade_row(row, options) {
            Ok(trade) => result.trades.push(trade),
            Err(reason) => result.rejected.push(RejectedRow { index, reason }),
        }
    }

    debug!(
        accepted = result.trades.len(),
        rejected = result.rejected.len(),
        "Normalized trade rows"
    );

    result
}

/// Normalize a batch of raw benchmark rows. The first close seen for a date wins.
#[must_use]
pub fn normalize_benchmark(
    rows: &[RawBenchmarkRow],
    options: &NormalizeOptions,
) -> NormalizedBenchmark {
    let mut result = NormalizedBenchmark::default();
    let mut seen = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let parsed = parse_timestamp(&row.date, options.reporting_offset)
            .ok_or_else(|| RejectionReason::InvalidTimestamp {
                field: "date",
                value: row.date.clone(),
            })
            .and_then(|ts| {
                let close = parse_positive("close", &row.close)?;
                Ok(BenchmarkPoint {
                    date: ts.date(),
                    close,
                })
            })
            .and_then(|point| {
                if seen.insert(point.date) {
                    Ok(point)
                } else {
                    Err(RejectionReason::DuplicateDate { date: point.date })
                }
            });

        match parsed {
            Ok(point) => result.points.push(point),
            Err(reason) => result.rejected.push(RejectedRow { index, reason }),
        }
    }

    result.points.sort_by_key(|p| p.date);

    debug!(
        accepted = result.points.len(),
        rejected = result.rejected.len(),
        "Normalized benchmark rows"
    );

    result
}

fn normalize_trade_row(
    row: &RawTradeRow,
    options: &NormalizeOptions,
) -> std::result::Result<Trade, RejectionReason> {
    let strategy_id = row.strategy_id.trim();
    if strategy_id.is_empty() {
        return Err(RejectionReason::BlankStrategy);
    }

    let direction = parse_direction(&row.direction)?;

    let entry = parse_timestamp(&row.entry_time, options.reporting_offset).ok_or_else(|| {
        RejectionReason::InvalidTimestamp {
            field: "entry_time",
            value: row.entry_time.clone(),
        }
    })?;
    let exit = parse_timestamp(&row.exit_time, options.reporting_offset).ok_or_else(|| {
        RejectionReason::InvalidTimestamp {
            field: "exit_time",
            value: row.exit_time.clone(),
        }
    })?;
    if exit < entry {
        return Err(RejectionReason::ExitBeforeEntry {
            entry: entry.to_string(),
            exit: exit.to_string(),
        });
    }

    let entry_price = parse_positive("entry_price", &row.entry_price)?;
    let exit_price = parse_positive("exit_price", &row.exit_price)?;
    let quantity = parse_positive("quantity", &row.quantity)?;

    let mut trade = Trade {
        strategy_id: strategy_id.to_string(),
        direction,
        entry_date: entry.date(),
        exit_date: exit.date(),
        entry_price,
        exit_price,
        quantity,
        pnl: Decimal::ZERO,
    };
    trade.pnl = match &row.pnl {
        Some(raw) => parse_number("pnl", raw)?,
        None => trade
            .derived_pnl()
            .map(round_money)
            .ok_or(RejectionReason::NonFinite { field: "pnl" })?,
    };

    if let Some(ratio) = options.contract_ratios.get(strategy_id) {
        let scaled = trade
            .rescaled(*ratio)
            .ok_or(RejectionReason::NonFinite { field: "pnl" })?;
        trade = Trade {
            pnl: round_money(scaled.pnl),
            quantity: round_money(scaled.quantity),
            ..scaled
        };
    }

    Ok(trade)
}

fn parse_direction(raw: &str) -> std::result::Result<Direction, RejectionReason> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "long" | "buy" => Ok(Direction::Long),
        "short" | "sell" => Ok(Direction::Short),
        _ => Err(RejectionReason::UnknownDirection {
            value: raw.to_string(),
        }),
    }
}

/// Parse a timestamp into wall-clock time at the reporting offset.
fn parse_timestamp(raw: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&offset).naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_number(
    field: &'static str,
    raw: &RawNumber,
) -> std::result::Result<Decimal, RejectionReason> {
    let value = match raw {
        RawNumber::Integer(v) => Decimal::from(*v),
        RawNumber::Float(v) => {
            if !v.is_finite() {
                return Err(RejectionReason::NonFinite { field });
            }
            Decimal::from_f64(*v).ok_or_else(|| RejectionReason::Unparseable {
                field,
                value: v.to_string(),
            })?
        }
        RawNumber::Text(text) => {
            let text = text.trim();
            let lowered = text.to_ascii_lowercase();
            if matches!(
                lowered.trim_start_matches(['+', '-']),
                "nan" | "inf" | "infinity"
            ) {
                return Err(RejectionReason::NonFinite { field });
            }
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| RejectionReason::Unparseable {
                    field,
                    value: text.to_string(),
                })?
        }
    };

    Ok(round_money(value))
}

fn parse_positive(
    field: &'static str,
    raw: &RawNumber,
) -> std::result::Result<Decimal, RejectionReason> {
    let value = parse_number(field, raw)?;
    if value <= Decimal::ZERO {
        return Err(RejectionReason::NonPositive {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn row(entry: &str, exit: &str, pnl: Option<RawNumber>) -> RawTradeRow {
        RawTradeRow {
            strategy_id: "ESTrend".to_string(),
            direction: "long".to_string(),
            entry_time: entry.to_string(),
            exit_time: exit.to_string(),
            entry_price: RawNumber::from("4500.25"),
            exit_price: RawNumber::from(4510.5),
            quantity: RawNumber::from(2),
            pnl,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_accepts_mixed_numeric_encodings() {
        let rows = vec![row(
            "2024-01-02 09:30",
            "2024-01-02 15:45:00",
            Some(RawNumber::from("1025.50")),
        )];
        let result = normalize_trades(&rows, &NormalizeOptions::default());

        assert!(result.rejected.is_empty());
        let trade = &result.trades[0];
        assert_eq!(trade.entry_price, dec!(4500.25));
        assert_eq!(trade.exit_price, dec!(4510.5));
        assert_eq!(trade.quantity, dec!(2));
        assert_eq!(trade.pnl, dec!(1025.50));
        assert_eq!(trade.entry_date, date(2024, 1, 2));
        assert_eq!(trade.exit_date, date(2024, 1, 2));
    }

    #[test]
    fn test_derives_missing_pnl() {
        let mut short = row("2024-01-02", "2024-01-03", None);
        short.direction = "SELL".to_string();
        let result = normalize_trades(&[short], &NormalizeOptions::default());

        assert_eq!(result.trades[0].direction, Direction::Short);
        assert_eq!(result.trades[0].pnl, dec!(-20.50));
    }

    #[test]
    fn test_rejects_bad_rows_and_keeps_valid_ones() {
        let mut bad_price = row("2024-01-02", "2024-01-03", None);
        bad_price.entry_price = RawNumber::from(0);
        let mut bad_qty = row("2024-01-02", "2024-01-03", None);
        bad_qty.quantity = RawNumber::from("-1");
        let mut bad_direction = row("2024-01-02", "2024-01-03", None);
        bad_direction.direction = "flat".to_string();

        let rows = vec![
            row("2024-01-03", "2024-01-02", None),
            row("2024-01-02", "2024-01-03", Some(RawNumber::from("NaN"))),
            bad_price,
            row("2024-01-02", "2024-01-03", Some(RawNumber::from(10))),
            bad_qty,
            row("yesterday", "2024-01-03", None),
            bad_direction,
        ];
        let result = normalize_trades(&rows, &NormalizeOptions::default());

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].pnl, dec!(10));

        let indices: Vec<usize> = result.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 4, 5, 6]);
        assert!(matches!(
            result.rejected[0].reason,
            RejectionReason::ExitBeforeEntry { .. }
        ));
        assert_eq!(
            result.rejected[1].reason,
            RejectionReason::NonFinite { field: "pnl" }
        );
        assert!(matches!(
            result.rejected[2].reason,
            RejectionReason::NonPositive {
                field: "entry_price",
                ..
            }
        ));
        assert!(matches!(
            result.rejected[4].reason,
            RejectionReason::InvalidTimestamp {
                field: "entry_time",
                ..
            }
        ));
    }

    #[test]
    fn test_same_instant_trade_is_valid() {
        let rows = vec![row("2024-01-02 10:00", "2024-01-02 10:00", None)];
        let result = normalize_trades(&rows, &NormalizeOptions::default());
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn test_rfc3339_converted_to_reporting_offset() {
        // 03:30 UTC is still the previous evening in New York (UTC-5).
        let rows = vec![row(
            "2024-01-02T15:00:00Z",
            "2024-01-03T03:30:00Z",
            Some(RawNumber::from(1)),
        )];
        let options = NormalizeOptions::default()
            .with_offset_minutes(-300)
            .unwrap();
        let result = normalize_trades(&rows, &options);

        assert_eq!(result.trades[0].exit_date, date(2024, 1, 2));
    }

    #[test]
    fn test_contract_ratio_rescales_strategy() {
        let rows = vec![row("2024-01-02", "2024-01-03", Some(RawNumber::from(500)))];
        let options = NormalizeOptions::default()
            .with_contract_ratio("ESTrend", dec!(0.1))
            .unwrap();
        let result = normalize_trades(&rows, &options);

        assert_eq!(result.trades[0].pnl, dec!(50));
        assert_eq!(result.trades[0].quantity, dec!(0.2));
        assert!(
            NormalizeOptions::default()
                .with_contract_ratio("ESTrend", Decimal::ZERO)
                .is_err()
        );
    }

    #[test]
    fn test_overflowing_pnl_is_rejected_not_fatal() {
        let mut fine = row("2024-01-02", "2024-01-03", None);
        fine.entry_price = RawNumber::from("1");
        fine.exit_price = RawNumber::from("1");
        fine.quantity = RawNumber::from("1");
        let mut huge = fine.clone();
        huge.exit_price = RawNumber::from("50000000000000000000000000000");
        huge.quantity = RawNumber::from("3");

        let result = normalize_trades(&[fine, huge], &NormalizeOptions::default());

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].pnl, Decimal::ZERO);
        assert_eq!(
            result.rejected,
            vec![RejectedRow {
                index: 1,
                reason: RejectionReason::NonFinite { field: "pnl" },
            }]
        );
    }

    #[test]
    fn test_overflowing_contract_ratio_is_rejected() {
        let rows = vec![
            row("2024-01-02", "2024-01-03", Some(RawNumber::from("50000000000000000000000000000"))),
            row("2024-01-02", "2024-01-03", Some(RawNumber::from(10))),
        ];
        let options = NormalizeOptions::default()
            .with_contract_ratio("ESTrend", dec!(2))
            .unwrap();

        let result = normalize_trades(&rows, &options);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].pnl, dec!(20));
        assert_eq!(result.rejected[0].index, 0);
        assert_eq!(result.rejected[0].reason, RejectionReason::NonFinite { field: "pnl" });
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(NormalizeOptions::default().with_offset_minutes(24 * 60).is_err());
    }

    #[test]
    fn test_benchmark_sorted_and_deduplicated() {
        let rows = vec![
            RawBenchmarkRow {
                date: "2024-01-03".to_string(),
                close: RawNumber::from(101.5),
            },
            RawBenchmarkRow {
                date: "2024-01-02".to_string(),
                close: RawNumber::from("100"),
            },
            RawBenchmarkRow {
                date: "2024-01-03".to_string(),
                close: RawNumber::from(99),
            },
            RawBenchmarkRow {
                date: "2024-01-04".to_string(),
                close: RawNumber::from(-1),
            },
        ];
        let result = normalize_benchmark(&rows, &NormalizeOptions::default());

        let dates: Vec<NaiveDate> = result.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(result.points[1].close, dec!(101.5));
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(
            result.rejected[0].reason,
            RejectionReason::DuplicateDate {
                date: date(2024, 1, 3)
            }
        );
    }

    #[test]
    fn test_raw_row_deserializes_from_camel_case() {
        let json = r#"{
            "strategyId": "NQORB",
            "side": "short",
            "entryTime": "2024-02-01 09:30",
            "exitTime": "2024-02-01 10:15",
            "entryPrice": 17850.75,
            "exitPrice": "17820.25",
            "quantity": 1,
            "pnl": 610
        }"#;
        let parsed: RawTradeRow = serde_json::from_str(json).unwrap();
        let result = normalize_trades(&[parsed], &NormalizeOptions::default());

        assert!(result.rejected.is_empty());
        assert_eq!(result.trades[0].strategy_id, "NQORB");
        assert_eq!(result.trades[0].pnl, dec!(610));
    }
}
