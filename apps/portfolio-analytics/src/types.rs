//! Core value objects shared by every analytics stage.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::ZERO_TOLERANCE;

/// Position direction of a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl Direction {
    /// Multiplier applied to the price change.
    #[must_use]
    pub const fn sign(self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

/// One closed position from the upstream ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Originating strategy.
    pub strategy_id: String,
    /// Long or short.
    pub direction: Direction,
    /// Entry date in the reporting timezone.
    pub entry_date: NaiveDate,
    /// Exit date in the reporting timezone (never before entry).
    pub exit_date: NaiveDate,
    /// Entry price.
    pub entry_price: Decimal,
    /// Exit price.
    pub exit_price: Decimal,
    /// Position size.
    pub quantity: Decimal,
    /// Realized P&L. Authoritative over prices.
    pub pnl: Decimal,
}

impl Trade {
    /// P&L implied by prices, quantity and direction.
    ///
    /// `None` when the product does not fit in a `Decimal`.
    #[must_use]
    pub fn derived_pnl(&self) -> Option<Decimal> {
        self.exit_price
            .checked_sub(self.entry_price)?
            .checked_mul(self.quantity)?
            .checked_mul(self.direction.sign())
    }

    /// Check if this trade made money.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Check if this trade lost money.
    #[must_use]
    pub fn is_loser(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

    /// Copy of this trade under a different contract multiplier.
    ///
    /// `None` when the scaled quantity or P&L overflows.
    #[must_use]
    pub fn rescaled(&self, ratio: Decimal) -> Option<Self> {
        Some(Self {
            quantity: self.quantity.checked_mul(ratio)?,
            pnl: self.pnl.checked_mul(ratio)?,
            ..self.clone()
        })
    }
}

/// One daily close of a reference index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkPoint {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: Decimal,
}

/// Account value on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Calendar date.
    pub date: NaiveDate,
    /// Equity. Not clamped; negative when losses exceed capital.
    pub equity: Decimal,
    /// Fraction below the running peak (e.g. -0.10 = 10% under water).
    pub drawdown: Decimal,
}

impl EquityPoint {
    /// New point with no drawdown recorded yet.
    #[must_use]
    pub const fn new(date: NaiveDate, equity: Decimal) -> Self {
        Self {
            date,
            equity,
            drawdown: Decimal::ZERO,
        }
    }
}

/// Direction of an unbounded ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// Positive infinity.
    Positive,
    /// Negative infinity.
    Negative,
}

impl Sign {
    /// Sign of a non-zero value.
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

/// A ratio whose denominator may vanish.
///
/// Never carries NaN or a float infinity; degenerate cases are explicit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Ratio {
    /// Ordinary finite value.
    Finite(f64),
    /// Non-zero numerator over a zero denominator.
    Unbounded(Sign),
    /// Too few observations to say anything.
    Undefined,
}

impl Ratio {
    /// Zero.
    pub const ZERO: Self = Self::Finite(0.0);

    /// Divide, resolving a zero denominator to `0` or `Unbounded`.
    #[must_use]
    pub fn from_quotient(numerator: f64, denominator: f64) -> Self {
        if !numerator.is_finite() || !denominator.is_finite() {
            return Self::Undefined;
        }
        if denominator.abs() <= ZERO_TOLERANCE {
            if numerator.abs() <= ZERO_TOLERANCE {
                return Self::ZERO;
            }
            return Self::Unbounded(Sign::of(numerator));
        }
        Self::finite_or_unbounded(numerator / denominator)
    }

    /// Wrap a computed value, mapping overflow to `Unbounded`.
    #[must_use]
    pub fn finite_or_unbounded(value: f64) -> Self {
        if value.is_nan() {
            Self::Undefined
        } else if value.is_infinite() {
            Self::Unbounded(Sign::of(value))
        } else {
            Self::Finite(value)
        }
    }

    /// Whether the ratio holds an ordinary number.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// The value, when finite.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Finite(v) => Some(*v),
            _ => None,
        }
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{v:.2}"),
            Self::Unbounded(Sign::Positive) => write!(f, "∞"),
            Self::Unbounded(Sign::Negative) => write!(f, "-∞"),
            Self::Undefined => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trade(direction: Direction, entry: i64, exit: i64, qty: i64) -> Trade {
        Trade {
            strategy_id: "es-trend".to_string(),
            direction,
            entry_date: date(2024, 1, 2),
            exit_date: date(2024, 1, 3),
            entry_price: Decimal::new(entry, 2),
            exit_price: Decimal::new(exit, 2),
            quantity: Decimal::new(qty, 0),
            pnl: Decimal::ZERO,
        }
    }

    #[test]
    fn test_derived_pnl_respects_direction() {
        let long = trade(Direction::Long, 10_000, 10_500, 2);
        assert_eq!(long.derived_pnl(), Some(Decimal::new(10, 0)));

        let short = trade(Direction::Short, 10_000, 10_500, 2);
        assert_eq!(short.derived_pnl(), Some(Decimal::new(-10, 0)));
    }

    #[test]
    fn test_derived_pnl_overflow_is_none() {
        let mut huge = trade(Direction::Long, 100, 100, 3);
        huge.exit_price = Decimal::MAX;
        assert_eq!(huge.derived_pnl(), None);
        assert_eq!(huge.rescaled(Decimal::new(2, 0)).map(|t| t.pnl), Some(Decimal::ZERO));

        huge.pnl = Decimal::MAX;
        assert!(huge.rescaled(Decimal::new(2, 0)).is_none());
    }

    #[test]
    fn test_rescaled_leaves_original_untouched() {
        let mut original = trade(Direction::Long, 10_000, 10_500, 2);
        original.pnl = Decimal::new(500, 0);
        let Some(scaled) = original.rescaled(Decimal::new(1, 1)) else {
            panic!("a 0.1 ratio cannot overflow");
        };

        assert_eq!(scaled.pnl, Decimal::new(50, 0));
        assert_eq!(scaled.quantity, Decimal::new(2, 1));
        assert_eq!(original.pnl, Decimal::new(500, 0));
    }

    #[test]
    fn test_ratio_from_quotient() {
        assert_eq!(Ratio::from_quotient(3.0, 2.0), Ratio::Finite(1.5));
        assert_eq!(Ratio::from_quotient(0.0, 0.0), Ratio::ZERO);
        assert_eq!(
            Ratio::from_quotient(5.0, 0.0),
            Ratio::Unbounded(Sign::Positive)
        );
        assert_eq!(
            Ratio::from_quotient(-5.0, 0.0),
            Ratio::Unbounded(Sign::Negative)
        );
        assert_eq!(Ratio::from_quotient(f64::NAN, 1.0), Ratio::Undefined);
    }

    #[test]
    fn test_ratio_display_and_serde() {
        assert_eq!(Ratio::Finite(3.5).to_string(), "3.50");
        assert_eq!(Ratio::Unbounded(Sign::Positive).to_string(), "∞");
        assert_eq!(Ratio::Undefined.to_string(), "N/A");

        let json = serde_json::to_string(&Ratio::Unbounded(Sign::Positive)).unwrap();
        assert_eq!(json, r#"{"kind":"unbounded","value":"positive"}"#);
        let json = serde_json::to_string(&Ratio::Finite(2.0)).unwrap();
        assert_eq!(json, r#"{"kind":"finite","value":2.0}"#);
        let back: Ratio = serde_json::from_str(r#"{"kind":"undefined"}"#).unwrap();
        assert_eq!(back, Ratio::Undefined);
    }
}
