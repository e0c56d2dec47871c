//! Value objects produced by the metrics calculator.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{Ratio, Trade};

/// Counts and sums over a trade set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStats {
    /// Total number of trades.
    pub total: u64,
    /// Trades with positive P&L.
    pub winning: u64,
    /// Trades with negative P&L.
    pub losing: u64,
    /// Trades with exactly zero P&L.
    pub breakeven: u64,
    /// Longest run of winners.
    pub max_consecutive_wins: u64,
    /// Longest run of losers.
    pub max_consecutive_losses: u64,
    /// Sum of winning P&L.
    pub gross_profit: Decimal,
    /// Sum of losing P&L as a positive value.
    pub gross_loss: Decimal,
    /// Net P&L.
    pub total_pnl: Decimal,
}

impl TradeStats {
    /// Tally trades in the order given.
    ///
    /// Streaks follow that order; breakeven trades neither extend nor break
    /// a streak.
    #[must_use]
    pub fn collect<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let mut stats = Self::default();
        let mut current_wins = 0u64;
        let mut current_losses = 0u64;

        for trade in trades {
            stats.total += 1;
            stats.total_pnl = stats.total_pnl.saturating_add(trade.pnl);

            if trade.is_winner() {
                stats.winning += 1;
                stats.gross_profit = stats.gross_profit.saturating_add(trade.pnl);
                current_wins += 1;
                current_losses = 0;
                stats.max_consecutive_wins = stats.max_consecutive_wins.max(current_wins);
            } else if trade.is_loser() {
                stats.losing += 1;
                stats.gross_loss = stats.gross_loss.saturating_add(trade.pnl.abs());
                current_losses += 1;
                current_wins = 0;
                stats.max_consecutive_losses = stats.max_consecutive_losses.max(current_losses);
            } else {
                stats.breakeven += 1;
            }
        }

        stats
    }

    /// Winning trades as a percent of all trades (0 for none).
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.winning as f64 / self.total as f64 * 100.0
    }

    /// Gross profit over gross loss.
    ///
    /// `Unbounded` with wins but no losses; zero when there are neither.
    #[must_use]
    pub fn profit_factor(&self) -> Ratio {
        Ratio::from_quotient(to_f64(self.gross_profit), to_f64(self.gross_loss))
    }

    /// Mean winning P&L.
    #[must_use]
    pub fn avg_win(&self) -> Decimal {
        average(self.gross_profit, self.winning)
    }

    /// Mean losing P&L (negative).
    #[must_use]
    pub fn avg_loss(&self) -> Decimal {
        -average(self.gross_loss, self.losing)
    }

    /// Mean P&L over every trade.
    #[must_use]
    pub fn avg_trade(&self) -> Decimal {
        average(self.total_pnl, self.total)
    }

    /// Expected P&L per trade: win% x avg win + loss% x avg loss.
    #[must_use]
    pub fn expectancy(&self) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        let total = Decimal::from(self.total);
        let win_share = Decimal::from(self.winning) / total;
        let loss_share = Decimal::from(self.losing) / total;
        win_share * self.avg_win() + loss_share * self.avg_loss()
    }

    /// Average win over the magnitude of the average loss.
    #[must_use]
    pub fn payoff_ratio(&self) -> Ratio {
        Ratio::from_quotient(to_f64(self.avg_win()), to_f64(self.avg_loss().abs()))
    }
}

fn average(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Aggregate performance of a trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Returns
    /// Total return (fraction, e.g. 0.15 = 15%).
    pub total_return: f64,
    /// Compounded annual return, or the total return for short histories.
    pub annualized_return: f64,
    /// Sample standard deviation of daily returns.
    pub volatility: f64,
    /// Daily volatility scaled by the square root of periods per year.
    pub annualized_volatility: f64,

    // Risk-adjusted
    /// Sharpe ratio.
    pub sharpe_ratio: Ratio,
    /// Sortino ratio.
    pub sortino_ratio: Ratio,
    /// Calmar ratio.
    pub calmar_ratio: Ratio,
    /// Deepest drawdown (fraction, at most 0).
    pub max_drawdown: Decimal,

    // Trades
    /// Win rate (percent).
    pub win_rate: f64,
    /// Gross profit / gross loss.
    pub profit_factor: Ratio,
    /// Average winning trade.
    pub avg_win: Decimal,
    /// Average losing trade (negative).
    pub avg_loss: Decimal,
    /// Expectancy per trade.
    pub expectancy: Decimal,
    /// Average P&L per trade.
    pub avg_trade: Decimal,
    /// Average win / |average loss|.
    pub payoff_ratio: Ratio,

    /// Starting capital.
    pub initial_equity: Decimal,
    /// Equity after the last trade.
    pub final_equity: Decimal,
    /// Calendar days in the evaluated curve.
    pub trading_days: usize,
    /// Trade counts and sums.
    pub trade_stats: TradeStats,
}

impl PerformanceMetrics {
    /// Metrics of an empty ledger.
    #[must_use]
    pub fn empty(starting_capital: Decimal) -> Self {
        Self {
            total_return: 0.0,
            annualized_return: 0.0,
            volatility: 0.0,
            annualized_volatility: 0.0,
            sharpe_ratio: Ratio::Undefined,
            sortino_ratio: Ratio::Undefined,
            calmar_ratio: Ratio::ZERO,
            max_drawdown: Decimal::ZERO,
            win_rate: 0.0,
            profit_factor: Ratio::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            expectancy: Decimal::ZERO,
            avg_trade: Decimal::ZERO,
            payoff_ratio: Ratio::ZERO,
            initial_equity: starting_capital,
            final_equity: starting_capital,
            trading_days: 0,
            trade_stats: TradeStats::default(),
        }
    }
}
