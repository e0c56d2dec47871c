//! Numeric constants for analytics calculations.

use rust_decimal::Decimal;

pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
pub const TRADING_DAYS: u32 = 252;
/// Denominators at or below this are treated as zero.
pub const ZERO_TOLERANCE: f64 = 1e-12;
/// Decimal places kept for prices, P&L and equity.
pub const MONEY_SCALE: u32 = 8;
pub const VOLATILITY_WINDOW_DAYS: usize = 20;
pub const SHARPE_WINDOW_DAYS: usize = 60;
pub const BETA_WINDOW_DAYS: usize = 60;
