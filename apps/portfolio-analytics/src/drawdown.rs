//! Underwater series and major drawdown episodes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::HUNDRED;
use crate::error::{AnalyticsError, Result};
use crate::types::EquityPoint;

/// Whether an episode has climbed back to its starting peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    /// Equity regained the pre-episode peak.
    Recovered,
    /// Still below the peak at the end of the series.
    Ongoing,
}

/// One contiguous stretch below a running peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    /// Last date at the pre-episode peak.
    pub start_date: NaiveDate,
    /// Date of the deepest point.
    pub trough_date: NaiveDate,
    /// Deepest drawdown (fraction, negative).
    pub trough_drawdown: Decimal,
    /// First date back at the peak.
    pub recovery_date: Option<NaiveDate>,
    /// Recovered or still open.
    pub status: EpisodeStatus,
    /// Days from start to recovery, or to the last point when ongoing.
    pub duration_days: i64,
}

/// Fill in the drawdown of every point relative to its running peak.
///
/// The peak starts at the first point. While the peak is not positive a
/// percentage is meaningless, so the drawdown is 0 at the peak and -1 below
/// it.
pub fn compute_underwater(points: &[EquityPoint]) -> Vec<EquityPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut peak = first.equity;
    points
        .iter()
        .map(|point| {
            peak = peak.max(point.equity);
            EquityPoint {
                drawdown: drawdown_from_peak(point.equity, peak),
                ..point.clone()
            }
        })
        .collect()
}

fn drawdown_from_peak(equity: Decimal, peak: Decimal) -> Decimal {
    if equity >= peak {
        return Decimal::ZERO;
    }
    if peak <= Decimal::ZERO {
        return Decimal::NEGATIVE_ONE;
    }
    equity
        .checked_sub(peak)
        .and_then(|gap| gap.checked_div(peak))
        .unwrap_or(Decimal::MIN)
        .min(Decimal::ZERO)
}

/// Deepest drawdown of a series (0 for an empty or rising series).
pub fn max_drawdown(points: &[EquityPoint]) -> Decimal {
    compute_underwater(points)
        .iter()
        .map(|p| p.drawdown)
        .min()
        .unwrap_or(Decimal::ZERO)
        .min(Decimal::ZERO)
}

/// Episodes whose trough reaches `threshold_percent` (e.g. `-10` for 10%).
///
/// A breach is `trough x 100 <= threshold`, so a threshold of 0 reports
/// every episode.
pub fn detect_major_drawdowns(
    points: &[EquityPoint],
    threshold_percent: Decimal,
) -> Result<Vec<DrawdownEpisode>> {
    if threshold_percent > Decimal::ZERO {
        return Err(AnalyticsError::invalid(
            "threshold_percent",
            format!("{threshold_percent} must be zero or negative"),
        ));
    }

    let underwater = compute_underwater(points);
    let mut episodes = Vec::new();
    let mut open: Option<OpenEpisode> = None;
    let mut last_peak_date = underwater.first().map(|p| p.date);

    for point in &underwater {
        if point.drawdown < Decimal::ZERO {
            let episode = open.get_or_insert_with(|| OpenEpisode {
                start_date: last_peak_date.unwrap_or(point.date),
                trough_date: point.date,
                trough_drawdown: point.drawdown,
            });
            if point.drawdown < episode.trough_drawdown {
                episode.trough_date = point.date;
                episode.trough_drawdown = point.drawdown;
            }
        } else {
            if let Some(episode) = open.take() {
                if episode.breaches(threshold_percent) {
                    episodes.push(episode.close(Some(point.date), point.date));
                }
            }
            last_peak_date = Some(point.date);
        }
    }

    if let (Some(episode), Some(last)) = (open, underwater.last()) {
        if episode.breaches(threshold_percent) {
            episodes.push(episode.close(None, last.date));
        }
    }

    Ok(episodes)
}

struct OpenEpisode {
    start_date: NaiveDate,
    trough_date: NaiveDate,
    trough_drawdown: Decimal,
}

impl OpenEpisode {
    fn breaches(&self, threshold_percent: Decimal) -> bool {
        self.trough_drawdown
            .checked_mul(HUNDRED)
            .is_none_or(|percent| percent <= threshold_percent)
    }

    fn close(self, recovery_date: Option<NaiveDate>, end: NaiveDate) -> DrawdownEpisode {
        DrawdownEpisode {
            start_date: self.start_date,
            trough_date: self.trough_date,
            trough_drawdown: self.trough_drawdown,
            recovery_date,
            status: if recovery_date.is_some() {
                EpisodeStatus::Recovered
            } else {
                EpisodeStatus::Ongoing
            },
            duration_days: (end - self.start_date).num_days(),
        }
    }
}
