//! Pairwise correlation of daily returns across equity series.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::equity::{daily_returns, forward_fill};
use crate::error::{AnalyticsError, Result};
use crate::math::pearson;
use crate::types::EquityPoint;

/// An equity series with a display label (strategy id, `Combined`, a
/// benchmark symbol).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSeries {
    /// Unique label.
    pub label: String,
    /// Equity points, sparse or filled.
    pub points: Vec<EquityPoint>,
}

impl LabeledSeries {
    /// Pair a label with its points.
    pub fn new(label: impl Into<String>, points: Vec<EquityPoint>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// Symmetric matrix of Pearson coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Row and column labels, in input order.
    pub labels: Vec<String>,
    /// `matrix[i][j]` correlates `labels[i]` with `labels[j]`.
    pub matrix: Vec<Vec<f64>>,
    /// First day of the common range.
    pub start_date: NaiveDate,
    /// Last day of the common range.
    pub end_date: NaiveDate,
    /// Daily returns per series.
    pub observations: usize,
}

impl CorrelationMatrix {
    /// Coefficient between two labels.
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.matrix[i][j])
    }
}

/// Correlate daily returns of every pair of series over their combined range.
///
/// Each series is forward-filled across the whole range, flat at its own
/// first value before it starts. Pairs without variance correlate at 0.
pub fn compute_correlation_matrix(series: &[LabeledSeries]) -> Result<CorrelationMatrix> {
    if series.len() < 2 {
        return Err(AnalyticsError::insufficient(
            "correlation series",
            2,
            series.len(),
        ));
    }

    let mut seen = HashSet::new();
    for s in series {
        if s.points.is_empty() {
            return Err(AnalyticsError::invalid(
                "series",
                format!("{} has no points", s.label),
            ));
        }
        if !seen.insert(s.label.as_str()) {
            return Err(AnalyticsError::invalid(
                "series",
                format!("duplicate label {}", s.label),
            ));
        }
    }

    let dates = series.iter().flat_map(|s| s.points.iter().map(|p| p.date));
    let (Some(start), Some(end)) = (dates.clone().min(), dates.max()) else {
        return Err(AnalyticsError::insufficient("correlation range", 2, 0));
    };
    let days = usize::try_from((end - start).num_days() + 1).unwrap_or(0);
    if days < 2 {
        return Err(AnalyticsError::insufficient("correlation range", 2, days));
    }

    let returns = series
        .iter()
        .map(|s| {
            let seed = s
                .points
                .iter()
                .min_by_key(|p| p.date)
                .map(|p| p.equity)
                .unwrap_or_default();
            forward_fill(&s.points, start, end, seed).map(|filled| daily_returns(&filled))
        })
        .collect::<Result<Vec<_>>>()?;

    let n = series.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&returns[i], &returns[j]).unwrap_or(0.0);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        labels: series.iter().map(|s| s.label.clone()).collect(),
        matrix,
        start_date: start,
        end_date: end,
        observations: days - 1,
    })
}
