//! Aggregate metrics across all studies.

use serde::{Deserialize, Serialize};

use super::round_to_tenth;
use crate::storage::Study;

/// Number of insights surfaced as portfolio themes.
const THEME_LIMIT: usize = 3;

/// Dashboard summary of the study portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Total number of studies.
    pub study_count: usize,
    /// Studies that have an Impact Rating.
    pub rated_count: usize,
    /// Mean IR, one decimal.
    pub average_ir: Option<f64>,
    /// Median IR, one decimal.
    pub median_ir: Option<f64>,
    /// Lowest IR.
    pub min_ir: Option<f64>,
    /// Highest IR.
    pub max_ir: Option<f64>,
    /// Mean completion percentage over all studies, rounded.
    pub average_completion: u32,
    /// First few insights, in study order.
    pub themes: Vec<String>,
}

impl PortfolioSummary {
    /// Summarize a set of studies.
    pub fn from_studies(studies: &[Study]) -> Self {
        let mut ratings: Vec<f64> = studies.iter().filter_map(|s| s.ir_metric).collect();
        ratings.sort_by(f64::total_cmp);

        let average_ir = (!ratings.is_empty())
            .then(|| round_to_tenth(ratings.iter().sum::<f64>() / ratings.len() as f64));

        let average_completion = if studies.is_empty() {
            0
        } else {
            let total: u64 = studies
                .iter()
                .map(|s| u64::from(s.completion_percentage))
                .sum();
            (total as f64 / studies.len() as f64).round() as u32
        };

        let themes = studies
            .iter()
            .filter_map(|s| s.insight.as_deref())
            .filter(|insight| !insight.is_empty())
            .take(THEME_LIMIT)
            .map(str::to_string)
            .collect();

        Self {
            study_count: studies.len(),
            rated_count: ratings.len(),
            average_ir,
            median_ir: median(&ratings).map(round_to_tenth),
            min_ir: ratings.first().copied(),
            max_ir: ratings.last().copied(),
            average_completion,
            themes,
        }
    }
}

/// Median of sorted values.
fn median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
