//! Impact Rating (IR) aggregation.
//!
//! The IR condenses every rating-scale answer of a study into one score on a
//! 1-10 scale:
//!
//! 1. Answers are reduced to a 1-5 rating with [`extract_numeric_value`];
//!    free-text answers drop out.
//! 2. Ratings are averaged per Kirkpatrick level ([`level_means`]).
//! 3. Level means are normalised to `[0, 1]`, weighted (L1 0.20, L2 0.25,
//!    L3 0.30, L4 0.25) and mapped onto 1-10 ([`combine_level_means`]).
//!    Only levels with data contribute weight, so the weights renormalise
//!    over the levels present.
//!
//! `None` always means "insufficient data", never a score of zero.

mod extract;
pub mod portfolio;

pub use extract::{extract_numeric_value, SCALE_MAX, SCALE_MIN};
pub use portfolio::PortfolioSummary;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::survey::{KirkpatrickLevel, ResponseData, SurveyQuestion};

/// Mean rating per level. Levels without any numeric answer are absent.
pub type LevelMeans = BTreeMap<KirkpatrickLevel, f64>;

/// Insight for scores of 8.5 and above.
pub const INSIGHT_EXCEPTIONAL: &str =
    "Exceptional impact: Program shows outstanding results across all Kirkpatrick levels.";
/// Insight for scores from 7.0 up to 8.5.
pub const INSIGHT_STRONG: &str =
    "Strong impact: Program demonstrates significant positive outcomes.";
/// Insight for scores from 5.5 up to 7.0.
pub const INSIGHT_MODERATE: &str =
    "Moderate impact: Program shows measurable benefits with room for improvement.";
/// Insight for scores from 4.0 up to 5.5.
pub const INSIGHT_LIMITED: &str =
    "Limited impact: Program needs refinement to achieve desired outcomes.";
/// Insight for scores below 4.0.
pub const INSIGHT_LOW: &str =
    "Low impact: Significant improvements needed to meet program objectives.";

/// Computed rating to be written back onto a study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRating {
    /// Score on the 1-10 scale, one decimal.
    pub ir_metric: Option<f64>,
    /// Narrative category for the score.
    pub insight: Option<String>,
}

impl ImpactRating {
    /// Rating for a known score.
    pub fn from_score(score: f64) -> Self {
        Self {
            ir_metric: Some(score),
            insight: Some(classify_insight(score).to_string()),
        }
    }

    /// Rating for a study without enough numeric answers.
    pub fn insufficient() -> Self {
        Self::default()
    }

    /// Whether a score could be computed.
    pub fn is_available(&self) -> bool {
        self.ir_metric.is_some()
    }
}

/// Average the numeric answers of every level across all responses.
pub fn level_means<R>(responses: &[R], questions: &[SurveyQuestion]) -> LevelMeans
where
    R: AsRef<ResponseData>,
{
    let mut indices_by_level: BTreeMap<&KirkpatrickLevel, Vec<usize>> = BTreeMap::new();
    for (index, question) in questions.iter().enumerate() {
        indices_by_level.entry(&question.level).or_default().push(index);
    }

    let mut means = LevelMeans::new();
    for (level, indices) in indices_by_level {
        let samples: Vec<f64> = responses
            .iter()
            .flat_map(|response| {
                let data = response.as_ref();
                indices
                    .iter()
                    .filter_map(move |&index| data.get(index).and_then(extract_numeric_value))
            })
            .collect();

        if !samples.is_empty() {
            let mean = samples.iter().sum::<f64>() / samples.len() as f64;
            means.insert(level.clone(), mean);
        }
    }

    means
}

/// Combine level means into a 1-10 score.
///
/// Returns `None` when no canonical level has a mean on the rating scale.
pub fn combine_level_means(means: &LevelMeans) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for level in KirkpatrickLevel::CANONICAL.iter() {
        let (Some(mean), Some(weight)) = (means.get(level), level.weight()) else {
            continue;
        };
        if !(SCALE_MIN..=SCALE_MAX).contains(mean) {
            continue;
        }

        let normalized = (mean - SCALE_MIN) / (SCALE_MAX - SCALE_MIN);
        weighted_sum += normalized * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return None;
    }

    let score = (weighted_sum / total_weight) * 9.0 + 1.0;
    Some(round_to_tenth(score))
}

/// Compute the Impact Rating of a study.
///
/// Answers are joined to questions by position: the answer stored under
/// index `i` belongs to `questions[i]`.
pub fn compute_impact_rating<R>(responses: &[R], questions: &[SurveyQuestion]) -> Option<f64>
where
    R: AsRef<ResponseData>,
{
    if responses.is_empty() || questions.is_empty() {
        return None;
    }

    combine_level_means(&level_means(responses, questions))
}

/// Map a score to its narrative category.
pub fn classify_insight(score: f64) -> &'static str {
    if score >= 8.5 {
        INSIGHT_EXCEPTIONAL
    } else if score >= 7.0 {
        INSIGHT_STRONG
    } else if score >= 5.5 {
        INSIGHT_MODERATE
    } else if score >= 4.0 {
        INSIGHT_LIMITED
    } else {
        INSIGHT_LOW
    }
}

/// Compute score and insight together.
pub fn evaluate<R>(responses: &[R], questions: &[SurveyQuestion]) -> ImpactRating
where
    R: AsRef<ResponseData>,
{
    match compute_impact_rating(responses, questions) {
        Some(score) => {
            debug!(score, responses = responses.len(), "Impact rating computed");
            ImpactRating::from_score(score)
        }
        None => {
            debug!(
                responses = responses.len(),
                questions = questions.len(),
                "Insufficient data for impact rating"
            );
            ImpactRating::insufficient()
        }
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_per_level() -> Vec<SurveyQuestion> {
        vec![
            SurveyQuestion::new("Level 1: Reaction", "Did you enjoy it?"),
            SurveyQuestion::new("Level 2: Learning", "Did you learn?"),
            SurveyQuestion::new("Level 3: Behavior", "Do you apply it?"),
            SurveyQuestion::new("Level 4: Results", "Did results improve?"),
        ]
    }

    #[test]
    fn test_level_means_groups_by_level() {
        let questions = vec![
            SurveyQuestion::new("Level 1: Reaction", "a"),
            SurveyQuestion::new("Level 1: Reaction", "b"),
            SurveyQuestion::new("Level 2: Learning", "c"),
        ];
        let responses = vec![
            ResponseData::from(["5", "3", "Nothing new"]),
            ResponseData::from(["4", "2 - Disagree", "4"]),
        ];

        let means = level_means(&responses, &questions);
        assert_eq!(means.get(&KirkpatrickLevel::Reaction), Some(&3.5));
        assert_eq!(means.get(&KirkpatrickLevel::Learning), Some(&4.0));
        assert_eq!(means.len(), 2);
    }

    #[test]
    fn test_level_means_omits_levels_without_numbers() {
        let questions = one_per_level();
        let responses = vec![ResponseData::from(["5", "Loved it", "", "n/a"])];

        let means = level_means(&responses, &questions);
        assert_eq!(means.len(), 1);
        assert!(means.contains_key(&KirkpatrickLevel::Reaction));
    }

    #[test]
    fn test_level_means_includes_unrecognized_levels() {
        let questions = vec![SurveyQuestion::new("Engagement", "How engaged?")];
        let responses = vec![ResponseData::from(["4"])];

        let means = level_means(&responses, &questions);
        assert_eq!(
            means.get(&KirkpatrickLevel::Unrecognized("Engagement".to_string())),
            Some(&4.0)
        );
        assert_eq!(combine_level_means(&means), None);
    }

    #[test]
    fn test_combine_all_levels() {
        let mut means = LevelMeans::new();
        means.insert(KirkpatrickLevel::Reaction, 5.0);
        means.insert(KirkpatrickLevel::Learning, 4.0);
        means.insert(KirkpatrickLevel::Behavior, 3.0);
        means.insert(KirkpatrickLevel::Results, 2.0);

        assert_eq!(combine_level_means(&means), Some(6.4));
    }

    #[test]
    fn test_combine_renormalizes_missing_levels() {
        // L3 = 5 (1.0), L4 = 1 (0.0): 0.30 / 0.55 * 9 + 1 = 5.909...
        let mut means = LevelMeans::new();
        means.insert(KirkpatrickLevel::Behavior, 5.0);
        means.insert(KirkpatrickLevel::Results, 1.0);

        assert_eq!(combine_level_means(&means), Some(5.9));
    }

    #[test]
    fn test_combine_skips_out_of_scale_means() {
        let mut means = LevelMeans::new();
        means.insert(KirkpatrickLevel::Reaction, 7.0);
        assert_eq!(combine_level_means(&means), None);

        means.insert(KirkpatrickLevel::Learning, 5.0);
        assert_eq!(combine_level_means(&means), Some(10.0));
    }

    #[test]
    fn test_combine_empty() {
        assert_eq!(combine_level_means(&LevelMeans::new()), None);
    }

    #[test]
    fn test_compute_short_circuits() {
        let no_responses: Vec<ResponseData> = Vec::new();
        assert_eq!(compute_impact_rating(&no_responses, &one_per_level()), None);

        let responses = vec![ResponseData::from(["5"])];
        assert_eq!(compute_impact_rating(&responses, &[]), None);
    }

    #[test]
    fn test_compute_extremes() {
        let questions = one_per_level();
        let all_fives = vec![ResponseData::from(["5", "5", "5", "5"])];
        let all_ones = vec![ResponseData::from(["1", "1", "1", "1"])];

        assert_eq!(compute_impact_rating(&all_fives, &questions), Some(10.0));
        assert_eq!(compute_impact_rating(&all_ones, &questions), Some(1.0));
    }

    #[test]
    fn test_compute_ignores_answers_past_question_list() {
        let questions = vec![SurveyQuestion::new("Level 2: Learning", "q")];
        let responses = vec![ResponseData::from(["3", "5", "5"])];

        // Only index 0 maps to a question: mean 3 -> 0.5 * 9 + 1
        assert_eq!(compute_impact_rating(&responses, &questions), Some(5.5));
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify_insight(10.0), INSIGHT_EXCEPTIONAL);
        assert_eq!(classify_insight(8.5), INSIGHT_EXCEPTIONAL);
        assert_eq!(classify_insight(8.49), INSIGHT_STRONG);
        assert_eq!(classify_insight(7.0), INSIGHT_STRONG);
        assert_eq!(classify_insight(6.99), INSIGHT_MODERATE);
        assert_eq!(classify_insight(5.5), INSIGHT_MODERATE);
        assert_eq!(classify_insight(5.49), INSIGHT_LIMITED);
        assert_eq!(classify_insight(4.0), INSIGHT_LIMITED);
        assert_eq!(classify_insight(3.99), INSIGHT_LOW);
        assert_eq!(classify_insight(1.0), INSIGHT_LOW);
        assert_eq!(classify_insight(-3.0), INSIGHT_LOW);
    }

    #[test]
    fn test_evaluate() {
        let questions = one_per_level();
        let responses = vec![ResponseData::from(["5", "4", "3", "2"])];

        let rating = evaluate(&responses, &questions);
        assert_eq!(rating.ir_metric, Some(6.4));
        assert_eq!(rating.insight.as_deref(), Some(INSIGHT_MODERATE));
        assert!(rating.is_available());

        let empty = evaluate::<ResponseData>(&[], &questions);
        assert_eq!(empty, ImpactRating::insufficient());
        assert!(!empty.is_available());
    }
}
