//! Survey questions, response payloads, and generator output.
//!
//! Everything arriving from the intake form or the survey generator is
//! decoded here, once, into typed values. The rating core only ever sees
//! [`SurveyQuestion`] with a decoded [`KirkpatrickLevel`] and
//! [`ResponseData`] keyed by question index.

mod response;


pub use response::{ResponseData, SurveyResponse};

use serde::{Deserialize, Serialize};

use crate::error::SurveyResult;

/// Evaluation level of the Kirkpatrick model a question belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KirkpatrickLevel {
    /// Level 1: participant reaction.
    Reaction,
    /// Level 2: knowledge and skill acquisition.
    Learning,
    /// Level 3: application on the job.
    Behavior,
    /// Level 4: business results.
    Results,
    /// Any label that is not one of the four levels, keyed by its prefix.
    Unrecognized(String),
}

impl KirkpatrickLevel {
    /// The four canonical levels in ascending order.
    pub const CANONICAL: [KirkpatrickLevel; 4] = [
        KirkpatrickLevel::Reaction,
        KirkpatrickLevel::Learning,
        KirkpatrickLevel::Behavior,
        KirkpatrickLevel::Results,
    ];

    /// Decode a label such as `"Level 3: Behavior"`.
    ///
    /// Only the text before the first `:` is significant. A label without a
    /// colon is keyed by its whole trimmed text.
    pub fn from_label(label: &str) -> Self {
        let key = label.split(':').next().unwrap_or_default().trim();
        match key {
            "Level 1" => KirkpatrickLevel::Reaction,
            "Level 2" => KirkpatrickLevel::Learning,
            "Level 3" => KirkpatrickLevel::Behavior,
            "Level 4" => KirkpatrickLevel::Results,
            other => KirkpatrickLevel::Unrecognized(other.to_string()),
        }
    }

    /// Grouping key, e.g. `"Level 2"`.
    pub fn key(&self) -> &str {
        match self {
            KirkpatrickLevel::Reaction => "Level 1",
            KirkpatrickLevel::Learning => "Level 2",
            KirkpatrickLevel::Behavior => "Level 3",
            KirkpatrickLevel::Results => "Level 4",
            KirkpatrickLevel::Unrecognized(key) => key,
        }
    }

    /// Full label, e.g. `"Level 2: Learning"`.
    pub fn label(&self) -> String {
        match self {
            KirkpatrickLevel::Reaction => "Level 1: Reaction".to_string(),
            KirkpatrickLevel::Learning => "Level 2: Learning".to_string(),
            KirkpatrickLevel::Behavior => "Level 3: Behavior".to_string(),
            KirkpatrickLevel::Results => "Level 4: Results".to_string(),
            KirkpatrickLevel::Unrecognized(key) => key.clone(),
        }
    }

    /// Weight of this level in the Impact Rating, `None` for unrecognized labels.
    pub fn weight(&self) -> Option<f64> {
        match self {
            KirkpatrickLevel::Reaction => Some(0.20),
            KirkpatrickLevel::Learning => Some(0.25),
            KirkpatrickLevel::Behavior => Some(0.30),
            KirkpatrickLevel::Results => Some(0.25),
            KirkpatrickLevel::Unrecognized(_) => None,
        }
    }

    /// Whether this is one of the four canonical levels.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, KirkpatrickLevel::Unrecognized(_))
    }
}

impl From<String> for KirkpatrickLevel {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<&str> for KirkpatrickLevel {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl From<KirkpatrickLevel> for String {
    fn from(level: KirkpatrickLevel) -> Self {
        level.label()
    }
}

impl std::fmt::Display for KirkpatrickLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single generated survey question.
///
/// The level label is kept exactly as written (for example
/// `"Level 1: Reaction & Satisfaction"`) next to its decoded level, so a
/// stored survey reads back the way the generator produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuestionRecord", into = "QuestionRecord")]
pub struct SurveyQuestion {
    /// Kirkpatrick level the question measures.
    pub level: KirkpatrickLevel,
    level_label: String,
    /// Question text shown to respondents.
    pub question: String,
    /// Target audience (Participant, Manager, HR).
    pub audience: String,
    /// Question type (Rating Scale, Multiple Choice, Open-ended).
    pub question_type: String,
}

impl SurveyQuestion {
    /// Create a new question from a level label.
    pub fn new(level_label: impl Into<String>, question: impl Into<String>) -> Self {
        let level_label = level_label.into();
        Self {
            level: KirkpatrickLevel::from_label(&level_label),
            level_label,
            question: question.into(),
            audience: "Participant".to_string(),
            question_type: "Rating Scale".to_string(),
        }
    }

    /// Level label as originally written.
    pub fn level_label(&self) -> &str {
        &self.level_label
    }

    /// Set the target audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Set the question type.
    pub fn with_type(mut self, question_type: impl Into<String>) -> Self {
        self.question_type = question_type.into();
        self
    }
}

/// Wire form of a question.
#[derive(Serialize, Deserialize)]
struct QuestionRecord {
    level: String,
    question: String,
    #[serde(default)]
    audience: String,
    #[serde(rename = "type", default)]
    question_type: String,
}

impl From<QuestionRecord> for SurveyQuestion {
    fn from(record: QuestionRecord) -> Self {
        Self {
            level: KirkpatrickLevel::from_label(&record.level),
            level_label: record.level,
            question: record.question,
            audience: record.audience,
            question_type: record.question_type,
        }
    }
}

impl From<SurveyQuestion> for QuestionRecord {
    fn from(question: SurveyQuestion) -> Self {
        Self {
            level: question.level_label,
            question: question.question,
            audience: question.audience,
            question_type: question.question_type,
        }
    }
}

/// Recommended number of respondents produced alongside a generated survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSize {
    /// Recommended number of respondents.
    pub recommended: u32,
    /// Reasoning behind the recommendation.
    #[serde(default)]
    pub explanation: String,
}

/// Output document of the survey generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSurvey {
    /// Generated questions, in presentation order.
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    /// Recommended sample size, when the generator produced one.
    #[serde(default)]
    pub sample_size: Option<SampleSize>,
}

impl GeneratedSurvey {
    /// Parse the generator's JSON completion text.
    pub fn from_completion(completion: &str) -> SurveyResult<Self> {
        Ok(serde_json::from_str(completion)?)
    }

    /// Number of questions per canonical level, in level order.
    pub fn level_counts(&self) -> [(KirkpatrickLevel, usize); 4] {
        KirkpatrickLevel::CANONICAL.map(|level| {
            let count = self.questions.iter().filter(|q| q.level == level).count();
            (level, count)
        })
    }
}
