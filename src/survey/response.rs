use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{SurveyError, SurveyResult};

/// Answers of one respondent, keyed by question index.
///
/// On the wire this is a JSON object whose keys are decimal indices
/// (`{"0": "5", "1": "Great program!"}`). Keys that are not non-negative
/// integers are rejected; `null` answers are dropped; numbers and booleans
/// are kept as their text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, String>"
)]
pub struct ResponseData {
    answers: BTreeMap<usize, String>,
}

impl ResponseData {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the answer for a question index.
    pub fn with_answer(mut self, index: usize, answer: impl Into<String>) -> Self {
        self.answers.insert(index, answer.into());
        self
    }

    /// Answer for a question index, if one was given.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// Highest answered index.
    pub fn max_index(&self) -> Option<usize> {
        self.answers.keys().next_back().copied()
    }

    /// Number of answered questions.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Whether no question was answered.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Reject answers that point past the end of a question list.
    pub fn validate_against(&self, question_count: usize) -> SurveyResult<()> {
        match self.max_index() {
            Some(index) if index >= question_count => Err(SurveyError::UnknownQuestion {
                index,
                question_count,
            }),
            _ => Ok(()),
        }
    }

    /// Decode a payload from JSON text.
    pub fn from_json(json: &str) -> SurveyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<const N: usize> From<[&str; N]> for ResponseData {
    fn from(answers: [&str; N]) -> Self {
        Self {
            answers: answers
                .iter()
                .enumerate()
                .map(|(i, a)| (i, (*a).to_string()))
                .collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, Value>> for ResponseData {
    type Error = SurveyError;

    fn try_from(raw: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut answers = BTreeMap::new();

        for (key, value) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| SurveyError::InvalidQuestionIndex { key: key.clone() })?;

            let answer = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) => {
                    return Err(SurveyError::InvalidAnswer {
                        index,
                        reason: "arrays are not supported".to_string(),
                    })
                }
                Value::Object(_) => {
                    return Err(SurveyError::InvalidAnswer {
                        index,
                        reason: "objects are not supported".to_string(),
                    })
                }
            };

            answers.insert(index, answer);
        }

        Ok(Self { answers })
    }
}

impl From<ResponseData> for BTreeMap<String, String> {
    fn from(data: ResponseData) -> Self {
        data.answers
            .into_iter()
            .map(|(i, a)| (i.to_string(), a))
            .collect()
    }
}

impl AsRef<ResponseData> for ResponseData {
    fn as_ref(&self) -> &ResponseData {
        self
    }
}

/// One respondent's submission for a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    /// Unique response identifier.
    pub id: String,
    /// Study the response belongs to.
    pub study_id: String,
    /// Invitation the respondent came through, if any.
    pub invitation_id: Option<String>,
    /// Answers keyed by question index.
    pub response_data: ResponseData,
    /// When the response was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl SurveyResponse {
    /// Create a new response for a study
    pub fn new(study_id: impl Into<String>, response_data: ResponseData) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            study_id: study_id.into(),
            invitation_id: None,
            response_data,
            submitted_at: Utc::now(),
        }
    }

    /// Attach the invitation this response answers
    pub fn with_invitation(mut self, invitation_id: impl Into<String>) -> Self {
        self.invitation_id = Some(invitation_id.into());
        self
    }
}

impl AsRef<ResponseData> for SurveyResponse {
    fn as_ref(&self) -> &ResponseData {
        &self.response_data
    }
}
