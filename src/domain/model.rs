use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// 評分量表的一個等級，`color` 僅供前端顯示使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingLevel {
    pub label: String,
    pub value: f64,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingScale(pub Vec<RatingLevel>);

impl RatingScale {
    pub fn levels(&self) -> &[RatingLevel] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn level_for(&self, value: f64) -> Option<&RatingLevel> {
        self.0.iter().find(|level| level.value == value)
    }

    pub fn label_for(&self, value: f64) -> Option<&str> {
        self.level_for(value).map(|level| level.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub evaluated_id: String,
    pub evaluated_name: String,
    pub rating: f64,
    pub rating_label: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub evaluator_id: String,
    pub evaluator_name: String,
    /// ISO-8601 UTC，精確到毫秒
    pub timestamp: String,
    pub evaluations: Vec<Evaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub submission_count: usize,
    pub participant_count: usize,
    pub submission_rate_percent: f64,
    pub evaluation_count: usize,
    pub average_rating: f64,
}

/// 匯出 CSV 的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Evaluator ID")]
    pub evaluator_id: String,
    #[serde(rename = "Evaluator Name")]
    pub evaluator_name: String,
    #[serde(rename = "Evaluated ID")]
    pub evaluated_id: String,
    #[serde(rename = "Evaluated Name")]
    pub evaluated_name: String,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "Rating Label")]
    pub rating_label: String,
    #[serde(rename = "Comment", default)]
    pub comment: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl ExportRow {
    pub fn from_evaluation(submission: &Submission, evaluation: &Evaluation) -> Self {
        Self {
            evaluator_id: submission.evaluator_id.clone(),
            evaluator_name: submission.evaluator_name.clone(),
            evaluated_id: evaluation.evaluated_id.clone(),
            evaluated_name: evaluation.evaluated_name.clone(),
            rating: evaluation.rating,
            rating_label: evaluation.rating_label.clone(),
            comment: evaluation.comment.clone(),
            timestamp: submission.timestamp.clone(),
        }
    }

    pub fn is_self_evaluation(&self) -> bool {
        self.evaluator_id == self.evaluated_id
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
