use crate::core::export::parse_export;
use crate::domain::model::ExportRow;
use crate::utils::error::{EvalError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfEvaluationSummary {
    pub count: usize,
    pub average_self_rating: f64,
    /// 全部都是自評時為 `None`
    pub average_rating_of_others: Option<f64>,
}

/// 匯出（或合併後）評分資料的統計分析
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub total_evaluations: usize,
    pub unique_evaluators: usize,
    pub unique_evaluated: usize,
    pub average_rating: f64,
    pub min_rating: f64,
    pub max_rating: f64,
    pub distribution: Vec<LabelShare>,
    pub self_evaluation: Option<SelfEvaluationSummary>,
    pub submitters: usize,
    pub evaluated: usize,
    pub non_submitters: Vec<String>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

impl AnalysisReport {
    pub fn from_rows(rows: &[ExportRow]) -> Self {
        let evaluators: BTreeSet<&str> = rows.iter().map(|r| r.evaluator_id.as_str()).collect();
        let evaluated: BTreeSet<&str> = rows.iter().map(|r| r.evaluated_id.as_str()).collect();

        let mut label_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in rows {
            *label_counts.entry(row.rating_label.as_str()).or_default() += 1;
        }
        let distribution = label_counts
            .into_iter()
            .map(|(label, count)| LabelShare {
                label: label.to_string(),
                count,
                percent: count as f64 / rows.len() as f64 * 100.0,
            })
            .collect();

        let self_count = rows.iter().filter(|r| r.is_self_evaluation()).count();
        let self_evaluation = (self_count > 0).then(|| SelfEvaluationSummary {
            count: self_count,
            average_self_rating: mean(
                rows.iter()
                    .filter(|r| r.is_self_evaluation())
                    .map(|r| r.rating),
            )
            .unwrap_or(0.0),
            average_rating_of_others: mean(
                rows.iter()
                    .filter(|r| !r.is_self_evaluation())
                    .map(|r| r.rating),
            ),
        });

        let non_submitters = evaluated
            .difference(&evaluators)
            .map(|id| id.to_string())
            .collect();

        Self {
            total_evaluations: rows.len(),
            unique_evaluators: evaluators.len(),
            unique_evaluated: evaluated.len(),
            average_rating: mean(rows.iter().map(|r| r.rating)).unwrap_or(0.0),
            min_rating: rows.iter().map(|r| r.rating).reduce(f64::min).unwrap_or(0.0),
            max_rating: rows.iter().map(|r| r.rating).reduce(f64::max).unwrap_or(0.0),
            distribution,
            self_evaluation,
            submitters: evaluators.len(),
            evaluated: evaluated.len(),
            non_submitters,
        }
    }

    pub fn from_csv_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EvalError::ProcessingError {
                message: format!("File not found: {}", path.display()),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_rows(&parse_export(&text)?))
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 ANALYSIS REPORT")?;
        writeln!(f, "{}", "=".repeat(50))?;

        writeln!(f, "📈 BASIC STATISTICS")?;
        writeln!(f, "   Total evaluations: {}", self.total_evaluations)?;
        writeln!(f, "   Unique evaluators: {}", self.unique_evaluators)?;
        writeln!(f, "   Unique evaluated students: {}", self.unique_evaluated)?;
        writeln!(f, "   Average rating: {:.1}", self.average_rating)?;
        writeln!(
            f,
            "   Rating range: {:.1} - {:.1}",
            self.min_rating, self.max_rating
        )?;

        writeln!(f)?;
        writeln!(f, "🎯 RATING DISTRIBUTION")?;
        for share in &self.distribution {
            writeln!(
                f,
                "   {}: {} ({:.1}%)",
                share.label, share.count, share.percent
            )?;
        }

        if let Some(self_eval) = &self.self_evaluation {
            writeln!(f)?;
            writeln!(f, "🪞 SELF-EVALUATION ANALYSIS")?;
            writeln!(f, "   Self-evaluations: {}", self_eval.count)?;
            writeln!(
                f,
                "   Average self-rating: {:.1}",
                self_eval.average_self_rating
            )?;
            if let Some(others) = self_eval.average_rating_of_others {
                writeln!(f, "   Average rating of others: {:.1}", others)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "👥 PARTICIPATION ANALYSIS")?;
        writeln!(f, "   Students who submitted: {}", self.submitters)?;
        writeln!(f, "   Students who were evaluated: {}", self.evaluated)?;
        if !self.non_submitters.is_empty() {
            writeln!(
                f,
                "   Students who didn't submit: {}",
                self.non_submitters.len()
            )?;
            writeln!(f, "   Non-submitters: {}", self.non_submitters.join(", "))?;
        }
        Ok(())
    }
}
