use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::answers::AnswerSet;
use super::category::CategoryDefinition;
use super::error::InvalidInput;

/// How the overall score is derived from the answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverallAggregation {
    /// Every answered question weighs the same, regardless of its category size.
    WeightedByQuestion,
    /// Every category weighs the same, regardless of how many questions it holds.
    MeanOfCategoryAverages,
}

impl OverallAggregation {
    pub fn label(&self) -> &'static str {
        match self {
            OverallAggregation::WeightedByQuestion => "weighted-by-question",
            OverallAggregation::MeanOfCategoryAverages => "mean-of-category-averages",
        }
    }
}

/// Scoring dials. `scale_factor` lifts the raw answer scale onto 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub scale_factor: f64,
    pub aggregation: OverallAggregation,
}

/// Aggregate for one category. `average` is already scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub label: String,
    pub points_sum: f64,
    pub answered_count: usize,
    pub average: f64,
}

/// Scores for a questionnaire submission, kept at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub overall_score: f64,
    pub per_category: Vec<CategoryScore>,
    /// Every numeric answer in the submission, matched by a category or not.
    pub answered_count: usize,
}

impl DiagnosticResult {
    pub fn category(&self, label: &str) -> Option<&CategoryScore> {
        self.per_category.iter().find(|score| score.label == label)
    }

    /// Copy with the overall score and category averages rounded to one decimal.
    pub fn rounded(&self) -> Self {
        Self {
            overall_score: round_to_tenth(self.overall_score),
            per_category: self
                .per_category
                .iter()
                .map(|score| CategoryScore {
                    average: round_to_tenth(score.average),
                    ..score.clone()
                })
                .collect(),
            answered_count: self.answered_count,
        }
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stateless calculator applying a [`ScoringConfig`] to answer sets.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl ScoreCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn compute_diagnostic(
        &self,
        answers: &AnswerSet,
        categories: &[CategoryDefinition],
    ) -> DiagnosticResult {
        let scale = self.config.scale_factor;

        let per_category: Vec<CategoryScore> = categories
            .iter()
            .map(|category| {
                let (points_sum, answered_count) = category
                    .selector
                    .select(answers)
                    .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

                let average = if answered_count > 0 {
                    points_sum / answered_count as f64 * scale
                } else {
                    0.0
                };

                CategoryScore {
                    label: category.label.clone(),
                    points_sum,
                    answered_count,
                    average,
                }
            })
            .collect();

        // Answers outside every category still count as answered questions.
        let answered_count = answers.len();

        let overall_score = match self.config.aggregation {
            OverallAggregation::WeightedByQuestion => {
                let total_points: f64 = per_category.iter().map(|score| score.points_sum).sum();
                if answered_count > 0 {
                    total_points / answered_count as f64 * scale
                } else {
                    0.0
                }
            }
            OverallAggregation::MeanOfCategoryAverages => {
                if per_category.is_empty() {
                    0.0
                } else {
                    let total: f64 = per_category.iter().map(|score| score.average).sum();
                    total / per_category.len() as f64
                }
            }
        };

        DiagnosticResult {
            overall_score,
            per_category,
            answered_count,
        }
    }

    /// Decode raw `respostas` JSON and score it.
    pub fn compute_from_json(
        &self,
        answers: &Value,
        categories: &[CategoryDefinition],
    ) -> Result<DiagnosticResult, InvalidInput> {
        let answers = AnswerSet::from_json(answers)?;
        Ok(self.compute_diagnostic(&answers, categories))
    }
}
