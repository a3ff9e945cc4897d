/// Rejection raised when caller-supplied input falls outside the calculators' domain.
///
/// This is the only failure the scoring core produces. It is always recoverable by the
/// caller (reject the request or ask again) and carries enough context for a 400 response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("answers must be a keyed collection, found {found}")]
    AnswersNotKeyed { found: &'static str },
    #[error("answers array carries no numeric entries")]
    AnswersNotNumeric,
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be a finite number")]
    NotNumeric { field: &'static str },
    #[error("overall score {score} is outside 0..=100")]
    ScoreOutOfRange { score: f64 },
    #[error("annual revenue {revenue} must not be negative")]
    NegativeRevenue { revenue: f64 },
    #[error("max loss fraction {fraction} is outside 0..=1")]
    LossFractionOutOfRange { fraction: f64 },
}
