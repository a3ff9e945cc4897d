//! Questionnaire scoring and loss estimation.
//!
//! Everything in this module is a pure, synchronous computation over small value types:
//! no logging, no I/O, no shared state. Callers decide what to do with [`InvalidInput`].

pub mod answers;
pub mod category;
mod error;
pub mod loss;
pub mod preset;
pub mod score;

pub use answers::{numeric_value, AnswerKey, AnswerSet};
pub use category::{CategoryDefinition, KeySelector};
pub use error::InvalidInput;
pub use loss::{estimate_loss, estimate_loss_from_json, LossConfig, LossEstimate};
pub use preset::{LossPreset, ScoringPreset};
pub use score::{
    round_to_tenth, CategoryScore, DiagnosticResult, OverallAggregation, ScoreCalculator,
    ScoringConfig,
};
