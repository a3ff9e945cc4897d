//! Named variants of the questionnaire scoring rules.
//!
//! Two generations of the questionnaire are in circulation: the positional one (answers on
//! a 0–10 scale, indexed 0..=79) and the keyed one (answers on a 0–5 scale, keys prefixed
//! with the category name). Neither is privileged in code; deployments choose a preset and
//! may override its dials.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::category::CategoryDefinition;
use super::loss::LossConfig;
use super::score::{OverallAggregation, ScoringConfig};

pub const RANGED_SCALE_FACTOR: f64 = 10.0;
pub const PREFIXED_SCALE_FACTOR: f64 = 20.0;
pub const STANDARD_MAX_LOSS_FRACTION: f64 = 0.15;
pub const EXTENDED_MAX_LOSS_FRACTION: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPreset {
    /// Positional answers 0..=79, scale 10, overall weighted by question.
    #[default]
    Ranged,
    /// Category-prefixed answers, scale 20, overall as the mean of category averages.
    Prefixed,
}

impl ScoringPreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ranged" | "range" | "indexed" => Some(Self::Ranged),
            "prefixed" | "prefix" | "keyed" => Some(Self::Prefixed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoringPreset::Ranged => "ranged",
            ScoringPreset::Prefixed => "prefixed",
        }
    }

    pub fn config(&self) -> ScoringConfig {
        match self {
            ScoringPreset::Ranged => ScoringConfig {
                scale_factor: RANGED_SCALE_FACTOR,
                aggregation: OverallAggregation::WeightedByQuestion,
            },
            ScoringPreset::Prefixed => ScoringConfig {
                scale_factor: PREFIXED_SCALE_FACTOR,
                aggregation: OverallAggregation::MeanOfCategoryAverages,
            },
        }
    }

    pub fn categories(&self) -> Vec<CategoryDefinition> {
        match self {
            ScoringPreset::Ranged => vec![
                CategoryDefinition::range("Tesouraria", 0, 9),
                CategoryDefinition::range("Resultados & DRE", 10, 19),
                CategoryDefinition::range("Fluxo de Caixa", 20, 35),
                CategoryDefinition::range("Orçamento", 36, 45),
                CategoryDefinition::range("Investimentos", 46, 55),
                CategoryDefinition::range("Riscos Financeiros", 56, 65),
                CategoryDefinition::range("Indicadores Financeiros", 66, 75),
                CategoryDefinition::range("Planejamento Tributário", 76, 79),
            ],
            ScoringPreset::Prefixed => vec![
                CategoryDefinition::prefix("Tesouraria", "tesouraria"),
                CategoryDefinition::prefix("Resultados & DRE", "resultados"),
                CategoryDefinition::prefix("Fluxo de Caixa", "fluxoCaixa"),
                CategoryDefinition::prefix("Orçamento", "orcamento"),
                CategoryDefinition::prefix("Investimentos", "investimentos"),
                CategoryDefinition::prefix("Riscos Financeiros", "riscos"),
                CategoryDefinition::prefix("Indicadores Financeiros", "indicadores"),
                CategoryDefinition::prefix("Planejamento Tributário", "tributario"),
            ],
        }
    }
}

impl fmt::Display for ScoringPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPreset {
    /// 15% of revenue at a zero score.
    #[default]
    Standard,
    /// 20% of revenue at a zero score.
    Extended,
}

impl LossPreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "0.15" => Some(Self::Standard),
            "extended" | "0.20" | "0.2" => Some(Self::Extended),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LossPreset::Standard => "standard",
            LossPreset::Extended => "extended",
        }
    }

    pub fn config(&self) -> LossConfig {
        let max_loss_fraction = match self {
            LossPreset::Standard => STANDARD_MAX_LOSS_FRACTION,
            LossPreset::Extended => EXTENDED_MAX_LOSS_FRACTION,
        };
        LossConfig { max_loss_fraction }
    }
}

impl fmt::Display for LossPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
