use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::answers::numeric_value;
use super::error::InvalidInput;

/// Business parameter bounding the share of revenue a zero score is assumed to lose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    pub max_loss_fraction: f64,
}

/// Projected loss for a given score and revenue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossEstimate {
    pub loss_fraction: f64,
    pub estimated_loss: f64,
}

impl LossEstimate {
    /// Loss fraction expressed as a percentage of revenue.
    pub fn loss_percentage(&self) -> f64 {
        self.loss_fraction * 100.0
    }
}

/// `loss_fraction = (100 - score) / 100 * max_loss_fraction`, applied to `annual_revenue`.
///
/// Out-of-domain operands are rejected instead of clamped so upstream mistakes surface.
pub fn estimate_loss(
    overall_score: f64,
    annual_revenue: f64,
    config: &LossConfig,
) -> Result<LossEstimate, InvalidInput> {
    if !overall_score.is_finite() {
        return Err(InvalidInput::NotNumeric {
            field: "overall_score",
        });
    }
    if !(0.0..=100.0).contains(&overall_score) {
        return Err(InvalidInput::ScoreOutOfRange {
            score: overall_score,
        });
    }
    if !annual_revenue.is_finite() {
        return Err(InvalidInput::NotNumeric {
            field: "annual_revenue",
        });
    }
    if annual_revenue < 0.0 {
        return Err(InvalidInput::NegativeRevenue {
            revenue: annual_revenue,
        });
    }
    let fraction = config.max_loss_fraction;
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(InvalidInput::LossFractionOutOfRange { fraction });
    }

    let loss_fraction = (100.0 - overall_score) / 100.0 * fraction;
    Ok(LossEstimate {
        loss_fraction,
        estimated_loss: annual_revenue * loss_fraction,
    })
}

/// Same as [`estimate_loss`] for operands taken straight from a request body.
pub fn estimate_loss_from_json(
    overall_score: Option<&Value>,
    annual_revenue: Option<&Value>,
    config: &LossConfig,
) -> Result<LossEstimate, InvalidInput> {
    let overall_score = required_number(overall_score, "overall_score")?;
    let annual_revenue = required_number(annual_revenue, "annual_revenue")?;
    estimate_loss(overall_score, annual_revenue, config)
}

fn required_number(value: Option<&Value>, field: &'static str) -> Result<f64, InvalidInput> {
    match value {
        None | Some(Value::Null) => Err(InvalidInput::Missing { field }),
        Some(value) => numeric_value(value).ok_or(InvalidInput::NotNumeric { field }),
    }
}
