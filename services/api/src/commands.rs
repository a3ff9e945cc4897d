use crate::infra::{parse_loss_preset, parse_scoring_preset};
use clap::Args;
use gestor360::api::CalculationResponse;
use gestor360::diagnostic::{
    estimate_loss, DiagnosticResult, LossEstimate, LossPreset, ScoreCalculator, ScoringPreset,
};
use gestor360::error::AppError;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding the answers, or a full `{"respostas": ...}` request body
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Questionnaire generation: `ranged` or `prefixed`
    #[arg(long, default_value = "ranged", value_parser = parse_scoring_preset)]
    pub(crate) preset: ScoringPreset,
    /// Override the preset's scale factor
    #[arg(long)]
    pub(crate) scale_factor: Option<f64>,
    /// Print the API response body instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LossArgs {
    /// Overall diagnostic score (0-100)
    #[arg(long)]
    pub(crate) score: f64,
    /// Annual revenue in BRL
    #[arg(long)]
    pub(crate) revenue: f64,
    /// Loss multiplier preset: `standard` (15%) or `extended` (20%)
    #[arg(long, default_value = "standard", value_parser = parse_loss_preset)]
    pub(crate) preset: LossPreset,
    /// Override the preset's maximum loss fraction
    #[arg(long)]
    pub(crate) max_loss_fraction: Option<f64>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        answers,
        preset,
        scale_factor,
        json,
    } = args;

    let raw = std::fs::read_to_string(&answers)?;
    let document: Value = serde_json::from_str(&raw)?;
    let answers = match document.get("respostas") {
        Some(inner) => inner.clone(),
        None => document,
    };

    let mut config = preset.config();
    if let Some(scale_factor) = scale_factor {
        config.scale_factor = scale_factor;
    }
    let result = ScoreCalculator::new(config).compute_from_json(&answers, &preset.categories())?;

    if json {
        let body = CalculationResponse::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_score(preset, &result));
    }
    Ok(())
}

pub(crate) fn run_loss(args: LossArgs) -> Result<(), AppError> {
    let LossArgs {
        score,
        revenue,
        preset,
        max_loss_fraction,
    } = args;

    let mut config = preset.config();
    if let Some(max_loss_fraction) = max_loss_fraction {
        config.max_loss_fraction = max_loss_fraction;
    }
    let estimate = estimate_loss(score, revenue, &config)?;
    print!("{}", render_loss(score, revenue, &estimate));
    Ok(())
}

fn render_score(preset: ScoringPreset, result: &DiagnosticResult) -> String {
    let rounded = result.rounded();
    let mut out = String::new();
    let _ = writeln!(out, "Diagnóstico Gestor 360° ({preset} preset)");
    let _ = writeln!(
        out,
        "Pontuação total: {:.1} ({} respostas)",
        rounded.overall_score, rounded.answered_count
    );
    for category in &rounded.per_category {
        let _ = writeln!(
            out,
            "  - {:<24} média {:>5.1} | {:>3} questões | {:.1} pontos",
            category.label, category.average, category.answered_count, category.points_sum
        );
    }
    out
}

fn render_loss(score: f64, revenue: f64, estimate: &LossEstimate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pontuação {score:.1} sobre faturamento de R$ {revenue:.2}");
    let _ = writeln!(
        out,
        "Perda estimada: R$ {:.2} ({:.3}% do faturamento)",
        estimate.estimated_loss,
        estimate.loss_percentage()
    );
    out
}
