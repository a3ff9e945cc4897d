//! Request and response bodies exchanged with the questionnaire front end.
//!
//! Field names follow the front end's Portuguese JSON contract.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::backend::{AuthenticatedUser, RecordId, StoredCompany, StoredDiagnostic};
use crate::diagnostic::{numeric_value, CategoryScore, DiagnosticResult, LossEstimate};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "senha")]
    pub password: Option<String>,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "senha")]
    pub password: Option<String>,
}

/// Questionnaire submission. Both parts are required; their shape is checked downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationRequest {
    #[serde(default, rename = "respostas")]
    pub answers: Option<Value>,
    #[serde(default, rename = "dadosEmpresa")]
    pub company: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossRequest {
    #[serde(default, rename = "pontuacaoTotal")]
    pub overall_score: Option<Value>,
    #[serde(default, rename = "faturamentoAnual")]
    pub annual_revenue: Option<Value>,
}

/// Company details pulled out of `dadosEmpresa`; the full object is stored verbatim too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub size: Option<String>,
    pub sector: Option<String>,
    pub annual_revenue: f64,
}

impl CompanyProfile {
    pub fn from_json(value: &Value) -> Self {
        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            name: text("nomeEmpresa"),
            size: text("porte"),
            sector: text("setor"),
            annual_revenue: value
                .get("faturamentoAnual")
                .and_then(numeric_value)
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: Option<String>,
    #[serde(rename = "nome")]
    pub name: String,
}

impl UserView {
    pub fn from_user(user: &AuthenticatedUser, fallback_name: &str) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user
                .name
                .clone()
                .unwrap_or_else(|| fallback_name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "mensagem")]
    pub message: &'static str,
    #[serde(rename = "usuario")]
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "mensagem")]
    pub message: &'static str,
    pub token: String,
    #[serde(rename = "usuario")]
    pub user: UserView,
}

/// Per-category entry rendered as `{pontos, questoes, media}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScoreView {
    #[serde(rename = "pontos")]
    pub points: f64,
    #[serde(rename = "questoes")]
    pub answered: usize,
    #[serde(rename = "media")]
    pub average: f64,
}

impl From<&CategoryScore> for CategoryScoreView {
    fn from(score: &CategoryScore) -> Self {
        Self {
            points: score.points_sum,
            answered: score.answered_count,
            average: score.average,
        }
    }
}

/// Category scores serialized as a JSON object keyed by label, in definition order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScores(pub Vec<(String, CategoryScoreView)>);

impl Serialize for CategoryScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, view) in &self.0 {
            map.serialize_entry(label, view)?;
        }
        map.end()
    }
}

impl CategoryScores {
    pub fn from_result(result: &DiagnosticResult) -> Self {
        Self(
            result
                .per_category
                .iter()
                .map(|score| (score.label.clone(), CategoryScoreView::from(score)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculationResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    /// Overall score with one decimal, as text.
    #[serde(rename = "pontuacaoTotal")]
    pub overall_score: String,
    #[serde(rename = "pontuacoesCategorias")]
    pub category_scores: CategoryScores,
    #[serde(rename = "mensagem", skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(rename = "empresaSalva", skip_serializing_if = "Option::is_none")]
    pub company_saved: Option<bool>,
    #[serde(rename = "empresaId", skip_serializing_if = "Option::is_none")]
    pub company_id: Option<RecordId>,
}

impl CalculationResponse {
    /// Presentation view: the score string and category averages carry one decimal.
    pub fn from_result(result: &DiagnosticResult) -> Self {
        let rounded = result.rounded();
        Self {
            success: true,
            overall_score: format!("{:.1}", rounded.overall_score),
            category_scores: CategoryScores::from_result(&rounded),
            message: None,
            company_saved: None,
            company_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LossResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "perdaEstimada")]
    pub estimated_loss: String,
    #[serde(rename = "percentualPerda")]
    pub loss_percentage: String,
}

impl From<&LossEstimate> for LossResponse {
    fn from(estimate: &LossEstimate) -> Self {
        Self {
            success: true,
            estimated_loss: format!("{:.2}", estimate.estimated_loss),
            loss_percentage: format!("{:.3}", estimate.loss_percentage()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyListResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "empresas")]
    pub companies: Vec<StoredCompany>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticListResponse {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "diagnosticos")]
    pub diagnostics: Vec<StoredDiagnostic>,
}
