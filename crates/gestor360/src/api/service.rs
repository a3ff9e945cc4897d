use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::domain::{
    CalculationRequest, CategoryScores, CompanyProfile, LoginRequest, LossRequest,
    RegistrationRequest,
};
use crate::backend::{
    AuthenticatedUser, CompanyRecord, CompanyRepository, DiagnosticRecord, DiagnosticRepository,
    GatewayError, IdentityProvider, RecordId, Session, SignUpRequest, StoredCompany,
    StoredDiagnostic, WhitelistDirectory,
};
use crate::diagnostic::{
    estimate_loss_from_json, CategoryDefinition, DiagnosticResult, InvalidInput, LossConfig,
    LossEstimate, ScoreCalculator, ScoringConfig, ScoringPreset,
};

/// Calculator dials and registration policy handed to the service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub preset: ScoringPreset,
    pub scoring: ScoringConfig,
    pub loss: LossConfig,
    pub whitelist_enforced: bool,
}

impl ServiceSettings {
    pub fn from_preset(preset: ScoringPreset, loss: LossConfig) -> Self {
        Self {
            preset,
            scoring: preset.config(),
            loss,
            whitelist_enforced: false,
        }
    }
}

/// Outcome of an authenticated calculation, with the persisted company when it was saved.
#[derive(Debug, Clone)]
pub struct RecordedDiagnostic {
    pub result: DiagnosticResult,
    pub company_id: Option<RecordId>,
}

/// Service composing the identity provider, the record store and the calculators.
pub struct DiagnosticService<I, R> {
    identity: Arc<I>,
    records: Arc<R>,
    calculator: ScoreCalculator,
    categories: Vec<CategoryDefinition>,
    loss: LossConfig,
    whitelist_enforced: bool,
}

impl<I, R> DiagnosticService<I, R>
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    pub fn new(identity: Arc<I>, records: Arc<R>, settings: ServiceSettings) -> Self {
        Self {
            identity,
            records,
            calculator: ScoreCalculator::new(settings.scoring),
            categories: settings.preset.categories(),
            loss: settings.loss,
            whitelist_enforced: settings.whitelist_enforced,
        }
    }

    /// Resolve the caller behind an `Authorization: Bearer ...` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, ServiceError> {
        let token = authorization
            .map(|value| value.trim())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
            .filter(|token| !token.is_empty())
            .ok_or(ServiceError::MissingToken)?;

        match self.identity.verify_token(token).await {
            Ok(user) => Ok(user),
            Err(GatewayError::Unauthorized | GatewayError::Rejected(_)) => {
                Err(ServiceError::InvalidToken)
            }
            Err(err) => {
                error!(error = %err, "token verification failed");
                Err(ServiceError::Gateway(err))
            }
        }
    }

    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<AuthenticatedUser, ServiceError> {
        let (Some(email), Some(password), Some(name)) = (
            non_blank(request.email),
            non_blank(request.password),
            non_blank(request.name),
        ) else {
            return Err(ServiceError::MissingField(
                "Email, senha e nome são obrigatórios",
            ));
        };

        if self.whitelist_enforced {
            let entry = self.records.lookup_whitelist(&email).await.map_err(|err| {
                error!(error = %err, "whitelist lookup failed");
                ServiceError::Gateway(err)
            })?;
            if entry.is_none() {
                info!(%email, "registration refused: address not whitelisted");
                return Err(ServiceError::NotWhitelisted);
            }
        }

        let user = self
            .identity
            .sign_up(SignUpRequest {
                email,
                password,
                name: name.clone(),
            })
            .await
            .map_err(|err| match err {
                GatewayError::Rejected(message) => ServiceError::Registration(message),
                other => {
                    error!(error = %other, "sign-up failed");
                    ServiceError::Gateway(other)
                }
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(AuthenticatedUser {
            name: user.name.or(Some(name)),
            ..user
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, ServiceError> {
        let (Some(email), Some(password)) =
            (non_blank(request.email), non_blank(request.password))
        else {
            return Err(ServiceError::MissingField("Email e senha são obrigatórios"));
        };

        self.identity
            .sign_in(&email, &password)
            .await
            .map_err(|err| match err {
                GatewayError::Unauthorized | GatewayError::Rejected(_) => {
                    ServiceError::InvalidCredentials
                }
                other => {
                    error!(error = %other, "sign-in failed");
                    ServiceError::Gateway(other)
                }
            })
    }

    /// Score a submission without persisting anything.
    pub fn calculate(&self, request: &CalculationRequest) -> Result<DiagnosticResult, ServiceError> {
        let (Some(answers), Some(_)) = (present(&request.answers), present(&request.company))
        else {
            return Err(ServiceError::MissingField(
                "Respostas e dados da empresa são obrigatórios",
            ));
        };

        let result = self.calculator.compute_from_json(answers, &self.categories)?;
        debug!(
            overall_score = result.overall_score,
            answered = result.answered_count,
            "diagnostic computed"
        );
        Ok(result)
    }

    /// Score a submission, then store the company and the diagnostic for the user.
    ///
    /// Storage failures are logged and reported through `company_id`, never as errors.
    pub async fn calculate_and_record(
        &self,
        user: &AuthenticatedUser,
        request: CalculationRequest,
    ) -> Result<RecordedDiagnostic, ServiceError> {
        let result = self.calculate(&request)?;
        let company = request.company.unwrap_or(Value::Null);
        let answers = request.answers.unwrap_or(Value::Null);
        let profile = CompanyProfile::from_json(&company);
        let now = Utc::now();

        let company_id = match self
            .records
            .upsert_company(CompanyRecord {
                user_id: user.id.clone(),
                company_name: profile.name,
                size: profile.size,
                sector: profile.sector,
                annual_revenue: profile.annual_revenue,
                profile: company,
                updated_at: now,
            })
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                error!(user_id = %user.id, error = %err, "failed to save company");
                None
            }
        };

        if let Some(company_id) = &company_id {
            let category_scores = serde_json::to_value(CategoryScores::from_result(&result))
                .unwrap_or(Value::Null);
            let record = DiagnosticRecord {
                user_id: user.id.clone(),
                company_id: company_id.clone(),
                answers,
                overall_score: result.overall_score,
                category_scores,
                estimated_losses: 0.0,
                created_at: now,
            };
            if let Err(err) = self.records.insert_diagnostic(record).await {
                error!(user_id = %user.id, %company_id, error = %err, "failed to save diagnostic");
            }
        }

        Ok(RecordedDiagnostic { result, company_id })
    }

    pub fn estimate_losses(&self, request: &LossRequest) -> Result<LossEstimate, ServiceError> {
        let overall_score = present(&request.overall_score);
        let annual_revenue = present(&request.annual_revenue);
        if overall_score.is_none() || annual_revenue.is_none() {
            return Err(ServiceError::MissingField(
                "Pontuação e faturamento são obrigatórios",
            ));
        }

        estimate_loss_from_json(overall_score, annual_revenue, &self.loss)
            .map_err(ServiceError::from)
    }

    pub async fn companies(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Vec<StoredCompany>, ServiceError> {
        self.records.companies_for(&user.id).await.map_err(|err| {
            warn!(user_id = %user.id, error = %err, "failed to list companies");
            ServiceError::Listing("Erro ao buscar empresas")
        })
    }

    pub async fn diagnostics(
        &self,
        user: &AuthenticatedUser,
        company_id: &RecordId,
    ) -> Result<Vec<StoredDiagnostic>, ServiceError> {
        self.records
            .diagnostics_for(&user.id, company_id)
            .await
            .map_err(|err| {
                warn!(user_id = %user.id, %company_id, error = %err, "failed to list diagnostics");
                ServiceError::Listing("Erro ao buscar diagnósticos")
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|value| !value.is_null())
}

/// Error raised by the diagnostic service. Messages are shown to end users as-is.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    MissingField(&'static str),
    #[error("Dados inválidos: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("Corpo da requisição inválido: {0}")]
    MalformedBody(String),
    #[error("Token de autenticação não fornecido")]
    MissingToken,
    #[error("Token inválido ou expirado")]
    InvalidToken,
    #[error("Email não autorizado para cadastro")]
    NotWhitelisted,
    #[error("{0}")]
    Registration(String),
    #[error("Email ou senha incorretos")]
    InvalidCredentials,
    #[error("{0}")]
    Listing(&'static str),
    #[error("Erro ao comunicar com o serviço de dados")]
    Gateway(#[source] GatewayError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingField(_)
            | ServiceError::InvalidInput(_)
            | ServiceError::MalformedBody(_)
            | ServiceError::Registration(_) => StatusCode::BAD_REQUEST,
            ServiceError::MissingToken
            | ServiceError::InvalidToken
            | ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::NotWhitelisted => StatusCode::FORBIDDEN,
            ServiceError::Listing(_) | ServiceError::Gateway(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "erro": self.to_string() }));
        (self.status(), body).into_response()
    }
}
