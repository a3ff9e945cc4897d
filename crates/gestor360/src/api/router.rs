use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};

use super::domain::{
    CalculationRequest, CalculationResponse, CompanyListResponse, DiagnosticListResponse,
    LoginRequest, LoginResponse, LossRequest, LossResponse, RegistrationRequest,
    RegistrationResponse, UserView,
};
use super::service::{DiagnosticService, ServiceError};
use crate::backend::{
    AuthenticatedUser, CompanyRepository, DiagnosticRepository, IdentityProvider, RecordId,
    WhitelistDirectory,
};

/// Router builder exposing the account, calculation and history endpoints.
pub fn diagnostic_router<I, R>(service: Arc<DiagnosticService<I, R>>) -> Router
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    Router::new()
        .route("/api/auth/cadastro", post(register_handler::<I, R>))
        .route("/api/auth/login", post(login_handler::<I, R>))
        .route("/calcular", post(public_calculation_handler::<I, R>))
        .route("/perdas", post(public_loss_handler::<I, R>))
        .route(
            "/api/diagnostico/calcular",
            post(calculation_handler::<I, R>),
        )
        .route("/api/diagnostico/perdas", post(loss_handler::<I, R>))
        .route("/api/empresas", get(companies_handler::<I, R>))
        .route(
            "/api/diagnosticos/:company_id",
            get(diagnostics_handler::<I, R>),
        )
        .with_state(service)
}

async fn authenticated<I, R>(
    service: &DiagnosticService<I, R>,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, ServiceError>
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    service.authenticate(authorization).await
}

/// Unwrap a JSON body, turning extractor rejections into the `{"erro": ...}` envelope.
fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            debug!(
                status = %rejection.status(),
                reason = %rejection.body_text(),
                "rejected request body"
            );
            Err(ServiceError::MalformedBody(rejection.body_text()))
        }
    }
}

pub(crate) async fn register_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.register(request).await {
        Ok(user) => {
            let body = RegistrationResponse {
                success: true,
                message: "Usuário cadastrado com sucesso! Verifique seu email.",
                user: UserView::from_user(&user, ""),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn login_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.login(request).await {
        Ok(session) => {
            let body = LoginResponse {
                success: true,
                message: "Login realizado com sucesso!",
                token: session.access_token,
                user: UserView::from_user(&session.user, "Usuário"),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn public_calculation_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.calculate(&request) {
        Ok(result) => {
            let mut body = CalculationResponse::from_result(&result);
            body.message = Some("Diagnóstico calculado (modo sem login)");
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn public_loss_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    payload: Result<Json<LossRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.estimate_losses(&request) {
        Ok(estimate) => (StatusCode::OK, Json(LossResponse::from(&estimate))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn calculation_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    headers: HeaderMap,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let user = match authenticated(service.as_ref(), &headers).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.calculate_and_record(&user, request).await {
        Ok(recorded) => {
            info!(
                user_id = %user.id,
                saved = recorded.company_id.is_some(),
                "authenticated diagnostic computed"
            );
            let mut body = CalculationResponse::from_result(&recorded.result);
            body.company_saved = Some(recorded.company_id.is_some());
            body.company_id = recorded.company_id;
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn loss_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    headers: HeaderMap,
    payload: Result<Json<LossRequest>, JsonRejection>,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    if let Err(err) = authenticated(service.as_ref(), &headers).await {
        return err.into_response();
    }

    let request = match read_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match service.estimate_losses(&request) {
        Ok(estimate) => (StatusCode::OK, Json(LossResponse::from(&estimate))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn companies_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    headers: HeaderMap,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let user = match authenticated(service.as_ref(), &headers).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match service.companies(&user).await {
        Ok(companies) => {
            let body = CompanyListResponse {
                success: true,
                companies,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn diagnostics_handler<I, R>(
    State(service): State<Arc<DiagnosticService<I, R>>>,
    Path(company_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let user = match authenticated(service.as_ref(), &headers).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match service.diagnostics(&user, &RecordId(company_id)).await {
        Ok(diagnostics) => {
            let body = DiagnosticListResponse {
                success: true,
                diagnostics,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
