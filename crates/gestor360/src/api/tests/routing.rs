use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::{diagnostic_router, DiagnosticService};

fn router() -> (axum::Router, Arc<MemoryRecords>) {
    let (service, _, records) = build_service();
    (diagnostic_router(Arc::new(service)), records)
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn public_calculation_returns_rounded_scores_in_category_order() {
    let (router, records) = router();

    let response = router
        .oneshot(post_json(
            "/calcular",
            json!({ "respostas": answers(), "dadosEmpresa": company() }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["sucesso"], json!(true));
    assert_eq!(body["pontuacaoTotal"], json!("75.0"));
    assert_eq!(body["mensagem"], json!("Diagnóstico calculado (modo sem login)"));
    assert_eq!(
        body["pontuacoesCategorias"]["Tesouraria"],
        json!({ "pontos": 100.0, "questoes": 10, "media": 100.0 })
    );
    assert_eq!(
        body["pontuacoesCategorias"]["Planejamento Tributário"]["questoes"],
        json!(0)
    );
    assert!(body.get("empresaSalva").is_none());
    assert!(records.companies().is_empty(), "public route never persists");
}

#[tokio::test]
async fn public_calculation_rejects_missing_company() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json("/calcular", json!({ "respostas": answers() }), None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(
        body["erro"],
        json!("Respostas e dados da empresa são obrigatórios")
    );
}

#[tokio::test]
async fn public_loss_matches_reference_figures() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/perdas",
            json!({ "pontuacaoTotal": "75.5", "faturamentoAnual": 1000000 }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["perdaEstimada"], json!("36750.00"));
    assert_eq!(body["percentualPerda"], json!("3.675"));
}

#[tokio::test]
async fn loss_out_of_range_is_bad_request() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/perdas",
            json!({ "pontuacaoTotal": 150, "faturamentoAnual": 1000 }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn authenticated_routes_require_a_token() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/diagnostico/calcular",
            json!({ "respostas": answers(), "dadosEmpresa": company() }),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["erro"], json!("Token de autenticação não fornecido"));

    let response = router
        .oneshot(get_with_token("/api/empresas", "stale"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["erro"], json!("Token inválido ou expirado"));
}

#[tokio::test]
async fn authenticated_calculation_reports_saved_company() {
    let (router, records) = router();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/diagnostico/calcular",
            json!({ "respostas": answers(), "dadosEmpresa": company() }),
            Some(TOKEN),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["empresaSalva"], json!(true));
    assert_eq!(body["empresaId"], json!("company-1"));
    assert_eq!(records.diagnostics().len(), 1);

    let response = router
        .oneshot(get_with_token("/api/diagnosticos/company-1", TOKEN))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let diagnostics = body["diagnosticos"].as_array().expect("diagnostic list");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["empresa_id"], json!("company-1"));
    assert_eq!(diagnostics[0]["pontuacao_total"], json!(75.0));
}

#[tokio::test]
async fn authenticated_calculation_survives_storage_outage() {
    let service = DiagnosticService::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(UnavailableRecords),
        settings(),
    );
    let router = diagnostic_router(Arc::new(service));

    let response = router
        .oneshot(post_json(
            "/api/diagnostico/calcular",
            json!({ "respostas": answers(), "dadosEmpresa": company() }),
            Some(TOKEN),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["empresaSalva"], json!(false));
    assert!(body.get("empresaId").is_none());
}

#[tokio::test]
async fn companies_listing_fails_with_server_error_when_store_is_down() {
    let service = DiagnosticService::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(UnavailableRecords),
        settings(),
    );
    let router = diagnostic_router(Arc::new(service));

    let response = router
        .oneshot(get_with_token("/api/empresas", TOKEN))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn login_returns_token_and_user() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ana@empresa.com.br", "senha": "segredo" }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["token"], json!(TOKEN));
    assert_eq!(body["usuario"]["nome"], json!("Ana"));
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ana@empresa.com.br", "senha": "errada" }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["erro"], json!("Email ou senha incorretos"));
}

#[tokio::test]
async fn registration_requires_all_fields() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/auth/cadastro",
            json!({ "email": "bruno@empresa.com.br", "senha": "segredo" }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_echoes_the_new_user() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/auth/cadastro",
            json!({ "email": "bruno@empresa.com.br", "senha": "segredo", "nome": "Bruno" }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["usuario"]["nome"], json!("Bruno"));
    assert_eq!(body["usuario"]["email"], json!("bruno@empresa.com.br"));
}

#[tokio::test]
async fn mistyped_body_gets_the_error_envelope() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": 5, "senha": "x" }),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    let message = body["erro"].as_str().expect("erro message");
    assert!(message.starts_with("Corpo da requisição inválido"), "{message}");
}

#[tokio::test]
async fn unparseable_body_gets_the_error_envelope() {
    let (router, _) = router();

    let response = router
        .oneshot(
            Request::post("/calcular")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"respostas\": "))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json_body(response).await["erro"].is_string());
}

#[tokio::test]
async fn token_is_checked_before_the_body() {
    let (router, _) = router();

    let response = router
        .oneshot(
            Request::post("/api/diagnostico/perdas")
                .body(Body::from("not json"))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
