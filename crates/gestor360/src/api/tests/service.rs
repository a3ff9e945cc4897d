use super::common::*;
use serde_json::json;
use std::sync::Arc;

use crate::api::{
    CalculationRequest, DiagnosticService, LoginRequest, LossRequest, RegistrationRequest,
    ServiceError, ServiceSettings,
};
use crate::backend::RecordId;
use crate::diagnostic::{InvalidInput, LossPreset, ScoringPreset};

#[tokio::test]
async fn authenticate_requires_a_bearer_token() {
    let (service, _, _) = build_service();

    assert!(matches!(
        service.authenticate(None).await,
        Err(ServiceError::MissingToken)
    ));
    assert!(matches!(
        service.authenticate(Some("Bearer   ")).await,
        Err(ServiceError::MissingToken)
    ));
    assert!(matches!(
        service.authenticate(Some("Bearer other")).await,
        Err(ServiceError::InvalidToken)
    ));

    let user = service
        .authenticate(Some(&format!("Bearer {TOKEN}")))
        .await
        .expect("token accepted");
    assert_eq!(user.id, "user-ana");
}

#[tokio::test]
async fn calculate_requires_answers_and_company() {
    let (service, _, _) = build_service();
    let request = CalculationRequest {
        answers: Some(answers()),
        company: None,
    };

    match service.calculate(&request) {
        Err(ServiceError::MissingField(message)) => {
            assert_eq!(message, "Respostas e dados da empresa são obrigatórios")
        }
        other => panic!("expected missing field, got {other:?}"),
    }
}

#[tokio::test]
async fn calculate_rejects_unkeyed_answers() {
    let (service, _, _) = build_service();
    let request = CalculationRequest {
        answers: Some(json!("todas certas")),
        company: Some(company()),
    };

    assert!(matches!(
        service.calculate(&request),
        Err(ServiceError::InvalidInput(InvalidInput::AnswersNotKeyed { .. }))
    ));
}

#[tokio::test]
async fn calculate_scores_by_question() {
    let (service, _, _) = build_service();
    let result = service
        .calculate(&calculation_request())
        .expect("diagnostic computed");

    assert_eq!(result.answered_count, 20);
    assert_eq!(result.overall_score, 75.0);
    assert_eq!(result.per_category[0].average, 100.0);
    assert_eq!(result.per_category[1].average, 50.0);
    assert_eq!(result.per_category[2].answered_count, 0);
}

#[tokio::test]
async fn calculate_and_record_persists_company_and_diagnostic() {
    let (service, _, records) = build_service();

    let recorded = service
        .calculate_and_record(&user(), calculation_request())
        .await
        .expect("diagnostic recorded");

    assert_eq!(recorded.company_id, Some(RecordId("company-1".to_string())));

    let companies = records.companies();
    assert_eq!(companies.len(), 1);
    assert_eq!(
        companies[0].record.company_name.as_deref(),
        Some("Padaria Central")
    );
    assert_eq!(companies[0].record.annual_revenue, 480000.0);
    assert_eq!(companies[0].record.profile, company());

    let diagnostics = records.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let stored = &diagnostics[0].record;
    assert_eq!(stored.user_id, "user-ana");
    assert_eq!(stored.overall_score, 75.0);
    assert_eq!(stored.estimated_losses, 0.0);
    assert_eq!(stored.answers, answers());
    assert_eq!(stored.category_scores["Tesouraria"]["questoes"], json!(10));
}

#[tokio::test]
async fn storage_failures_do_not_fail_the_calculation() {
    let service = DiagnosticService::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(UnavailableRecords),
        settings(),
    );

    let recorded = service
        .calculate_and_record(&user(), calculation_request())
        .await
        .expect("score still returned");

    assert!(recorded.company_id.is_none());
    assert_eq!(recorded.result.overall_score, 75.0);
}

#[tokio::test]
async fn estimate_losses_reports_missing_operands() {
    let (service, _, _) = build_service();
    let request = LossRequest {
        overall_score: Some(json!(75.5)),
        annual_revenue: None,
    };

    assert!(matches!(
        service.estimate_losses(&request),
        Err(ServiceError::MissingField(_))
    ));
}

#[tokio::test]
async fn estimate_losses_accepts_the_score_string_returned_by_calculation() {
    let (service, _, _) = build_service();
    let request = LossRequest {
        overall_score: Some(json!("75.5")),
        annual_revenue: Some(json!("1000000")),
    };

    let estimate = service.estimate_losses(&request).expect("estimate computed");
    assert!((estimate.estimated_loss - 36_750.0).abs() < 1e-6);
}

#[tokio::test]
async fn estimate_losses_rejects_out_of_range_scores() {
    let (service, _, _) = build_service();
    let request = LossRequest {
        overall_score: Some(json!(150)),
        annual_revenue: Some(json!(1000)),
    };

    assert!(matches!(
        service.estimate_losses(&request),
        Err(ServiceError::InvalidInput(InvalidInput::ScoreOutOfRange { .. }))
    ));
}

#[tokio::test]
async fn extended_loss_preset_applies_twenty_percent() {
    let settings = ServiceSettings::from_preset(ScoringPreset::Ranged, LossPreset::Extended.config());
    let service = DiagnosticService::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(MemoryRecords::default()),
        settings,
    );
    let request = LossRequest {
        overall_score: Some(json!(0)),
        annual_revenue: Some(json!(1000)),
    };

    let estimate = service.estimate_losses(&request).expect("estimate computed");
    assert!((estimate.estimated_loss - 200.0).abs() < 1e-9);
}

#[tokio::test]
async fn register_passes_profile_to_identity_provider() {
    let (service, identity, _) = build_service();

    let user = service
        .register(RegistrationRequest {
            email: Some("bruno@empresa.com.br".to_string()),
            password: Some("segredo".to_string()),
            name: Some("Bruno".to_string()),
        })
        .await
        .expect("registration succeeds");

    assert_eq!(user.name.as_deref(), Some("Bruno"));
    let sign_ups = identity.sign_ups();
    assert_eq!(sign_ups.len(), 1);
    assert_eq!(sign_ups[0].name, "Bruno");
}

#[tokio::test]
async fn register_surfaces_provider_rejections() {
    let (service, _, _) = build_service();

    match service
        .register(RegistrationRequest {
            email: Some("ana@empresa.com.br".to_string()),
            password: Some("segredo".to_string()),
            name: Some("Ana".to_string()),
        })
        .await
    {
        Err(ServiceError::Registration(message)) => {
            assert_eq!(message, "User already registered")
        }
        other => panic!("expected registration rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn register_enforces_whitelist_when_enabled() {
    let mut settings = settings();
    settings.whitelist_enforced = true;
    let identity = Arc::new(MemoryIdentity::default());
    let service = DiagnosticService::new(
        identity.clone(),
        Arc::new(MemoryRecords::with_whitelisted("carla@empresa.com.br")),
        settings,
    );

    let refused = service
        .register(RegistrationRequest {
            email: Some("bruno@empresa.com.br".to_string()),
            password: Some("segredo".to_string()),
            name: Some("Bruno".to_string()),
        })
        .await;
    assert!(matches!(refused, Err(ServiceError::NotWhitelisted)));
    assert!(identity.sign_ups().is_empty());

    service
        .register(RegistrationRequest {
            email: Some("carla@empresa.com.br".to_string()),
            password: Some("segredo".to_string()),
            name: Some("Carla".to_string()),
        })
        .await
        .expect("whitelisted address registers");
}

#[tokio::test]
async fn login_maps_bad_credentials() {
    let (service, _, _) = build_service();

    let refused = service
        .login(LoginRequest {
            email: Some("ana@empresa.com.br".to_string()),
            password: Some("errada".to_string()),
        })
        .await;
    assert!(matches!(refused, Err(ServiceError::InvalidCredentials)));

    let session = service
        .login(LoginRequest {
            email: Some("ana@empresa.com.br".to_string()),
            password: Some("segredo".to_string()),
        })
        .await
        .expect("login succeeds");
    assert_eq!(session.access_token, TOKEN);
}

#[tokio::test]
async fn listings_are_scoped_to_the_user_and_company() {
    let (service, _, _) = build_service();
    service
        .calculate_and_record(&user(), calculation_request())
        .await
        .expect("first diagnostic");
    service
        .calculate_and_record(&user(), calculation_request())
        .await
        .expect("second diagnostic");

    let companies = service.companies(&user()).await.expect("companies listed");
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0].id, RecordId("company-2".to_string()));

    let diagnostics = service
        .diagnostics(&user(), &RecordId("company-1".to_string()))
        .await
        .expect("diagnostics listed");
    assert_eq!(diagnostics.len(), 1);
}

#[tokio::test]
async fn listing_failures_map_to_listing_errors() {
    let service = DiagnosticService::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(UnavailableRecords),
        settings(),
    );

    match service.companies(&user()).await {
        Err(ServiceError::Listing(message)) => assert_eq!(message, "Erro ao buscar empresas"),
        other => panic!("expected listing error, got {other:?}"),
    }
}
