use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::api::{CalculationRequest, DiagnosticService, ServiceSettings};
use crate::backend::{
    AuthenticatedUser, CompanyRecord, CompanyRepository, DiagnosticRecord, DiagnosticRepository,
    GatewayError, IdentityProvider, RecordId, Session, SignUpRequest, StoredCompany,
    StoredDiagnostic, WhitelistDirectory, WhitelistEntry,
};
use crate::diagnostic::{LossPreset, ScoringPreset};

pub(super) const TOKEN: &str = "token-ana";

pub(super) fn user() -> AuthenticatedUser {
    AuthenticatedUser {
        id: "user-ana".to_string(),
        email: Some("ana@empresa.com.br".to_string()),
        name: Some("Ana".to_string()),
    }
}

#[derive(Default)]
pub(super) struct MemoryIdentity {
    sign_ups: Mutex<Vec<SignUpRequest>>,
}

impl MemoryIdentity {
    pub(super) fn sign_ups(&self) -> Vec<SignUpRequest> {
        self.sign_ups.lock().expect("identity mutex poisoned").clone()
    }
}

impl IdentityProvider for MemoryIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, GatewayError> {
        if token == TOKEN {
            Ok(user())
        } else {
            Err(GatewayError::Unauthorized)
        }
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthenticatedUser, GatewayError> {
        if request.email == "ana@empresa.com.br" {
            return Err(GatewayError::Rejected("User already registered".to_string()));
        }
        let mut guard = self.sign_ups.lock().expect("identity mutex poisoned");
        guard.push(request.clone());
        Ok(AuthenticatedUser {
            id: format!("user-{}", guard.len()),
            email: Some(request.email),
            name: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        if email == "ana@empresa.com.br" && password == "segredo" {
            Ok(Session {
                access_token: TOKEN.to_string(),
                user: user(),
            })
        } else {
            Err(GatewayError::Unauthorized)
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryRecords {
    companies: Mutex<Vec<StoredCompany>>,
    diagnostics: Mutex<Vec<StoredDiagnostic>>,
    whitelist: Mutex<HashMap<String, WhitelistEntry>>,
}

impl MemoryRecords {
    pub(super) fn with_whitelisted(email: &str) -> Self {
        let records = Self::default();
        records
            .whitelist
            .lock()
            .expect("whitelist mutex poisoned")
            .insert(
                email.to_string(),
                WhitelistEntry {
                    email: email.to_string(),
                    name: None,
                },
            );
        records
    }

    pub(super) fn companies(&self) -> Vec<StoredCompany> {
        self.companies.lock().expect("company mutex poisoned").clone()
    }

    pub(super) fn diagnostics(&self) -> Vec<StoredDiagnostic> {
        self.diagnostics
            .lock()
            .expect("diagnostic mutex poisoned")
            .clone()
    }
}

impl CompanyRepository for MemoryRecords {
    async fn upsert_company(&self, record: CompanyRecord) -> Result<RecordId, GatewayError> {
        let mut guard = self.companies.lock().expect("company mutex poisoned");
        let id = RecordId(format!("company-{}", guard.len() + 1));
        guard.push(StoredCompany {
            id: id.clone(),
            created_at: Some(record.updated_at),
            record,
        });
        Ok(id)
    }

    async fn companies_for(&self, user_id: &str) -> Result<Vec<StoredCompany>, GatewayError> {
        let guard = self.companies.lock().expect("company mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|company| company.record.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl DiagnosticRepository for MemoryRecords {
    async fn insert_diagnostic(&self, record: DiagnosticRecord) -> Result<(), GatewayError> {
        let mut guard = self.diagnostics.lock().expect("diagnostic mutex poisoned");
        let id = RecordId(format!("diagnostic-{}", guard.len() + 1));
        guard.push(StoredDiagnostic { id, record });
        Ok(())
    }

    async fn diagnostics_for(
        &self,
        user_id: &str,
        company_id: &RecordId,
    ) -> Result<Vec<StoredDiagnostic>, GatewayError> {
        let guard = self.diagnostics.lock().expect("diagnostic mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|row| row.record.user_id == user_id && &row.record.company_id == company_id)
            .cloned()
            .collect())
    }
}

impl WhitelistDirectory for MemoryRecords {
    async fn lookup_whitelist(&self, email: &str) -> Result<Option<WhitelistEntry>, GatewayError> {
        let guard = self.whitelist.lock().expect("whitelist mutex poisoned");
        Ok(guard.get(email).cloned())
    }
}

pub(super) struct UnavailableRecords;

impl CompanyRepository for UnavailableRecords {
    async fn upsert_company(&self, _record: CompanyRecord) -> Result<RecordId, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn companies_for(&self, _user_id: &str) -> Result<Vec<StoredCompany>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }
}

impl DiagnosticRepository for UnavailableRecords {
    async fn insert_diagnostic(&self, _record: DiagnosticRecord) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn diagnostics_for(
        &self,
        _user_id: &str,
        _company_id: &RecordId,
    ) -> Result<Vec<StoredDiagnostic>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }
}

impl WhitelistDirectory for UnavailableRecords {
    async fn lookup_whitelist(&self, _email: &str) -> Result<Option<WhitelistEntry>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn settings() -> ServiceSettings {
    ServiceSettings::from_preset(ScoringPreset::Ranged, LossPreset::Standard.config())
}

pub(super) type MemoryService = DiagnosticService<MemoryIdentity, MemoryRecords>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryIdentity>, Arc<MemoryRecords>) {
    let identity = Arc::new(MemoryIdentity::default());
    let records = Arc::new(MemoryRecords::default());
    let service = DiagnosticService::new(identity.clone(), records.clone(), settings());
    (service, identity, records)
}

/// Questions 0..=9 answered with 10, 10..=19 answered with 5.
pub(super) fn answers() -> Value {
    let mut answers = serde_json::Map::new();
    for index in 0..10 {
        answers.insert(index.to_string(), json!(10));
    }
    for index in 10..20 {
        answers.insert(index.to_string(), json!(5));
    }
    Value::Object(answers)
}

pub(super) fn company() -> Value {
    json!({
        "nomeEmpresa": "Padaria Central",
        "porte": "pequena",
        "setor": "varejo",
        "faturamentoAnual": 480000
    })
}

pub(super) fn calculation_request() -> CalculationRequest {
    CalculationRequest {
        answers: Some(answers()),
        company: Some(company()),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
