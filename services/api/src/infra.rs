use chrono::Utc;
use gestor360::backend::{
    AuthenticatedUser, CompanyRecord, CompanyRepository, DiagnosticRecord, DiagnosticRepository,
    GatewayError, IdentityProvider, RecordId, Session, SignUpRequest, StoredCompany,
    StoredDiagnostic, WhitelistDirectory, WhitelistEntry,
};
use gestor360::diagnostic::{LossPreset, ScoringPreset};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) backend: &'static str,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, GatewayError> {
    mutex
        .lock()
        .map_err(|_| GatewayError::Unavailable(format!("{what} store poisoned")))
}

struct LocalAccount {
    password: String,
    user: AuthenticatedUser,
}

/// Process-local accounts for running without the hosted identity service.
///
/// Sessions live until the process exits.
#[derive(Default)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    sessions: Mutex<HashMap<String, AuthenticatedUser>>,
    sequence: AtomicU64,
}

impl IdentityProvider for InMemoryIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, GatewayError> {
        lock(&self.sessions, "session")?
            .get(token)
            .cloned()
            .ok_or(GatewayError::Unauthorized)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthenticatedUser, GatewayError> {
        let email = request.email.trim().to_ascii_lowercase();
        let mut accounts = lock(&self.accounts, "account")?;
        if accounts.contains_key(&email) {
            return Err(GatewayError::Rejected("User already registered".to_string()));
        }

        let id = format!("local-user-{}", self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let user = AuthenticatedUser {
            id,
            email: Some(email.clone()),
            name: Some(request.name),
        };
        accounts.insert(
            email,
            LocalAccount {
                password: request.password,
                user: user.clone(),
            },
        );
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let email = email.trim().to_ascii_lowercase();
        let user = {
            let accounts = lock(&self.accounts, "account")?;
            match accounts.get(&email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(GatewayError::Unauthorized),
            }
        };

        let access_token = format!(
            "local-{}-{}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            Utc::now().timestamp_millis()
        );
        lock(&self.sessions, "session")?.insert(access_token.clone(), user.clone());
        Ok(Session { access_token, user })
    }
}

/// Company, diagnostic and whitelist tables kept in process memory.
#[derive(Default)]
pub(crate) struct InMemoryRecordStore {
    companies: Mutex<Vec<StoredCompany>>,
    diagnostics: Mutex<Vec<StoredDiagnostic>>,
    whitelist: Mutex<HashMap<String, WhitelistEntry>>,
    sequence: AtomicU64,
}

impl InMemoryRecordStore {
    pub(crate) fn with_whitelist<I>(emails: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let whitelist = emails
            .into_iter()
            .map(|email| {
                let entry = WhitelistEntry {
                    email: email.clone(),
                    name: None,
                };
                (email, entry)
            })
            .collect();
        Self {
            whitelist: Mutex::new(whitelist),
            ..Self::default()
        }
    }

    fn next_id(&self) -> RecordId {
        RecordId((self.sequence.fetch_add(1, Ordering::Relaxed) + 1).to_string())
    }
}

impl CompanyRepository for InMemoryRecordStore {
    /// Rows are merged on `(user_id, nome_empresa)`, keeping their id and creation time.
    async fn upsert_company(&self, record: CompanyRecord) -> Result<RecordId, GatewayError> {
        let mut companies = lock(&self.companies, "company")?;
        let existing = companies.iter_mut().find(|row| {
            row.record.user_id == record.user_id
                && row.record.company_name.is_some()
                && row.record.company_name == record.company_name
        });

        if let Some(row) = existing {
            row.record = record;
            return Ok(row.id.clone());
        }

        let id = self.next_id();
        companies.push(StoredCompany {
            id: id.clone(),
            created_at: Some(record.updated_at),
            record,
        });
        Ok(id)
    }

    async fn companies_for(&self, user_id: &str) -> Result<Vec<StoredCompany>, GatewayError> {
        let companies = lock(&self.companies, "company")?;
        let mut rows: Vec<StoredCompany> = companies
            .iter()
            .rev()
            .filter(|row| row.record.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

impl DiagnosticRepository for InMemoryRecordStore {
    async fn insert_diagnostic(&self, record: DiagnosticRecord) -> Result<(), GatewayError> {
        let id = self.next_id();
        lock(&self.diagnostics, "diagnostic")?.push(StoredDiagnostic { id, record });
        Ok(())
    }

    async fn diagnostics_for(
        &self,
        user_id: &str,
        company_id: &RecordId,
    ) -> Result<Vec<StoredDiagnostic>, GatewayError> {
        let diagnostics = lock(&self.diagnostics, "diagnostic")?;
        Ok(diagnostics
            .iter()
            .rev()
            .filter(|row| row.record.user_id == user_id && &row.record.company_id == company_id)
            .cloned()
            .collect())
    }
}

impl WhitelistDirectory for InMemoryRecordStore {
    async fn lookup_whitelist(&self, email: &str) -> Result<Option<WhitelistEntry>, GatewayError> {
        let email = email.trim().to_ascii_lowercase();
        Ok(lock(&self.whitelist, "whitelist")?.get(&email).cloned())
    }
}

pub(crate) fn parse_scoring_preset(value: &str) -> Result<ScoringPreset, String> {
    ScoringPreset::parse(value).ok_or_else(|| format!("unknown scoring preset '{value}'"))
}

pub(crate) fn parse_loss_preset(value: &str) -> Result<LossPreset, String> {
    LossPreset::parse(value).ok_or_else(|| format!("unknown loss preset '{value}'"))
}
