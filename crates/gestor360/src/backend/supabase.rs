//! Supabase adapter for every backend port.
//!
//! Talks to the hosted project over its REST surface: GoTrue under `/auth/v1` for accounts
//! and tokens, PostgREST under `/rest/v1` for the `empresas`, `diagnosticos` and
//! `whitelist` tables. Requests carry the project's publishable key.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use super::ports::{
    CompanyRepository, DiagnosticRepository, GatewayError, IdentityProvider, WhitelistDirectory,
};
use super::records::{
    AuthenticatedUser, CompanyRecord, DiagnosticRecord, RecordId, Session, SignUpRequest,
    StoredCompany, StoredDiagnostic, WhitelistEntry,
};
use crate::config::SupabaseConfig;

const COMPANIES_TABLE: &str = "empresas";
const DIAGNOSTICS_TABLE: &str = "diagnosticos";
const WHITELIST_TABLE: &str = "whitelist";
const COMPANY_CONFLICT_COLUMNS: &str = "user_id,nome_empresa";

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: &SupabaseConfig) -> Self {
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// PostgREST URL for `table` with `column=eq.value` filters and trailing modifiers.
    fn rest_url(&self, table: &str, filters: &[(&str, &str)], modifiers: &str) -> String {
        let mut url = format!("{}/rest/v1/{}?select=*", self.base_url, table);
        for (column, value) in filters {
            url.push('&');
            url.push_str(column);
            url.push_str("=eq.");
            url.push_str(&encode(value));
        }
        if !modifiers.is_empty() {
            url.push('&');
            url.push_str(modifiers);
        }
        url
    }

    /// Companies merge on the owner and the company name, which needs a unique
    /// constraint on `empresas (user_id, nome_empresa)`.
    fn company_upsert_url(&self) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url,
            COMPANIES_TABLE,
            encode(COMPANY_CONFLICT_COLUMNS)
        )
    }

    fn get(&self, url: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        modifiers: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let url = self.rest_url(table, filters, modifiers);
        let resp = self
            .get(&url, &self.anon_key)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("select {table}: {e}")))?;
        let resp = ensure_success(resp, table).await?;
        decode(resp, table).await
    }
}

impl IdentityProvider for SupabaseClient {
    async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, GatewayError> {
        let resp = self
            .get(&self.auth_url("user"), token)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("verify token: {e}")))?;

        if token_refused(resp.status()) {
            return Err(GatewayError::Unauthorized);
        }
        let resp = ensure_success(resp, "verify token").await?;
        let user: GoTrueUser = decode(resp, "verify token").await?;
        Ok(user.into())
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthenticatedUser, GatewayError> {
        let resp = self
            .post(&self.auth_url("signup"))
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": { "nome": request.name },
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("sign up: {e}")))?;

        let resp = ensure_success(resp, "sign up").await?;
        // With e-mail confirmation on, GoTrue returns the bare user; otherwise a session.
        let body: Value = decode(resp, "sign up").await?;
        let user = body.get("user").cloned().unwrap_or(body);
        let user: GoTrueUser = serde_json::from_value(user)
            .map_err(|e| GatewayError::Decode(format!("sign up: {e}")))?;
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let resp = self
            .post(&self.auth_url("token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("sign in: {e}")))?;

        if credentials_refused(resp.status()) {
            return Err(GatewayError::Unauthorized);
        }
        let resp = ensure_success(resp, "sign in").await?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            user: GoTrueUser,
        }

        let session: TokenResponse = decode(resp, "sign in").await?;
        Ok(Session {
            access_token: session.access_token,
            user: session.user.into(),
        })
    }
}

impl CompanyRepository for SupabaseClient {
    async fn upsert_company(&self, record: CompanyRecord) -> Result<RecordId, GatewayError> {
        let url = self.company_upsert_url();
        let resp = self
            .post(&url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("upsert company: {e}")))?;
        let resp = ensure_success(resp, "upsert company").await?;

        #[derive(Deserialize)]
        struct Inserted {
            id: RecordId,
        }

        let rows: Vec<Inserted> = decode(resp, "upsert company").await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| GatewayError::Decode("upsert company: no row returned".to_string()))
    }

    async fn companies_for(&self, user_id: &str) -> Result<Vec<StoredCompany>, GatewayError> {
        self.select(
            COMPANIES_TABLE,
            &[("user_id", user_id)],
            "order=created_at.desc",
        )
        .await
    }
}

impl DiagnosticRepository for SupabaseClient {
    async fn insert_diagnostic(&self, record: DiagnosticRecord) -> Result<(), GatewayError> {
        let url = format!("{}/rest/v1/{}", self.base_url, DIAGNOSTICS_TABLE);
        let resp = self
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(&record)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("insert diagnostic: {e}")))?;
        ensure_success(resp, "insert diagnostic").await?;
        Ok(())
    }

    async fn diagnostics_for(
        &self,
        user_id: &str,
        company_id: &RecordId,
    ) -> Result<Vec<StoredDiagnostic>, GatewayError> {
        self.select(
            DIAGNOSTICS_TABLE,
            &[("empresa_id", company_id.0.as_str()), ("user_id", user_id)],
            "order=created_at.desc",
        )
        .await
    }
}

impl WhitelistDirectory for SupabaseClient {
    async fn lookup_whitelist(&self, email: &str) -> Result<Option<WhitelistEntry>, GatewayError> {
        let normalized = email.trim().to_ascii_lowercase();
        let rows: Vec<WhitelistEntry> = self
            .select(WHITELIST_TABLE, &[("email", normalized.as_str())], "limit=1")
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<GoTrueUser> for AuthenticatedUser {
    fn from(user: GoTrueUser) -> Self {
        let name = user
            .user_metadata
            .get("nome")
            .and_then(Value::as_str)
            .map(str::to_string);
        AuthenticatedUser {
            id: user.id,
            email: user.email,
            name,
        }
    }
}

async fn ensure_success(resp: Response, context: &str) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(failure(status, &body, context))
}

/// GoTrue answers an expired or forged token with 401 or 403.
fn token_refused(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Any client error on the password grant means the credentials were wrong.
fn credentials_refused(status: StatusCode) -> bool {
    status.is_client_error()
}

/// Client errors carry the provider's message back; everything else is an outage.
fn failure(status: StatusCode, body: &str, context: &str) -> GatewayError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    if status.is_client_error() {
        GatewayError::Rejected(message)
    } else {
        GatewayError::Unavailable(format!("{context}: {message}"))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, context: &str) -> Result<T, GatewayError> {
    resp.json()
        .await
        .map_err(|e| GatewayError::Decode(format!("{context}: {e}")))
}

/// Pull the human-readable message out of a GoTrue or PostgREST error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}
