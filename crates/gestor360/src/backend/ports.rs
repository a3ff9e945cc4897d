use std::future::Future;

use super::records::{
    AuthenticatedUser, CompanyRecord, DiagnosticRecord, RecordId, Session, SignUpRequest,
    StoredCompany, StoredDiagnostic, WhitelistEntry,
};

/// Identity provider verifying bearer tokens and managing password accounts.
pub trait IdentityProvider: Send + Sync {
    fn verify_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AuthenticatedUser, GatewayError>> + Send;

    fn sign_up(
        &self,
        request: SignUpRequest,
    ) -> impl Future<Output = Result<AuthenticatedUser, GatewayError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, GatewayError>> + Send;
}

/// Storage of the companies a user diagnoses.
pub trait CompanyRepository: Send + Sync {
    fn upsert_company(
        &self,
        record: CompanyRecord,
    ) -> impl Future<Output = Result<RecordId, GatewayError>> + Send;

    /// Companies owned by the user, newest first.
    fn companies_for(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<StoredCompany>, GatewayError>> + Send;
}

/// Storage of computed diagnostics.
pub trait DiagnosticRepository: Send + Sync {
    fn insert_diagnostic(
        &self,
        record: DiagnosticRecord,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Diagnostics of one of the user's companies, newest first.
    fn diagnostics_for(
        &self,
        user_id: &str,
        company_id: &RecordId,
    ) -> impl Future<Output = Result<Vec<StoredDiagnostic>, GatewayError>> + Send;
}

/// Closed list of addresses allowed to register.
pub trait WhitelistDirectory: Send + Sync {
    fn lookup_whitelist(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<WhitelistEntry>, GatewayError>> + Send;
}

/// Failure reported by an external identity or storage adapter.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("credentials rejected by identity provider")]
    Unauthorized,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("record not found")]
    NotFound,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected backend response: {0}")]
    Decode(String),
}
