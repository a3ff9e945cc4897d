//! Ports onto the external identity and database service, plus the Supabase adapter.

pub mod ports;
pub mod records;
pub mod supabase;

pub use ports::{
    CompanyRepository, DiagnosticRepository, GatewayError, IdentityProvider, WhitelistDirectory,
};
pub use records::{
    AuthenticatedUser, CompanyRecord, DiagnosticRecord, RecordId, Session, SignUpRequest,
    StoredCompany, StoredDiagnostic, WhitelistEntry,
};
pub use supabase::SupabaseClient;
