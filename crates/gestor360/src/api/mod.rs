//! HTTP-facing diagnostic workflow: account endpoints, questionnaire scoring, loss
//! estimation and history, backed by the identity and record ports.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CalculationRequest, CalculationResponse, CategoryScoreView, CategoryScores, CompanyProfile,
    LoginRequest, LossRequest, LossResponse, RegistrationRequest,
};
pub use router::diagnostic_router;
pub use service::{DiagnosticService, RecordedDiagnostic, ServiceError, ServiceSettings};
