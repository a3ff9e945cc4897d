use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity attached to a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Session issued after a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: AuthenticatedUser,
}

/// Credentials and profile captured at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Primary key of a stored row. The store may hand out numeric or UUID keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(id) => Ok(RecordId(id)),
            Value::Number(id) => Ok(RecordId(id.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "record id must be a string or number, found {other}"
            ))),
        }
    }
}

/// Row written to the `empresas` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub user_id: String,
    #[serde(rename = "nome_empresa")]
    pub company_name: Option<String>,
    #[serde(rename = "porte")]
    pub size: Option<String>,
    #[serde(rename = "setor")]
    pub sector: Option<String>,
    #[serde(rename = "faturamento_anual", default)]
    pub annual_revenue: f64,
    #[serde(rename = "dados_completos", default)]
    pub profile: Value,
    pub updated_at: DateTime<Utc>,
}

/// Company row as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCompany {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: CompanyRecord,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row written to the `diagnosticos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub user_id: String,
    #[serde(rename = "empresa_id")]
    pub company_id: RecordId,
    #[serde(rename = "respostas")]
    pub answers: Value,
    #[serde(rename = "pontuacao_total")]
    pub overall_score: f64,
    #[serde(rename = "pontuacoes_categorias")]
    pub category_scores: Value,
    #[serde(rename = "perdas_estimadas", default)]
    pub estimated_losses: f64,
    pub created_at: DateTime<Utc>,
}

/// Diagnostic row as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDiagnostic {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: DiagnosticRecord,
}

/// Pre-authorised address allowed to register during the beta phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub email: String,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
}
