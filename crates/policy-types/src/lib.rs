//! Shared API Types for the Policy Registry
//!
//! This crate is the SINGLE SOURCE OF TRUTH for all types crossing the HTTP
//! boundary between the console and the registry/query services.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────────┐
//! │  policy-console  │  JSON   │  Policy registry     │
//! │  (CLI / client)  │ ◄─────► │  + query service     │
//! └──────────────────┘         └──────────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. All wire types live here - no inline struct definitions in callers
//! 2. Optional response fields are `#[serde(default)]` so older servers decode
//! 3. Nothing here interprets policy content; see the console's heuristics

pub mod query;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use query::*;

// ============================================================================
// POLICY KIND
// ============================================================================

/// The two Cerbos policy document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Resource,
    Principal,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Resource => "resource",
            PolicyKind::Principal => "principal",
        }
    }

    /// Capitalised form used in headings ("Resource", "Principal")
    pub fn title(&self) -> &'static str {
        match self {
            PolicyKind::Resource => "Resource",
            PolicyKind::Principal => "Principal",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Ok(PolicyKind::Resource),
            "principal" => Ok(PolicyKind::Principal),
            other => Err(format!(
                "unknown policy kind '{}': expected resource or principal",
                other
            )),
        }
    }
}

// ============================================================================
// CERBOS POLICY API
// ============================================================================

/// A policy document as held by the registry.
///
/// `type_hint` is whatever the list endpoint reported in its `type` field.
/// It is advisory only; kind/resource/version shown to users are derived
/// from `path` and `content` by the console's display heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

impl PolicyRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            type_hint: None,
        }
    }
}

/// Response from `GET /cerbos/policies`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyListResponse {
    #[serde(default)]
    pub policies: Vec<PolicyRecord>,
}

/// Body for `POST /cerbos/policies`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicyRequest {
    pub path: String,
    pub content: String,
}

/// Body for `PUT /cerbos/policies/{path}` and `POST /cerbos/policies/validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContentRequest {
    pub content: String,
}

/// Acknowledgement returned by create/update/delete
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyWriteAck {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reload_required: bool,
}

/// Response from `POST /cerbos/policies/validate`
///
/// The server omits `errors` when the document is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            message: None,
        }
    }

    pub fn invalid<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid: false,
            errors: errors.into_iter().map(Into::into).collect(),
            message: None,
        }
    }
}

// ============================================================================
// OPA POLICY API
// ============================================================================

/// Row from `GET /policies` on the OPA-flavored registry.
///
/// NOTE: timestamps are kept as raw JSON; the server emits naive datetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaPolicy {
    pub id: i64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub bundle_name: Option<String>,
    #[serde(default)]
    pub created_at: serde_json::Value,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Body for `POST /policies`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOpaPolicy {
    pub name: String,
    pub path: String,
    pub rego_text: String,
    pub published: bool,
}

/// Response from `POST /policies`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedPolicyId {
    pub id: i64,
}

// ============================================================================
// AUTH API
// ============================================================================

/// Authenticated user as returned by the auth probe and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Body for `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response from `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// Error body emitted by the backend on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
    /// `detail` as display text; strings are unquoted, anything else is JSON
    pub fn text(&self) -> Option<String> {
        match &self.detail {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_kind_parses_case_insensitively() {
        assert_eq!("Principal".parse::<PolicyKind>(), Ok(PolicyKind::Principal));
        assert_eq!(" resource ".parse::<PolicyKind>(), Ok(PolicyKind::Resource));
        assert!("derived".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn policy_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(PolicyKind::Principal).unwrap(),
            json!("principal")
        );
    }

    #[test]
    fn list_entry_reads_type_hint() {
        let list: PolicyListResponse = serde_json::from_value(json!({
            "policies": [
                {"path": "postgres/resource.yaml", "content": "x", "type": "resource"},
                {"path": "principal.yaml"}
            ]
        }))
        .unwrap();
        assert_eq!(list.policies.len(), 2);
        assert_eq!(list.policies[0].type_hint.as_deref(), Some("resource"));
        assert_eq!(list.policies[1].content, "");
        assert!(list.policies[1].type_hint.is_none());
    }

    #[test]
    fn list_response_tolerates_missing_policies_key() {
        let list: PolicyListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(list.policies.is_empty());
    }

    #[test]
    fn validation_result_without_errors_field() {
        let result: ValidationResult = serde_json::from_value(json!({
            "valid": true,
            "message": "Policy syntax is valid"
        }))
        .unwrap();
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.message.as_deref(), Some("Policy syntax is valid"));
    }

    #[test]
    fn error_detail_text() {
        let d: ErrorDetail = serde_json::from_value(json!({"detail": "Policy not found"})).unwrap();
        assert_eq!(d.text().as_deref(), Some("Policy not found"));

        let d: ErrorDetail = serde_json::from_value(json!({"detail": [{"loc": "body"}]})).unwrap();
        assert_eq!(d.text().as_deref(), Some(r#"[{"loc":"body"}]"#));

        let d: ErrorDetail = serde_json::from_value(json!({})).unwrap();
        assert!(d.text().is_none());
    }
}
