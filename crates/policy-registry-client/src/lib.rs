//! Policy registry client traits - the sole API boundary between the console
//! and the registry, query and auth services.
//!
//! The console depends on these traits, never on `HttpClient` directly, so
//! workflow code can be driven against an in-memory registry in tests.

pub mod error;
pub mod http;

use async_trait::async_trait;
use policy_types::{
    CreatedPolicyId, LoginRequest, LoginResponse, NewOpaPolicy, OpaPolicy, PolicyRecord,
    QueryRequest, QueryResult, UserInfo, ValidationResult,
};

pub use error::ClientError;
pub use http::HttpClient;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Cerbos policy registry (`/cerbos/policies`).
#[async_trait]
pub trait PolicyRegistry: Send + Sync {
    /// List every policy. An empty registry is not an error.
    async fn list(&self) -> Result<Vec<PolicyRecord>>;

    /// Fetch one policy by path. 404 maps to [`ClientError::NotFound`].
    async fn get(&self, path: &str) -> Result<PolicyRecord>;

    /// Create a policy. Callers reject an empty path before calling.
    async fn create(&self, path: &str, content: &str) -> Result<PolicyRecord>;

    /// Replace the content of an existing policy.
    async fn update(&self, path: &str, content: &str) -> Result<PolicyRecord>;

    /// Remove a policy. Callers obtain explicit confirmation first.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check a document without touching registry state.
    async fn validate(&self, content: &str) -> Result<ValidationResult>;
}

/// OPA-flavored policy registry (`/policies`).
#[async_trait]
pub trait OpaRegistry: Send + Sync {
    async fn list_opa(&self) -> Result<Vec<OpaPolicy>>;

    /// Store a Rego policy as a draft; returns the new id.
    async fn create_opa(&self, policy: &NewOpaPolicy) -> Result<CreatedPolicyId>;

    /// Mark a draft as live. There is no client-side undo.
    async fn publish(&self, id: i64) -> Result<()>;
}

/// SQL query execution (`/query`).
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult>;
}

/// Authentication endpoints.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Auth probe: who does the current token belong to.
    async fn current_user(&self) -> Result<UserInfo>;

    /// Exchange credentials for a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;
}
