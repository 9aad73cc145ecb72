//! HttpClient - reqwest implementation of the registry, query and auth traits.
//!
//! Every request carries `Authorization: Bearer <token>` once a token has been
//! attached with [`HttpClient::with_token`]. A 401 from any endpoint other
//! than login surfaces as [`ClientError::Unauthorized`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use policy_types::{
    CreatePolicyRequest, CreatedPolicyId, ErrorDetail, LoginRequest, LoginResponse, NewOpaPolicy,
    OpaPolicy, PolicyContentRequest, PolicyListResponse, PolicyRecord, PolicyWriteAck,
    QueryRequest, QueryResult, UserInfo, ValidationResult,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{AuthService, ClientError, OpaRegistry, PolicyRegistry, QueryService, Result};

const CERBOS_PREFIX: &str = "cerbos";

#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidInput(format!("base url '{}': {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidInput(format!(
                "base url '{}' cannot carry a path",
                base_url
            )));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: parsed,
            token: None,
        })
    }

    /// Attach the bearer credential sent with every subsequent call
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `base/<seg>/<seg>...`. Each segment is percent-encoded on its
    /// own, so a policy path like `iceberg/resource.yaml` stays one segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidInput(format!(
                    "base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "dispatching request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = builder.send().await?;
        let response = check_status(response, what).await?;
        decode(response, what).await
    }
}

/// Map non-2xx responses onto the error taxonomy.
async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(what.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(format!("{}: {}", what, e)))
}

/// `detail` from a JSON error body, else the status reason phrase
async fn error_detail(response: Response) -> ClientError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("").to_string();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .ok()
        .and_then(|d| d.text());

    ClientError::Http {
        status: status.as_u16(),
        body: detail.unwrap_or(reason),
    }
}

// ============================================================================
// Cerbos registry
// ============================================================================

#[async_trait]
impl PolicyRegistry for HttpClient {
    async fn list(&self) -> Result<Vec<PolicyRecord>> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies"])?;
        let list: PolicyListResponse = self
            .send(self.request(Method::GET, url), "policy list")
            .await?;
        Ok(list.policies)
    }

    async fn get(&self, path: &str) -> Result<PolicyRecord> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies", path])?;
        self.send(self.request(Method::GET, url), path).await
    }

    async fn create(&self, path: &str, content: &str) -> Result<PolicyRecord> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies"])?;
        let body = CreatePolicyRequest {
            path: path.to_string(),
            content: content.to_string(),
        };
        let ack: PolicyWriteAck = self
            .send(self.request(Method::POST, url).json(&body), path)
            .await?;
        tracing::debug!(path, reload_required = ack.reload_required, "policy created");
        Ok(PolicyRecord::new(ack.path.unwrap_or(body.path), body.content))
    }

    async fn update(&self, path: &str, content: &str) -> Result<PolicyRecord> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies", path])?;
        let body = PolicyContentRequest {
            content: content.to_string(),
        };
        let ack: PolicyWriteAck = self
            .send(self.request(Method::PUT, url).json(&body), path)
            .await?;
        tracing::debug!(path, reload_required = ack.reload_required, "policy updated");
        Ok(PolicyRecord::new(
            ack.path.unwrap_or_else(|| path.to_string()),
            body.content,
        ))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies", path])?;
        let ack: PolicyWriteAck = self.send(self.request(Method::DELETE, url), path).await?;
        tracing::debug!(path, message = ?ack.message, "policy deleted");
        Ok(())
    }

    async fn validate(&self, content: &str) -> Result<ValidationResult> {
        let url = self.endpoint(&[CERBOS_PREFIX, "policies", "validate"])?;
        let body = PolicyContentRequest {
            content: content.to_string(),
        };
        self.send(self.request(Method::POST, url).json(&body), "validation")
            .await
    }
}

// ============================================================================
// OPA registry
// ============================================================================

#[async_trait]
impl OpaRegistry for HttpClient {
    async fn list_opa(&self) -> Result<Vec<OpaPolicy>> {
        let url = self.endpoint(&["policies"])?;
        self.send(self.request(Method::GET, url), "OPA policy list")
            .await
    }

    async fn create_opa(&self, policy: &NewOpaPolicy) -> Result<CreatedPolicyId> {
        let url = self.endpoint(&["policies"])?;
        self.send(self.request(Method::POST, url).json(policy), &policy.path)
            .await
    }

    async fn publish(&self, id: i64) -> Result<()> {
        let id = id.to_string();
        let url = self.endpoint(&["policies", &id, "publish"])?;
        let _: serde_json::Value = self
            .send(self.request(Method::POST, url), &format!("policy {}", id))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Query service
// ============================================================================

#[async_trait]
impl QueryService for HttpClient {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        let url = self.endpoint(&["query"])?;
        let response = self
            .request(Method::POST, url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            return Err(error_detail(response).await);
        }
        decode(response, "query result").await
    }
}

// ============================================================================
// Auth
// ============================================================================

#[async_trait]
impl AuthService for HttpClient {
    async fn current_user(&self) -> Result<UserInfo> {
        let url = self.endpoint(&["users", "me"])?;
        self.send(self.request(Method::GET, url), "current user")
            .await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let url = self.endpoint(&["auth", "login"])?;
        let response = self.http.post(url).json(request).send().await?;

        // Bad credentials are a 401 here, which is a form error, not a
        // session expiry.
        if !response.status().is_success() {
            return Err(error_detail(response).await);
        }
        decode(response, "login").await
    }
}
