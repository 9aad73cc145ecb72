//! In-memory registry used by the workflow tests.
//!
//! Records every call in order so tests can assert what reached the
//! registry, and lets a test hold `list`/`execute` responses until it
//! releases them.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use policy_registry_client::{ClientError, OpaRegistry, PolicyRegistry, QueryService, Result};
use policy_types::{
    CreatedPolicyId, NewOpaPolicy, OpaPolicy, PolicyRecord, QueryRequest, QueryResult,
    ValidationResult,
};
use tokio::sync::oneshot;

#[derive(Default)]
pub struct FakeRegistry {
    policies: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<String>>,
    validation: Mutex<Option<ValidationResult>>,
    validate_error: Mutex<Option<(u16, String)>>,
    unauthorized: Mutex<bool>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    query_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    query_results: Mutex<VecDeque<QueryResult>>,
    queries: Mutex<Vec<QueryRequest>>,
    opa: Mutex<Vec<NewOpaPolicy>>,
    published: Mutex<Vec<i64>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(self, path: &str, content: &str) -> Self {
        self.policies
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.policies.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.policies.lock().unwrap().keys().cloned().collect()
    }

    /// Every subsequent validate returns `result`.
    pub fn set_validation(&self, result: ValidationResult) {
        *self.validation.lock().unwrap() = Some(result);
    }

    /// Every subsequent validate fails with an HTTP error.
    pub fn fail_validation(&self, status: u16, body: &str) {
        *self.validate_error.lock().unwrap() = Some((status, body.to_string()));
    }

    /// Every subsequent call fails with 401.
    pub fn expire_session(&self) {
        *self.unauthorized.lock().unwrap() = true;
    }

    /// The next `list` waits until the returned sender fires.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// The next `execute` waits until the returned sender fires.
    pub fn hold_next_query(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.query_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn push_query_result(&self, result: QueryResult) {
        self.query_results.lock().unwrap().push_back(result);
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn opa_drafts(&self) -> Vec<NewOpaPolicy> {
        self.opa.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<i64> {
        self.published.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<()> {
        self.calls.lock().unwrap().push(call.into());
        if *self.unauthorized.lock().unwrap() {
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyRegistry for FakeRegistry {
    async fn list(&self) -> Result<Vec<PolicyRecord>> {
        self.record("list")?;
        let gate = self.list_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .map(|(path, content)| PolicyRecord::new(path.clone(), content.clone()))
            .collect())
    }

    async fn get(&self, path: &str) -> Result<PolicyRecord> {
        self.record(format!("get:{}", path))?;
        self.content(path)
            .map(|content| PolicyRecord::new(path, content))
            .ok_or_else(|| ClientError::NotFound(format!("policy {}", path)))
    }

    async fn create(&self, path: &str, content: &str) -> Result<PolicyRecord> {
        self.record(format!("create:{}", path))?;
        let mut policies = self.policies.lock().unwrap();
        if policies.contains_key(path) {
            return Err(ClientError::Http {
                status: 400,
                body: format!("Policy {} already exists", path),
            });
        }
        policies.insert(path.to_string(), content.to_string());
        Ok(PolicyRecord::new(path, content))
    }

    async fn update(&self, path: &str, content: &str) -> Result<PolicyRecord> {
        self.record(format!("update:{}", path))?;
        let mut policies = self.policies.lock().unwrap();
        match policies.get_mut(path) {
            Some(slot) => {
                *slot = content.to_string();
                Ok(PolicyRecord::new(path, content))
            }
            None => Err(ClientError::NotFound(format!("policy {}", path))),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(format!("delete:{}", path))?;
        self.policies
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("policy {}", path)))
    }

    async fn validate(&self, _content: &str) -> Result<ValidationResult> {
        self.record("validate")?;
        if let Some((status, body)) = self.validate_error.lock().unwrap().clone() {
            return Err(ClientError::Http { status, body });
        }
        Ok(self
            .validation
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(ValidationResult::ok))
    }
}

#[async_trait]
impl QueryService for FakeRegistry {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.record("query")?;
        self.queries.lock().unwrap().push(request.clone());
        let result = self
            .query_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Decode("no scripted query result".to_string()));
        let gate = self.query_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

#[async_trait]
impl OpaRegistry for FakeRegistry {
    async fn list_opa(&self) -> Result<Vec<OpaPolicy>> {
        self.record("opa:list")?;
        let published = self.published();
        Ok(self
            .opa
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, draft)| OpaPolicy {
                id: i as i64 + 1,
                name: draft.name.clone(),
                path: draft.path.clone(),
                version: Some(1),
                published: published.contains(&(i as i64 + 1)),
                bundle_name: None,
                created_at: serde_json::Value::Null,
                created_by: None,
            })
            .collect())
    }

    async fn create_opa(&self, policy: &NewOpaPolicy) -> Result<CreatedPolicyId> {
        self.record("opa:create")?;
        let mut drafts = self.opa.lock().unwrap();
        drafts.push(policy.clone());
        Ok(CreatedPolicyId {
            id: drafts.len() as i64,
        })
    }

    async fn publish(&self, id: i64) -> Result<()> {
        self.record(format!("opa:publish:{}", id))?;
        self.published.lock().unwrap().push(id);
        Ok(())
    }
}
