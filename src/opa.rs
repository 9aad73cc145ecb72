//! OPA registry workflow: store a Rego draft and publish it in one step.

use std::sync::Arc;

use policy_registry_client::OpaRegistry;
use policy_types::{NewOpaPolicy, OpaPolicy};

use crate::error::{ConsoleError, Result};

pub const DEFAULT_POLICY_NAME: &str = "ui_policy";
pub const DEFAULT_POLICY_PATH: &str = "envoy/authz.rego";

pub struct OpaPublisher {
    registry: Arc<dyn OpaRegistry>,
}

impl OpaPublisher {
    pub fn new(registry: Arc<dyn OpaRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list(&self) -> Result<Vec<OpaPolicy>> {
        Ok(self.registry.list_opa().await?)
    }

    /// Create an unpublished policy, then publish it. Blank name/path fall
    /// back to the defaults. Returns the new policy id.
    pub async fn publish(&self, name: &str, path: &str, rego_text: &str) -> Result<i64> {
        if rego_text.trim().is_empty() {
            return Err(ConsoleError::LocalValidation(
                "Rego policy text is empty".to_string(),
            ));
        }

        let draft = NewOpaPolicy {
            name: or_default(name, DEFAULT_POLICY_NAME),
            path: or_default(path, DEFAULT_POLICY_PATH),
            rego_text: rego_text.to_string(),
            published: false,
        };

        let created = self.registry.create_opa(&draft).await?;
        tracing::info!(id = created.id, path = %draft.path, "OPA draft stored");

        self.registry.publish(created.id).await?;
        tracing::info!(id = created.id, "OPA policy published");
        Ok(created.id)
    }
}

/// Confirmation shown after a publish
pub fn published_message(id: i64) -> String {
    format!("Published policy {}. OPA will pull within ~5s.", id)
}

fn or_default(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
