//! PolicyConsole - the policy page: list, viewer, form and delete flow.

use std::sync::Arc;

use policy_registry_client::PolicyRegistry;
use policy_types::PolicyRecord;
use serde::Serialize;

use crate::error::Result;
use crate::form::PolicyFormController;
use crate::heuristics;
use crate::listing::{PolicyListPanel, PolicyListView};

/// Asks the user to confirm a destructive action.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// User declined; the registry was not called
    Cancelled,
}

/// Read-only rendering of one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyView {
    pub path: String,
    pub title: String,
    /// "Resource", "Principal" or "Unknown"
    pub kind: String,
    pub content: String,
}

pub struct PolicyConsole {
    registry: Arc<dyn PolicyRegistry>,
    list: PolicyListPanel,
    form: PolicyFormController,
}

impl PolicyConsole {
    pub fn new(registry: Arc<dyn PolicyRegistry>) -> Self {
        Self {
            list: PolicyListPanel::new(registry.clone()),
            form: PolicyFormController::new(registry.clone()),
            registry,
        }
    }

    pub fn form(&self) -> &PolicyFormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PolicyFormController {
        &mut self.form
    }

    pub fn list(&self) -> &PolicyListPanel {
        &self.list
    }

    pub async fn refresh(&self) -> Result<Option<PolicyListView>> {
        self.list.refresh().await
    }

    pub async fn view(&self, path: &str) -> Result<PolicyView> {
        let record = self.registry.get(path).await?;
        Ok(PolicyView {
            title: format!("View Policy: {}", heuristics::file_name(path)),
            kind: heuristics::content_kind_title(&record.content).to_string(),
            path: record.path,
            content: record.content,
        })
    }

    /// Save the open form, then reload the list.
    ///
    /// A failed reload after a successful save is logged, not returned: the
    /// policy was written.
    pub async fn save(&mut self) -> Result<PolicyRecord> {
        let record = self.form.save().await?;
        self.refresh_after_write().await?;
        Ok(record)
    }

    /// Delete `path` after explicit confirmation, then reload the list.
    pub async fn delete(&self, path: &str, confirmer: &dyn Confirmer) -> Result<DeleteOutcome> {
        let prompt = format!("Are you sure you want to delete the policy \"{}\"?", path);
        if !confirmer.confirm(&prompt) {
            tracing::info!(path, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.registry.delete(path).await?;
        tracing::info!(path, "policy deleted");
        self.refresh_after_write().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn refresh_after_write(&self) -> Result<()> {
        match self.list.refresh().await {
            Ok(_) => Ok(()),
            Err(e) if e.is_login_required() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "policy list refresh failed");
                Ok(())
            }
        }
    }
}
