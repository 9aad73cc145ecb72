//! Policy Form Controller
//!
//! The create/edit workflow for a single Cerbos policy.
//!
//! ```text
//! Closed ──open_create──► CreateDraft ──edit──► Editing ──save──► Validating
//!   ▲                                             ▲   │                 │
//!   │                                             │   └─validate────────┤
//!   │                                 invalid / save error              ▼
//!   └────────────────────── saved ◄───────────── Saving ◄──── valid ────┘
//! ```
//!
//! Save always validates first; a draft the registry rejects never reaches
//! create/update.

use std::sync::Arc;

use policy_registry_client::PolicyRegistry;
use policy_types::{PolicyKind, PolicyRecord, ValidationResult};

use crate::error::{ConsoleError, Result};
use crate::heuristics;
use crate::templates;

pub const EMPTY_PATH_MESSAGE: &str = "Please enter a policy path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Closed,
    /// Fresh template, nothing typed yet
    CreateDraft,
    Editing,
    Validating,
    Saving,
}

/// Client-local state of the open form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// `None` creates a new policy on save, `Some` updates that path
    pub editing_path: Option<String>,
    /// Path field; the create target
    pub path: String,
    pub kind: PolicyKind,
    pub resource_kind: String,
    /// The edited document
    pub draft: String,
}

impl EditSession {
    pub fn is_create(&self) -> bool {
        self.editing_path.is_none()
    }
}

pub struct PolicyFormController {
    registry: Arc<dyn PolicyRegistry>,
    state: FormState,
    session: Option<EditSession>,
    last_validation: Option<ValidationResult>,
    last_error: Option<String>,
}

impl PolicyFormController {
    pub fn new(registry: Arc<dyn PolicyRegistry>) -> Self {
        Self {
            registry,
            state: FormState::Closed,
            session: None,
            last_validation: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != FormState::Closed
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn draft(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.draft.as_str())
    }

    /// Result of the most recent validate call
    pub fn last_validation(&self) -> Option<&ValidationResult> {
        self.last_validation.as_ref()
    }

    /// Error text from the most recent failed save
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn title(&self) -> String {
        match &self.session {
            Some(EditSession {
                editing_path: Some(path),
                ..
            }) => format!("Edit Policy: {}", heuristics::file_name(path)),
            _ => "Create New Policy".to_string(),
        }
    }

    /// Open an empty form with the template for `kind`.
    pub fn open_create(&mut self, kind: PolicyKind) {
        self.session = Some(EditSession {
            editing_path: None,
            path: String::new(),
            kind,
            resource_kind: heuristics::DEFAULT_RESOURCE_KIND.to_string(),
            draft: templates::template_for(kind).to_string(),
        });
        self.clear_feedback();
        self.state = FormState::CreateDraft;
        tracing::info!(%kind, "opened policy form for create");
    }

    /// Load `path` from the registry and open it for update.
    ///
    /// Kind and resource kind are guessed from the content. On error the
    /// form stays as it was.
    pub async fn open_edit(&mut self, path: &str) -> Result<()> {
        let record = self.registry.get(path).await?;
        let (kind, resource_kind) = heuristics::edit_defaults(&record.content);

        self.session = Some(EditSession {
            editing_path: Some(path.to_string()),
            path: path.to_string(),
            kind,
            resource_kind,
            draft: record.content,
        });
        self.clear_feedback();
        self.state = FormState::Editing;
        tracing::info!(path, %kind, "opened policy form for edit");
        Ok(())
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> Result<()> {
        let session = self.session.as_mut().ok_or(ConsoleError::FormClosed)?;
        session.path = path.into();
        Ok(())
    }

    /// Replace the draft with user-edited text.
    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<()> {
        let session = self.session.as_mut().ok_or(ConsoleError::FormClosed)?;
        session.draft = draft.into();
        self.state = FormState::Editing;
        Ok(())
    }

    /// Switch policy kind. The draft is replaced by the new kind's template,
    /// discarding unsaved edits.
    pub fn select_kind(&mut self, kind: PolicyKind) -> Result<()> {
        let session = self.session.as_mut().ok_or(ConsoleError::FormClosed)?;
        if session.draft != templates::template_for(session.kind) {
            tracing::warn!(from = %session.kind, to = %kind, "kind switch discards unsaved draft");
        }
        session.kind = kind;
        session.draft = templates::template_for(kind).to_string();
        Ok(())
    }

    /// Retarget a resource policy at another resource kind by rewriting its
    /// `resource:` field. Does nothing for principal policies.
    pub fn select_resource_kind(&mut self, resource_kind: &str) -> Result<()> {
        let session = self.session.as_mut().ok_or(ConsoleError::FormClosed)?;
        session.resource_kind = resource_kind.to_string();
        if session.kind == PolicyKind::Resource {
            session.draft = heuristics::replace_resource_kind(&session.draft, resource_kind);
        }
        Ok(())
    }

    /// Run the registry validator on the current draft.
    pub async fn validate(&mut self) -> Result<ValidationResult> {
        let draft = self
            .session
            .as_ref()
            .map(|s| s.draft.clone())
            .ok_or(ConsoleError::FormClosed)?;

        let resume = self.state;
        self.state = FormState::Validating;
        let outcome = self.registry.validate(&draft).await;
        self.state = resume;

        let result = outcome?;
        tracing::info!(valid = result.valid, errors = result.errors.len(), "draft validated");
        self.last_validation = Some(result.clone());
        Ok(result)
    }

    /// Validate, then create or update.
    ///
    /// On success the form closes and the saved record is returned. A
    /// rejected draft yields [`ConsoleError::ValidationFailed`] and nothing is
    /// written; any failure leaves the form open in `Editing`.
    pub async fn save(&mut self) -> Result<PolicyRecord> {
        let session = self.session.clone().ok_or(ConsoleError::FormClosed)?;
        if session.path.trim().is_empty() {
            return Err(ConsoleError::LocalValidation(EMPTY_PATH_MESSAGE.to_string()));
        }
        self.last_error = None;

        let validation = match self.validate().await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(e)),
        };
        if !validation.valid {
            self.state = FormState::Editing;
            tracing::info!(path = %session.path, "save blocked by validation errors");
            return Err(ConsoleError::ValidationFailed(validation.errors));
        }

        self.state = FormState::Saving;
        let saved = match &session.editing_path {
            Some(path) => self.registry.update(path, &session.draft).await,
            None => self.registry.create(&session.path, &session.draft).await,
        };

        match saved {
            Ok(record) => {
                tracing::info!(
                    path = %record.path,
                    created = session.is_create(),
                    "policy saved"
                );
                self.close();
                Ok(record)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Close the form and forget the edited path.
    pub fn close(&mut self) {
        self.session = None;
        self.clear_feedback();
        self.state = FormState::Closed;
    }

    /// Back to `Editing`. A 401 is a login redirect, never an inline error.
    fn fail(&mut self, error: ConsoleError) -> ConsoleError {
        self.state = FormState::Editing;
        if error.is_login_required() {
            tracing::info!("session expired during save");
        } else {
            self.last_error = Some(error.to_string());
            tracing::warn!(error = %error, "policy save failed");
        }
        error
    }

    fn clear_feedback(&mut self) {
        self.last_validation = None;
        self.last_error = None;
    }
}
