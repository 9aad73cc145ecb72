//! Policy list view
//!
//! [`render`] is a pure transform from registry records to display cards.
//! [`PolicyListPanel`] owns the last rendered view and guards refreshes so
//! an older, slower response never overwrites a newer one.

use std::fmt;
use std::sync::{Arc, Mutex};

use policy_registry_client::PolicyRegistry;
use policy_types::{PolicyKind, PolicyRecord};
use serde::Serialize;

use crate::error::Result;
use crate::heuristics;
use crate::sequence::RequestSequencer;

pub const EMPTY_LIST_MESSAGE: &str =
    "No Cerbos policies found. Use \"create\" to add a new policy.";

/// One policy as shown in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyCard {
    pub path: String,
    pub label: String,
    pub kind: PolicyKind,
    pub resource_kind: String,
    pub version: String,
}

impl PolicyCard {
    pub fn from_record(record: &PolicyRecord) -> Self {
        Self {
            path: record.path.clone(),
            label: heuristics::display_label(&record.path),
            kind: heuristics::card_kind(record),
            resource_kind: heuristics::card_resource_kind(&record.path).to_string(),
            version: heuristics::extract_version(&record.content),
        }
    }

    /// "Resource Policy" / "Principal Policy"
    pub fn kind_label(&self) -> String {
        format!("{} Policy", self.kind.title())
    }

    /// Resource kind is only meaningful for resource policies
    pub fn shows_resource(&self) -> bool {
        self.kind == PolicyKind::Resource
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PolicyListView {
    /// No records; carries the message to show in place of the list
    Empty { message: String },
    Cards { heading: String, cards: Vec<PolicyCard> },
}

impl PolicyListView {
    pub fn cards(&self) -> &[PolicyCard] {
        match self {
            PolicyListView::Empty { .. } => &[],
            PolicyListView::Cards { cards, .. } => cards,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PolicyListView::Empty { .. })
    }
}

impl fmt::Display for PolicyListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyListView::Empty { message } => writeln!(f, "{}", message),
            PolicyListView::Cards { heading, cards } => {
                writeln!(f, "{}", heading)?;
                for card in cards {
                    writeln!(f)?;
                    writeln!(f, "{}", card.label)?;
                    writeln!(f, "  Path:     {}", card.path)?;
                    writeln!(f, "  Type:     {}", card.kind_label())?;
                    if card.shows_resource() {
                        writeln!(f, "  Resource: {}", card.resource_kind)?;
                    }
                    writeln!(f, "  Version:  {}", card.version)?;
                }
                Ok(())
            }
        }
    }
}

/// Build the list view. Zero records yield [`PolicyListView::Empty`].
pub fn render(records: &[PolicyRecord]) -> PolicyListView {
    if records.is_empty() {
        return PolicyListView::Empty {
            message: EMPTY_LIST_MESSAGE.to_string(),
        };
    }

    PolicyListView::Cards {
        heading: format!("Current Policies ({} total)", records.len()),
        cards: records.iter().map(PolicyCard::from_record).collect(),
    }
}

/// Holds the most recently applied list view.
pub struct PolicyListPanel {
    registry: Arc<dyn PolicyRegistry>,
    sequencer: RequestSequencer,
    view: Mutex<Option<PolicyListView>>,
}

impl PolicyListPanel {
    pub fn new(registry: Arc<dyn PolicyRegistry>) -> Self {
        Self {
            registry,
            sequencer: RequestSequencer::new(),
            view: Mutex::new(None),
        }
    }

    /// Reload from the registry.
    ///
    /// Returns `Ok(None)` when a newer refresh was started while this one was
    /// in flight; the newer one owns the view.
    pub async fn refresh(&self) -> Result<Option<PolicyListView>> {
        let ticket = self.sequencer.issue();
        let outcome = self.registry.list().await;

        let Some(outcome) = self.sequencer.accept(ticket, outcome) else {
            return Ok(None);
        };

        let view = render(&outcome?);
        tracing::info!(count = view.cards().len(), "policy list refreshed");
        if let Ok(mut slot) = self.view.lock() {
            *slot = Some(view.clone());
        }
        Ok(Some(view))
    }

    /// Last applied view, if any refresh has completed
    pub fn current(&self) -> Option<PolicyListView> {
        self.view.lock().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_renders_explicit_message() {
        let view = render(&[]);
        assert_eq!(
            view,
            PolicyListView::Empty {
                message: EMPTY_LIST_MESSAGE.to_string()
            }
        );
        assert!(view.to_string().contains("No Cerbos policies found"));
    }

    #[test]
    fn iceberg_resource_card() {
        let record = PolicyRecord::new(
            "iceberg/resource.yaml",
            "apiVersion: api.cerbos.dev/v1\nresourcePolicy:\n  version: \"v2\"\n  resource: \"iceberg\"\n",
        );
        let view = render(&[record]);
        let card = &view.cards()[0];

        assert_eq!(card.label, "resource");
        assert_eq!(card.kind.title(), "Resource");
        assert_eq!(card.resource_kind, "iceberg");
        assert_eq!(card.version, "v2");
    }

    #[test]
    fn heading_counts_records() {
        let records = vec![
            PolicyRecord::new("a.yaml", ""),
            PolicyRecord::new("principal/b.yaml", ""),
        ];
        match render(&records) {
            PolicyListView::Cards { heading, cards } => {
                assert_eq!(heading, "Current Policies (2 total)");
                assert_eq!(cards[1].kind, PolicyKind::Principal);
            }
            other => panic!("expected cards, got {:?}", other),
        }
    }

    #[test]
    fn principal_cards_hide_resource_line() {
        let view = render(&[PolicyRecord::new("principal/users.yaml", "principalPolicy:")]);
        let text = view.to_string();
        assert!(text.contains("Type:     Principal Policy"));
        assert!(!text.contains("Resource:"));
    }
}
