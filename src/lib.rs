//! Policy Console
//!
//! Client-side workflow for a Cerbos/OPA policy registry: an auth-gated
//! session, the policy editing form (create/edit/validate/save/delete), the
//! policy list view, and a SQL query panel that renders results as a table.
//!
//! ## Layers
//!
//! ```text
//! bin/policy_console ──► PolicyConsole ──► PolicyFormController
//!          │                  │        └─► PolicyListPanel ──► listing::render
//!          │                  └────────────► heuristics (display only)
//!          ├──► QueryPanel
//!          ├──► OpaPublisher
//!          └──► SessionGuard ──► TokenStore
//!                     │
//!                     ▼
//!        policy-registry-client (traits + HttpClient)
//! ```
//!
//! Everything authoritative lives in the remote registry. The only local
//! state is the credential token.

pub mod config;
pub mod console;
pub mod error;
pub mod form;
pub mod heuristics;
pub mod listing;
pub mod opa;
pub mod query;
pub mod sequence;
pub mod session;
pub mod templates;

pub use config::ConsoleConfig;
pub use console::{Confirmer, DeleteOutcome, PolicyConsole, PolicyView};
pub use error::{ConsoleError, Result};
pub use form::{EditSession, FormState, PolicyFormController};
pub use listing::{render, PolicyCard, PolicyListPanel, PolicyListView};
pub use opa::OpaPublisher;
pub use query::{route_catalog, QueryOutcome, QueryPanel, TableView};
pub use sequence::{RequestSequencer, RequestTicket};
pub use session::{
    FileTokenStore, LoginRedirect, MemoryTokenStore, Probe, Session, SessionGuard,
    SessionOutcome, TokenStore,
};
