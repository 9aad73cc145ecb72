//! Display heuristics over raw policy text.
//!
//! Everything here is a best-effort guess for labelling and form defaults.
//! None of it is schema validation: the registry's validate endpoint is the
//! only authority on whether a document is well formed, and the stored
//! `content` is never rewritten from these values (the one exception is the
//! explicit resource-kind substitution requested by the user in the form).

use std::sync::LazyLock;

use policy_types::{PolicyKind, PolicyRecord};
use regex::{NoExpand, Regex};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"version:\s*"([^"]+)""#).unwrap());

static RESOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"resource:\s*"([^"]+)""#).unwrap());

pub const DEFAULT_VERSION: &str = "default";
pub const DEFAULT_RESOURCE_KIND: &str = "postgres";
pub const UNKNOWN_RESOURCE_KIND: &str = "unknown";

/// Trailing path segment without its `.yaml`/`.yml` suffix.
pub fn display_label(path: &str) -> String {
    let name = file_name(path);
    name.strip_suffix(".yaml")
        .or_else(|| name.strip_suffix(".yml"))
        .unwrap_or(name)
        .to_string()
}

/// Trailing path segment, suffix kept (form titles).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Kind shown on a list card.
///
/// Order: the registry's `type` hint, then "principal" in the path, then
/// "principalPolicy" in the content; anything else is a resource policy.
pub fn card_kind(record: &PolicyRecord) -> PolicyKind {
    if let Some(kind) = record
        .type_hint
        .as_deref()
        .and_then(|hint| hint.parse::<PolicyKind>().ok())
    {
        return kind;
    }
    if record.path.contains("principal") || record.content.contains("principalPolicy") {
        PolicyKind::Principal
    } else {
        PolicyKind::Resource
    }
}

/// Resource kind shown on a list card, guessed from the path alone.
pub fn card_resource_kind(path: &str) -> &'static str {
    if path.contains("iceberg") {
        "iceberg"
    } else if path.contains("postgres") {
        "postgres"
    } else {
        UNKNOWN_RESOURCE_KIND
    }
}

/// First `version: "..."` value, or `"default"`.
pub fn extract_version(content: &str) -> String {
    VERSION_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// Kind declared by the document body, if either marker is present.
pub fn content_kind(content: &str) -> Option<PolicyKind> {
    if content.contains("resourcePolicy") {
        Some(PolicyKind::Resource)
    } else if content.contains("principalPolicy") {
        Some(PolicyKind::Principal)
    } else {
        None
    }
}

/// Heading used by the read-only viewer: Resource, Principal or Unknown.
pub fn content_kind_title(content: &str) -> &'static str {
    content_kind(content).map(|k| k.title()).unwrap_or("Unknown")
}

/// Form defaults when opening an existing policy for edit.
///
/// The kind is principal only when the body says `principalPolicy`; the
/// resource kind is read from `resource: "..."` in resource policies and
/// falls back to postgres.
pub fn edit_defaults(content: &str) -> (PolicyKind, String) {
    let kind = if content.contains("principalPolicy") {
        PolicyKind::Principal
    } else {
        PolicyKind::Resource
    };

    let mut resource_kind = DEFAULT_RESOURCE_KIND.to_string();
    if content.contains("resourcePolicy") {
        if let Some(found) = RESOURCE_RE.captures(content).and_then(|c| c.get(1)) {
            resource_kind = found.as_str().to_string();
        }
    }

    (kind, resource_kind)
}

/// Rewrite the first `resource: "..."` value, leaving everything else intact.
/// Returns the content unchanged when there is no such field.
pub fn replace_resource_kind(content: &str, resource_kind: &str) -> String {
    let replacement = format!("resource: \"{}\"", resource_kind);
    RESOURCE_RE
        .replacen(content, 1, NoExpand(&replacement))
        .into_owned()
}
