//! Starter documents offered by the policy form.
//!
//! These are inserted verbatim; tests compare against them byte for byte.

use policy_types::PolicyKind;

/// Default Cerbos resource policy
pub const RESOURCE_POLICY_TEMPLATE: &str = r#"apiVersion: api.cerbos.dev/v1
resourcePolicy:
  version: "default"
  resource: "postgres"

  rules:
    - actions: ["query"]
      effect: EFFECT_ALLOW
      roles: ["admin", "full_access_user"]

    - actions: ["query"]
      effect: EFFECT_ALLOW
      roles: ["postgres_only_user"]
      condition:
        match:
          expr: |
            !R.attr.body.contains("iceberg.")

    - actions: ["query"]
      effect: EFFECT_DENY
      roles: ["restricted_user"]
      condition:
        match:
          expr: |
            R.attr.body.matches("(?i).*\\b(ssn|SSN|social_security|social_security_number|ssn_number)\\b.*")
"#;

/// Default Cerbos principal policy
pub const PRINCIPAL_POLICY_TEMPLATE: &str = r#"apiVersion: api.cerbos.dev/v1
principalPolicy:
  version: "default"
  principal: "user"

  rules:
    - resource: "*"
      actions: ["*"]
      effect: EFFECT_ALLOW
"#;

/// Default Rego document for the OPA registry
pub const DEFAULT_REGO: &str = r#"package envoy.authz

default allow = {"allowed": false, "headers": {}}

# Example override: allow analysts to query postgres
allow = {"allowed": true, "headers": {"x-authz":"opa-ui"}} {
  input.attributes.request.http.method == "POST"
  startswith(input.parsed_path, ["v1","statement"])
  lower(input.attributes.request.http.headers["x-role"]) == "analyst_eu"
}"#;

pub fn template_for(kind: PolicyKind) -> &'static str {
    match kind {
        PolicyKind::Resource => RESOURCE_POLICY_TEMPLATE,
        PolicyKind::Principal => PRINCIPAL_POLICY_TEMPLATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_declare_their_kind() {
        assert!(template_for(PolicyKind::Resource).contains("resourcePolicy:"));
        assert!(template_for(PolicyKind::Principal).contains("principalPolicy:"));
    }

    #[test]
    fn resource_template_targets_postgres() {
        assert!(RESOURCE_POLICY_TEMPLATE.contains(r#"resource: "postgres""#));
    }

    #[test]
    fn ssn_rule_keeps_escaped_word_boundaries() {
        assert!(RESOURCE_POLICY_TEMPLATE.contains(r#"(?i).*\\b(ssn|SSN"#));
    }
}
