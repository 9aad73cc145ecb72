//! Console configuration
//!
//! Read from environment variables (after loading `.env` if present):
//!   POLICY_API_BASE           registry/query service base URL (default: http://localhost:8000)
//!   POLICY_LOGIN_URL          where unauthenticated users are sent (default: <base>/auth.html)
//!   POLICY_TOKEN_FILE         stored bearer token (default: $HOME/.policy-console/token)
//!   POLICY_HTTP_TIMEOUT_SECS  per-request timeout (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConsoleError, Result};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const LOGIN_PAGE: &str = "auth.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base: String,
    pub login_url: String,
    pub token_file: PathBuf,
    pub http_timeout: Duration,
}

impl ConsoleConfig {
    /// Load from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base = non_empty("POLICY_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let login_url =
            non_empty("POLICY_LOGIN_URL").unwrap_or_else(|| format!("{}/{}", api_base, LOGIN_PAGE));

        let token_file = match non_empty("POLICY_TOKEN_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_token_file(non_empty("HOME")),
        };

        let http_timeout = match non_empty("POLICY_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ConsoleError::Config(format!(
                        "POLICY_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base,
            login_url,
            token_file,
            http_timeout,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }
}

fn default_token_file(home: Option<String>) -> PathBuf {
    let mut path = home.map(PathBuf::from).unwrap_or_default();
    path.push(".policy-console");
    path.push("token");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ConsoleConfig::from_lookup(lookup(&[("HOME", "/home/ops")])).unwrap();
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.login_url, "http://localhost:8000/auth.html");
        assert_eq!(
            config.token_file,
            PathBuf::from("/home/ops/.policy-console/token")
        );
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn explicit_values_win() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            ("POLICY_API_BASE", "https://registry.internal/api/"),
            ("POLICY_LOGIN_URL", "https://sso.internal/login"),
            ("POLICY_TOKEN_FILE", "/tmp/token"),
            ("POLICY_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "https://registry.internal/api");
        assert_eq!(config.login_url, "https://sso.internal/login");
        assert_eq!(config.token_file, PathBuf::from("/tmp/token"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let err = ConsoleConfig::from_lookup(lookup(&[("POLICY_HTTP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = ConsoleConfig::from_lookup(lookup(&[("POLICY_API_BASE", "  ")])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
