//! Session Guard
//!
//! Gates every page on a stored bearer token. No token means a login
//! redirect and nothing else happens; a token is attached to every request
//! made through the [`Session`]'s client.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use policy_registry_client::{
    AuthService, ClientError, HttpClient, OpaRegistry, PolicyRegistry, QueryService,
};
use policy_types::{LoginRequest, UserInfo};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};

// =============================================================================
// TOKEN STORAGE
// =============================================================================

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    /// The stored token; blank values count as absent.
    fn load(&self) -> Result<Option<String>>;

    fn store(&self, token: &str) -> Result<()>;

    /// Remove the token. Removing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

/// Token kept in a single file, readable only by the owner on unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token.trim())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let slot = self
            .token
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token store poisoned"))?;
        Ok(slot.clone().filter(|t| !t.trim().is_empty()))
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token store poisoned"))?;
        *slot = Some(token.trim().to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token store poisoned"))?;
        *slot = None;
        Ok(())
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Where to send an unauthenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub login_url: String,
}

/// Authenticated session: a client that carries the token
#[derive(Debug, Clone)]
pub struct Session {
    client: HttpClient,
    user: Option<UserInfo>,
}

impl Session {
    /// Who the probe says we are; `None` when the probe could not be reached
    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn policy_registry(&self) -> Arc<dyn PolicyRegistry> {
        Arc::new(self.client.clone())
    }

    pub fn opa_registry(&self) -> Arc<dyn OpaRegistry> {
        Arc::new(self.client.clone())
    }

    pub fn query_service(&self) -> Arc<dyn QueryService> {
        Arc::new(self.client.clone())
    }
}

#[derive(Debug)]
pub enum SessionOutcome {
    Authenticated(Session),
    /// Terminal: the caller shows the login target and stops
    RedirectToLogin(LoginRedirect),
}

/// Result of the `/users/me` probe
#[derive(Debug)]
pub enum Probe {
    User(UserInfo),
    /// Token rejected (401)
    Rejected,
    /// Probe failed for another reason; the page still loads
    Unavailable(String),
}

/// Ask the auth service who owns the current token.
pub async fn probe_user(auth: &dyn AuthService) -> Probe {
    match auth.current_user().await {
        Ok(user) => Probe::User(user),
        Err(ClientError::Unauthorized) => Probe::Rejected,
        Err(e) => {
            tracing::warn!(error = %e, "error fetching user info");
            Probe::Unavailable(e.to_string())
        }
    }
}

pub struct SessionGuard<S: TokenStore> {
    config: ConsoleConfig,
    store: S,
}

impl SessionGuard<FileTokenStore> {
    /// Guard backed by the configured token file
    pub fn from_config(config: ConsoleConfig) -> Self {
        let store = FileTokenStore::new(config.token_file.clone());
        Self::new(config, store)
    }
}

impl<S: TokenStore> SessionGuard<S> {
    pub fn new(config: ConsoleConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn redirect(&self) -> LoginRedirect {
        LoginRedirect {
            login_url: self.config.login_url.clone(),
        }
    }

    /// Client without credentials, for login
    pub fn anonymous_client(&self) -> Result<HttpClient> {
        Ok(HttpClient::new(&self.config.api_base, self.config.http_timeout)?)
    }

    /// Page entry: read the token, then probe `/users/me`.
    pub async fn enter(&self) -> Result<SessionOutcome> {
        let Some(token) = self.store.load()? else {
            tracing::info!("no stored credential, redirecting to login");
            return Ok(SessionOutcome::RedirectToLogin(self.redirect()));
        };

        let client = self.anonymous_client()?.with_token(token);
        let user = match probe_user(&client).await {
            Probe::User(user) => Some(user),
            Probe::Rejected => {
                tracing::info!("stored credential rejected, redirecting to login");
                return Ok(SessionOutcome::RedirectToLogin(self.redirect()));
            }
            Probe::Unavailable(_) => None,
        };

        Ok(SessionOutcome::Authenticated(Session { client, user }))
    }

    /// Like [`enter`](Self::enter) but a redirect becomes
    /// [`ConsoleError::LoginRequired`].
    pub async fn require(&self) -> Result<Session> {
        match self.enter().await? {
            SessionOutcome::Authenticated(session) => Ok(session),
            SessionOutcome::RedirectToLogin(_) => Err(ConsoleError::LoginRequired),
        }
    }

    /// Exchange credentials for a token and store it.
    pub async fn login(
        &self,
        auth: &dyn AuthService,
        email: &str,
        password: &str,
    ) -> Result<Option<UserInfo>> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ConsoleError::LocalValidation(
                "Email and password are required".to_string(),
            ));
        }

        let response = auth
            .login(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        self.store.store(&response.access_token)?;
        tracing::info!(email = email.trim(), "logged in");
        Ok(response.user)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }
}
