// Auth service - Single-user password login and stateless session verification
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthError {
    #[error("Auth not configured")]
    NotConfigured,
    #[error("Username and password required")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Failed to issue session")]
    Issue,
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Turns claims into a signed token and back
pub trait SessionCodec: Send + Sync {
    fn encode(&self, claims: &SessionClaims) -> anyhow::Result<String>;

    /// Claims of a correctly signed token that has not expired at `now_secs`.
    fn decode(&self, token: &str, now_secs: i64) -> Option<SessionClaims>;
}

/// Checks a submitted password against the stored one
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str) -> bool;
}

/// The single configured user and the means to authenticate them
#[derive(Clone)]
pub struct AuthCredentials {
    pub username: String,
    pub password: Arc<dyn PasswordVerifier>,
    pub sessions: Arc<dyn SessionCodec>,
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub token: String,
    pub max_age: Duration,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Option<AuthCredentials>,
    ttl: Duration,
}

impl AuthService {
    /// `None` credentials leave auth unconfigured: logins are refused and no
    /// request carries an identity. Sessions expire after `session_ttl`.
    pub fn new(credentials: Option<AuthCredentials>, session_ttl: Duration) -> Self {
        Self {
            credentials,
            ttl: session_ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    /// Check the credentials and issue a session for the configured user.
    /// The username is matched trimmed and case-insensitively.
    pub fn login(&self, username: &str, password: &str, now_secs: i64) -> Result<Session, AuthError> {
        let creds = self.credentials.as_ref().ok_or(AuthError::NotConfigured)?;
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let username_ok = username.trim().to_lowercase() == creds.username.to_lowercase();
        let password_ok = creds.password.verify(password);
        if !(username_ok && password_ok) {
            tracing::info!("Rejected login for {:?}", username.trim());
            return Err(AuthError::InvalidCredentials);
        }

        let claims = SessionClaims {
            sub: creds.username.clone(),
            iat: now_secs,
            exp: now_secs + self.ttl.as_secs() as i64,
        };
        let token = creds.sessions.encode(&claims).map_err(|e| {
            tracing::error!("Failed to sign session: {:#}", e);
            AuthError::Issue
        })?;
        Ok(Session {
            user_id: claims.sub,
            token,
            max_age: self.ttl,
        })
    }

    /// User id carried by a valid session token; never fails loudly.
    pub fn verify(&self, token: &str, now_secs: i64) -> Option<String> {
        let creds = self.credentials.as_ref()?;
        creds.sessions.decode(token, now_secs).map(|c| c.sub)
    }
}
