// HS256 session JWTs and bcrypt password checks for the configured user
use crate::application::auth_service::{AuthCredentials, PasswordVerifier, SessionClaims, SessionCodec};
use crate::infrastructure::config::AuthSettings;
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

pub struct JwtSessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtSessionCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `decode`
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl SessionCodec for JwtSessionCodec {
    fn encode(&self, claims: &SessionClaims) -> anyhow::Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .context("Failed to encode session token")
    }

    fn decode(&self, token: &str, now_secs: i64) -> Option<SessionClaims> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation).ok()?;
        let claims = data.claims;
        if claims.exp <= now_secs || claims.sub.is_empty() {
            return None;
        }
        Some(claims)
    }
}

/// A bcrypt hash, given raw (`$2...`) or base64 encoded to survive `$`
/// expansion in env files.
pub struct BcryptPassword {
    hash: String,
}

impl BcryptPassword {
    pub fn from_env_value(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let hash = if raw.starts_with("$2") {
            raw.to_string()
        } else {
            let bytes = STANDARD
                .decode(raw)
                .context("AUTH_PASSWORD_HASH is neither a bcrypt hash nor base64")?;
            String::from_utf8(bytes).context("AUTH_PASSWORD_HASH base64 is not UTF-8")?
        };
        if !hash.starts_with("$2") {
            anyhow::bail!("AUTH_PASSWORD_HASH is not a bcrypt hash");
        }
        Ok(Self { hash })
    }
}

impl PasswordVerifier for BcryptPassword {
    fn verify(&self, password: &str) -> bool {
        match bcrypt::verify(password, &self.hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!("bcrypt verification failed: {}", e);
                false
            }
        }
    }
}

/// Credentials for [`crate::application::auth_service::AuthService`] built
/// from environment settings.
pub fn auth_credentials(settings: AuthSettings) -> anyhow::Result<AuthCredentials> {
    let password = BcryptPassword::from_env_value(&settings.password_hash)?;
    Ok(AuthCredentials {
        username: settings.username,
        password: Arc::new(password),
        sessions: Arc::new(JwtSessionCodec::new(&settings.session_secret)),
    })
}
