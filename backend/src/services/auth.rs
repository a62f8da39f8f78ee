//! Admin authentication as a capability check.
//!
//! The console never compares credentials itself; it asks an
//! [`Authenticator`] and receives either a signed grant or a denial.

use crate::config::Config;
use crate::utils::{
    jwt::{create_access_token, verify_access_token, Claims, ADMIN_ROLE},
    password::{is_phc_hash, verify_password, PasswordError},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Admin login is not configured")]
    NotConfigured,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Proof of a successful login.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    pub access_token: String,
    pub claims: Claims,
}

/// Who a verified token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub username: String,
    pub token_id: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<AdminGrant, AuthError>;

    fn verify(&self, token: &str) -> Result<AdminIdentity, AuthError>;
}

/// Checks the configured admin credential (argon2) and issues HS256 tokens.
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator {
    username: String,
    password_hash: Option<String>,
    jwt_secret: String,
    expiration_hours: u64,
}

impl PasswordAuthenticator {
    pub fn new(
        username: impl Into<String>,
        password_hash: Option<String>,
        jwt_secret: impl Into<String>,
        expiration_hours: u64,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash,
            jwt_secret: jwt_secret.into(),
            expiration_hours,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.admin_password_hash.as_deref() {
            None => tracing::warn!("ADMIN_PASSWORD_HASH is not set; admin logins will be denied"),
            Some(hash) if !is_phc_hash(hash) => {
                tracing::error!("ADMIN_PASSWORD_HASH is not an argon2 PHC string; admin logins will be denied")
            }
            Some(_) => {}
        }
        Self::new(
            config.admin_username.clone(),
            config.admin_password_hash.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration_hours,
        )
    }
}

impl Authenticator for PasswordAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<AdminGrant, AuthError> {
        let hash = self.password_hash.as_deref().ok_or(AuthError::NotConfigured)?;
        // Verify the password even for an unknown username so both paths cost the same.
        let password_ok = verify_password(password, hash).map_err(|err| match err {
            PasswordError::MalformedHash(_) => AuthError::NotConfigured,
            other => AuthError::Internal(other.into()),
        })?;
        if !(password_ok && username == self.username) {
            tracing::warn!(username, "Rejected admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, claims) = create_access_token(
            self.username.clone(),
            ADMIN_ROLE.to_string(),
            &self.jwt_secret,
            self.expiration_hours,
        )?;
        tracing::info!(username, jti = %claims.jti, "Admin signed in");
        Ok(AdminGrant {
            access_token,
            claims,
        })
    }

    fn verify(&self, token: &str) -> Result<AdminIdentity, AuthError> {
        let claims =
            verify_access_token(token, &self.jwt_secret).map_err(|_| AuthError::InvalidToken)?;
        if !claims.is_admin() || claims.sub != self.username {
            return Err(AuthError::InvalidToken);
        }
        Ok(AdminIdentity {
            username: claims.sub,
            token_id: claims.jti,
        })
    }
}
