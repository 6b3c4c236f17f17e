/// Authentication Service
///
/// Drives registration, login, refresh, logout and password recovery on top
/// of the token codec, the password hasher, the revocation store and the
/// user directory. Which flow a token may drive is decided by its `type`
/// claim.
///
/// Refresh tokens are not rotated on use: a refresh token stays valid until
/// it is logged out or expires.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::revocation::RevocationStore;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::users::{NewUser, Role, User, UserChanges, UserDirectory};
use crate::validators::{is_valid_email, is_valid_name, is_valid_password, is_valid_phone};

/// Token lifetimes used when issuing
#[derive(Clone, Copy, Debug)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
    pub recovery: Duration,
}

impl From<&JwtSettings> for TokenLifetimes {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            access: settings.access_ttl(),
            refresh: settings.refresh_ttl(),
            recovery: settings.recovery_ttl(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration input as received from the client
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    revoked: Arc<dyn RevocationStore>,
    passwords: PasswordHasher,
    tokens: TokenCodec,
    lifetimes: TokenLifetimes,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        revoked: Arc<dyn RevocationStore>,
        passwords: PasswordHasher,
        tokens: TokenCodec,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            revoked,
            passwords,
            tokens,
            lifetimes,
        }
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Create a `user` account and log it in
    ///
    /// # Errors
    /// - Validation errors for malformed fields
    /// - `DuplicateUser` when the email or phone number is registered
    pub async fn register(&self, registration: Registration) -> Result<TokenPair, AppError> {
        let email = is_valid_email(&registration.email)?;
        let phone_number = is_valid_phone(&registration.phone_number)?;
        let first_name = is_valid_name("first_name", registration.first_name.as_deref())?;
        let last_name = is_valid_name("last_name", registration.last_name.as_deref())?;
        is_valid_password(&registration.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateUser("email".to_string()).into());
        }
        if self.users.find_by_phone(&phone_number).await?.is_some() {
            return Err(AuthError::DuplicateUser("phone number".to_string()).into());
        }

        let user = self
            .users
            .create(NewUser {
                email,
                phone_number,
                first_name,
                last_name,
                password_hash: self.passwords.hash(&registration.password)?,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");

        self.authenticate(&user.email, &registration.password).await
    }

    /// Check an email/password pair and issue an access + refresh token
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.issue_pair(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(pair)
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.tokens.issue(&Claims::access(user), self.lifetimes.access)?,
            refresh_token: self.tokens.issue(&Claims::refresh(user), self.lifetimes.refresh)?,
        })
    }

    /// Issue a new access token for the identity behind a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.tokens.parse(refresh_token)?;
        claims.expect_kind(TokenKind::Refresh)?;

        let jti = claims.token_id()?;
        if self.revoked.is_revoked(jti).await? {
            tracing::warn!(jti = %jti, "Attempt to use revoked refresh token");
            return Err(AuthError::TokenRevoked.into());
        }

        let email = claims.subject()?;
        let user = self.users.find_by_email(email).await?.ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound(format!("User with email={}", email)))
        })?;

        self.tokens.issue(&Claims::access(&user), self.lifetimes.access)
    }

    /// Revoke a refresh token for the rest of its lifetime
    ///
    /// Idempotent; an already expired (but authentic) token is a no-op.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let claims = self.tokens.parse_ignoring_expiry(refresh_token)?;
        claims.expect_kind(TokenKind::Refresh)?;

        let jti = claims.token_id()?;
        let remaining = Duration::seconds(claims.expires_at()? - Utc::now().timestamp());
        if remaining <= Duration::zero() {
            tracing::info!(jti = %jti, "Refresh token already expired, skipping revoke");
            return Ok(());
        }

        if self.revoked.revoke(jti, remaining).await? {
            tracing::info!(jti = %jti, user_id = ?claims.id, "Refresh token revoked");
        }
        Ok(())
    }

    /// Issue a recovery token for `email`
    ///
    /// Returns `None` for unknown emails so callers can answer identically
    /// either way.
    pub async fn request_password_recovery(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let email = is_valid_email(email)?;
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password recovery requested for unknown email");
                return Ok(None);
            }
        };

        let token = self
            .tokens
            .issue(&Claims::recovery(&user), self.lifetimes.recovery)?;
        tracing::info!(user_id = user.id, "Recovery token issued");
        Ok(Some((user, token)))
    }

    /// Set a new password with a recovery token and log the user in with it
    ///
    /// The recovery token is spent before the password is written, so of
    /// several concurrent uses exactly one succeeds; every other use fails
    /// with `TokenRevoked`.
    pub async fn change_password(
        &self,
        recovery_token: &str,
        new_password: &str,
    ) -> Result<TokenPair, AppError> {
        let claims = self.tokens.parse(recovery_token)?;
        claims.expect_kind(TokenKind::Recovery)?;
        let user_id = claims.user_id()?;
        let jti = claims.token_id()?;
        let remaining = Duration::seconds(claims.expires_at()? - Utc::now().timestamp());

        is_valid_password(new_password)?;

        if !self.revoked.revoke(jti, remaining).await? {
            tracing::warn!(jti = %jti, user_id, "Replay of spent recovery token");
            return Err(AuthError::TokenRevoked.into());
        }

        let password_hash = self.passwords.hash(new_password)?;
        let user = self
            .users
            .update(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..UserChanges::default()
                },
            )
            .await?;
        tracing::info!(user_id = user.id, "Password changed");

        self.authenticate(&user.email, new_password).await
    }

    /// Resolve the user behind already validated access-token claims
    pub async fn current_user(&self, claims: &Claims) -> Result<User, AppError> {
        claims.expect_kind(TokenKind::Access)?;
        let email = claims.subject()?;
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::TokenInvalid.into())
    }
}

/// Fail with `Forbidden` unless `user` is an administrator
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}
