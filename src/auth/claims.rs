/// JWT Claims structure
///
/// Payload carried by every token the service issues. The `type` claim
/// decides which flow a token may drive: `access` tokens authorize API calls,
/// `refresh` tokens mint new access tokens, `recovery` tokens reset a password.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::users::{Role, User};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Recovery,
}

/// Claim set of an issued token
///
/// Everything except `sub` is optional on the wire so that a structurally
/// valid token missing a claim surfaces as `MissingClaim` instead of a
/// generic decode failure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Numeric user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Only present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued at (Unix timestamp), set by the codec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration time (Unix timestamp), set by the codec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    fn for_user(user: &User, kind: TokenKind) -> Self {
        Self {
            sub: Some(user.email.clone()),
            id: Some(user.id),
            role: None,
            kind: Some(kind),
            jti: Some(Uuid::new_v4().to_string()),
            iat: None,
            exp: None,
        }
    }

    pub fn access(user: &User) -> Self {
        Self {
            role: Some(user.role),
            ..Self::for_user(user, TokenKind::Access)
        }
    }

    pub fn refresh(user: &User) -> Self {
        Self::for_user(user, TokenKind::Refresh)
    }

    pub fn recovery(user: &User) -> Self {
        Self::for_user(user, TokenKind::Recovery)
    }

    /// Fail with `WrongTokenKind` unless the `type` claim is `expected`
    pub fn expect_kind(&self, expected: TokenKind) -> Result<(), AppError> {
        if self.kind == Some(expected) {
            Ok(())
        } else {
            Err(AuthError::WrongTokenKind.into())
        }
    }

    pub fn subject(&self) -> Result<&str, AppError> {
        self.sub
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MissingClaim("sub").into())
    }

    pub fn user_id(&self) -> Result<i64, AppError> {
        self.id.ok_or_else(|| AuthError::MissingClaim("id").into())
    }

    pub fn token_id(&self) -> Result<&str, AppError> {
        self.jti
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MissingClaim("jti").into())
    }

    pub fn expires_at(&self) -> Result<i64, AppError> {
        self.exp.ok_or_else(|| AuthError::MissingClaim("exp").into())
    }
}
