/// JWT Token Generation and Validation
///
/// Compact HMAC-signed tokens (`header.claims.signature`). The algorithm is
/// pinned at construction; tokens signed with anything else are rejected.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError, ConfigError};

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for a symmetric algorithm (HS256, HS384 or HS512)
    ///
    /// # Errors
    /// Returns a config error for an empty secret or a non-HMAC algorithm
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, AppError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::InvalidValue(format!(
                "jwt algorithm {:?} is not a symmetric signature",
                algorithm
            ))
            .into());
        }
        if secret.is_empty() {
            return Err(ConfigError::InvalidValue("jwt secret is empty".to_string()).into());
        }

        let mut validation = Validation::new(algorithm);
        // Expiry is checked in `parse` so that `exp == now` already counts as expired
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign `claims` with `iat = now` and `exp = now + ttl`
    ///
    /// # Errors
    /// Returns error if token generation fails
    pub fn issue(&self, claims: &Claims, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iat: Some(now),
            exp: Some(now + ttl.num_seconds()),
            ..claims.clone()
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify signature and expiry and return the claim set
    ///
    /// # Errors
    /// `TokenExpired` once `now >= exp`, `TokenInvalid` for anything else
    pub fn parse(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.parse_ignoring_expiry(token)?;

        if let Some(exp) = claims.exp {
            if Utc::now().timestamp() >= exp {
                tracing::warn!(jti = ?claims.jti, "Token expired");
                return Err(AuthError::TokenExpired.into());
            }
        }

        Ok(claims)
    }

    /// Verify the signature only. Logout uses this to treat an expired
    /// refresh token as a no-op instead of an error.
    pub(crate) fn parse_ignoring_expiry(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired.into(),
                    _ => AuthError::TokenInvalid.into(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;
    use crate::users::{test_user, Role};

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Algorithm::HS256).expect("Failed to build codec")
    }

    fn auth_error(result: Result<Claims, AppError>) -> AuthError {
        result.unwrap_err().as_auth().cloned().expect("Expected an auth error")
    }

    #[test]
    fn test_issue_and_parse_round_trip() {
        let codec = codec();
        let claims = Claims::access(&test_user(5, "test@example.com", Role::User));

        let token = codec.issue(&claims, Duration::minutes(10)).expect("Failed to issue token");
        let parsed = codec.parse(&token).expect("Failed to parse token");

        let iat = parsed.iat.expect("iat missing");
        assert_eq!(parsed.exp, Some(iat + 600));
        assert_eq!(Claims { iat: None, exp: None, ..parsed }, claims);
    }

    #[test]
    fn test_wire_format_is_three_segments() {
        let codec = codec();
        let claims = Claims::refresh(&test_user(1, "test@example.com", Role::User));
        let token = codec.issue(&claims, Duration::minutes(1)).unwrap();

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let codec = codec();
        let claims = Claims::access(&test_user(1, "test@example.com", Role::User));
        let token = codec.issue(&claims, Duration::zero()).unwrap();

        assert_eq!(auth_error(codec.parse(&token)), AuthError::TokenExpired);
    }

    #[test]
    fn test_expired_token_still_has_valid_signature() {
        let codec = codec();
        let claims = Claims::refresh(&test_user(1, "test@example.com", Role::User));
        let token = codec.issue(&claims, Duration::seconds(-30)).unwrap();

        let parsed = codec.parse_ignoring_expiry(&token).expect("Signature should verify");
        assert_eq!(parsed.kind, Some(TokenKind::Refresh));
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(auth_error(codec().parse("invalid.token.here")), AuthError::TokenInvalid);
        assert_eq!(auth_error(codec().parse("")), AuthError::TokenInvalid);
    }

    #[test]
    fn test_tampered_signature() {
        let codec = codec();
        let claims = Claims::access(&test_user(1, "test@example.com", Role::User));
        let token = codec.issue(&claims, Duration::minutes(10)).unwrap();

        let (signed, signature) = token.rsplit_once('.').unwrap();
        let first = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", signed, first, &signature[1..]);

        assert_eq!(auth_error(codec.parse(&tampered)), AuthError::TokenInvalid);
    }

    #[test]
    fn test_wrong_secret() {
        let claims = Claims::access(&test_user(1, "test@example.com", Role::User));
        let token = codec().issue(&claims, Duration::minutes(10)).unwrap();

        let other = TokenCodec::new(b"another-secret-key-of-sufficient-size", Algorithm::HS256).unwrap();
        assert_eq!(auth_error(other.parse(&token)), AuthError::TokenInvalid);
    }

    #[test]
    fn test_algorithm_is_pinned() {
        let claims = Claims::access(&test_user(1, "test@example.com", Role::User));
        let token = codec().issue(&claims, Duration::minutes(10)).unwrap();

        let hs512 = TokenCodec::new(SECRET, Algorithm::HS512).unwrap();
        assert_eq!(auth_error(hs512.parse(&token)), AuthError::TokenInvalid);
    }

    #[test]
    fn test_rejects_asymmetric_algorithm_and_empty_secret() {
        assert!(TokenCodec::new(SECRET, Algorithm::RS256).is_err());
        assert!(TokenCodec::new(b"", Algorithm::HS256).is_err());
    }
}
