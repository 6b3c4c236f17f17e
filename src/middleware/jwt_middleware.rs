/// JWT Authentication Middleware
///
/// Validates the access token from the Authorization header and injects its
/// claims into request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Claims, TokenCodec, TokenKind};
use crate::error::{AppError, AuthError};

/// Extract the token of an `Authorization: Bearer <token>` header
///
/// # Errors
/// `MissingToken` when the header is absent, not UTF-8, uses another scheme
/// or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::MissingToken.into())
}

/// Parse an access token and check it carries a subject
pub fn authorize(codec: &TokenCodec, token: &str) -> Result<Claims, AppError> {
    let claims = codec.parse(token)?;
    claims.expect_kind(TokenKind::Access)?;
    claims.subject()?;
    Ok(claims)
}

/// JWT middleware for protecting routes
///
/// Rejected requests get the same JSON error body as handler errors.
pub struct JwtMiddleware {
    codec: TokenCodec,
}

impl JwtMiddleware {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    codec: TokenCodec,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let result = bearer_token(req.headers()).and_then(|token| authorize(&self.codec, token));

        match result {
            Ok(claims) => {
                tracing::debug!(
                    user_id = ?claims.id,
                    path = %req.path(),
                    "Access token validated"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), error = %e, "Access token rejected");
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}
