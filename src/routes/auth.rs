/// Authentication Routes
///
/// Registration, login, token refresh, logout and password recovery.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims, Registration, TokenPair};
use crate::email_client::EmailClient;
use crate::error::AppError;
use crate::middleware::bearer_token;

const RECOVERY_ACKNOWLEDGEMENT: &str =
    "If the email is registered, a recovery link has been sent to it";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login form; `username` holds the email
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
}

impl TokenResponse {
    fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer",
        }
    }
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self::new(pair.access_token, Some(pair.refresh_token))
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: Some(message.into()),
        }
    }
}

/// POST /v1/auth/register
///
/// # Errors
/// - 400: Validation error or email/phone number already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();

    let pair = auth
        .register(Registration {
            email: form.email,
            phone_number: form.phone_number,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
        })
        .await?;

    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

/// POST /v1/auth/login
///
/// Unknown email and wrong password give the same 400 response.
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = auth.authenticate(&form.username, &form.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

/// POST /v1/auth/refresh
///
/// Takes the refresh token as bearer token and echoes it back next to the
/// new access token.
///
/// # Errors
/// - 401: No bearer token
/// - 403: Expired, invalid, revoked or non-refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = bearer_token(req.headers())?;
    let access_token = auth.refresh(refresh_token).await?;

    Ok(HttpResponse::Ok().json(TokenResponse::new(
        access_token,
        Some(refresh_token.to_string()),
    )))
}

/// POST /v1/auth/logout
///
/// Revokes the bearer refresh token. Repeating the call succeeds.
pub async fn logout(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = bearer_token(req.headers())?;
    auth.logout(refresh_token).await?;

    Ok(HttpResponse::Ok().json(StatusResponse::ok()))
}

/// POST /v1/auth/password/recover
///
/// Mails a recovery link when the email is registered. The response is the
/// same either way, including when the mail could not be sent.
pub async fn recover_password(
    form: web::Json<RecoverPasswordRequest>,
    auth: web::Data<AuthService>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    if let Some((user, token)) = auth.request_password_recovery(&form.email).await? {
        if let Err(e) = email_client.send_password_recovery(&user.email, &token).await {
            tracing::error!(user_id = user.id, error = %e, "Failed to send recovery email");
        }
    }

    Ok(HttpResponse::Ok().json(StatusResponse::with_message(RECOVERY_ACKNOWLEDGEMENT)))
}

/// POST /v1/auth/password/change
///
/// Spends a recovery token and logs the user in with the new password.
pub async fn change_password(
    form: web::Json<ChangePasswordRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = auth.change_password(&form.token, &form.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

/// POST /v1/auth/test
///
/// Succeeds for any valid access token.
pub async fn test_token(claims: web::ReqData<Claims>) -> HttpResponse {
    tracing::debug!(user_id = ?claims.id, "Access token test");
    HttpResponse::Ok().json(StatusResponse::ok())
}
