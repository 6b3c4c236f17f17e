use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{require_admin, AuthService, Claims};
use crate::error::AppError;
use crate::users::{Role, User, UserChanges};
use crate::validators::{is_valid_name, is_valid_phone};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

/// Public view of a user; never carries the password hash
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone_number: user.phone_number,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub total: i64,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /v1/users/me
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = auth.current_user(&claims).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PATCH /v1/users/me
///
/// Omitted fields are left unchanged.
pub async fn update_current_user(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateProfileRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = auth.current_user(&claims).await?;

    let changes = UserChanges {
        phone_number: form.phone_number.as_deref().map(is_valid_phone).transpose()?,
        first_name: is_valid_name("first_name", form.first_name.as_deref())?,
        last_name: is_valid_name("last_name", form.last_name.as_deref())?,
        password_hash: None,
    };

    let updated = auth.users().update(user.id, changes).await?;
    tracing::info!(user_id = updated.id, "Profile updated");

    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// GET /v1/users?skip=&limit= (admin)
pub async fn list_users(
    claims: web::ReqData<Claims>,
    query: web::Query<Pagination>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.current_user(&claims).await?)?;

    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE);

    let users = auth.users().list(skip, limit).await?;
    let total = auth.users().count().await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
        total,
    }))
}

/// DELETE /v1/users/{id} (admin)
pub async fn delete_user(
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let admin = auth.current_user(&claims).await?;
    require_admin(&admin)?;

    let id = path.into_inner();
    auth.users().delete(id).await?;
    tracing::info!(user_id = id, admin_id = admin.id, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}
