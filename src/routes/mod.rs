mod ai;
mod auth;
mod health_check;
mod users;

pub use ai::summarize;
pub use auth::{
    change_password, login, logout, recover_password, refresh, register, test_token,
    StatusResponse, TokenResponse,
};
pub use health_check::health_check;
pub use users::{delete_user, get_current_user, list_users, update_current_user, UserResponse};
