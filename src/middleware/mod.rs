/// Middleware module
///
/// Access-token guard for protected scopes.

mod jwt_middleware;

pub use jwt_middleware::{authorize, bearer_token, JwtMiddleware};
