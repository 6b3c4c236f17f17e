/// Authentication module
///
/// Token issuing/parsing, password hashing, revocation tracking and the
/// service that ties them to the user directory.

mod claims;
mod jwt;
mod password;
mod pg_revocation;
mod revocation;
mod service;

pub use claims::{Claims, TokenKind};
pub use jwt::TokenCodec;
pub use password::PasswordHasher;
pub use pg_revocation::PgRevocationStore;
pub use revocation::{spawn_pruning, InMemoryRevocationStore, RevocationStore};
pub use service::{require_admin, AuthService, Registration, TokenLifetimes, TokenPair};
