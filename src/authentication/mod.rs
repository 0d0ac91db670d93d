mod middleware;
mod password;

pub use middleware::{UserId, reject_anonymous_users, reject_non_admin_users};
pub use password::{
    AuthError, Credentials, change_password, compute_password_hash, validate_credentials,
};
