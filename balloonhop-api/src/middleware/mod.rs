pub mod auth;
pub mod rate_limit;

pub use auth::{require_admin, require_pilot, require_user, AuthUser};
pub use rate_limit::{auth_rate_limit, global_rate_limit};
