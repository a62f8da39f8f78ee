pub mod auth;
pub mod logging;
pub mod rate_limit;
pub mod request_id;

pub use auth::*;
pub use logging::*;
pub use rate_limit::{create_login_rate_limiter, create_session_rate_limiter};
pub use request_id::*;
