pub mod auth;
pub mod csrf;
pub mod rate_limit;
pub mod response;

pub use auth::bearer_auth_middleware;
pub use csrf::csrf_middleware;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response::{ApiResponse, ApiResult};
