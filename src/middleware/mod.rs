// Middleware modules
pub mod jwt_auth;
pub mod logging;
pub mod rate_limit;

// Export JWT auth middleware components
pub use jwt_auth::{jwt_auth_middleware, AdminIdentity, UserIdentity};

// Export rate limit middleware components
pub use rate_limit::create_rate_limiter;

// Export logging middleware
pub use logging::logging_middleware;
