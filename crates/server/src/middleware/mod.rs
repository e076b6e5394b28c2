//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on credential routes (binary only)
//! 5. `require_auth` on mutating routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{CurrentUser, bearer_token, require_auth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
