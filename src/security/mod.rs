//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (security headers on every response)
//!     → cors.rs (trusted origins, preflight)
//!     → rate_limit.rs (per-client token buckets)
//!     → Pass to authentication and routing
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before authentication so floods never reach the store
//! - Only explicitly trusted origins are echoed

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::{cors_middleware, CorsPolicy};
pub use headers::with_security_headers;
pub use rate_limit::{client_key, rate_limit_middleware, RateLimiter};
