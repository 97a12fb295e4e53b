//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → logging.rs (structured events, request ID in the span)
//!     → metrics.rs (counters, histograms, limiter gauge)
//!
//! Consumers:
//!     → stdout (pretty in development, JSON otherwise)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Tokens and passwords are never logged
//! - Metric updates are cheap enough to stay on the hot path

pub mod logging;
pub mod metrics;
