//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (pipeline layers, route table, gates)
//!     → middleware/ (authentication, panic containment)
//!     → request.rs (typed extraction: JSON bodies, path ids)
//!     → api handlers
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{JsonBody, ResourceId, MAX_BODY_BYTES};
pub use server::{build_router, AppState, HttpServer};
