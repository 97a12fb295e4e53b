//! Request pipeline middleware owned by the HTTP layer.

pub mod authenticate;
pub mod recover;

pub use authenticate::authenticate_middleware;
pub use recover::handle_panic;
