//! Authentication and authorization.
//!
//! - `token`: plaintext generation and digests
//! - `authority`: issue / resolve / revoke on top of the store
//! - `identity`: the typed identity attached to each request
//! - `gate`: per-route access levels
//! - `password`: credential hashing

pub mod authority;
pub mod gate;
pub mod identity;
pub mod password;
pub mod token;

pub use authority::TokenAuthority;
pub use gate::{require_access, Access, CurrentUser};
pub use identity::Identity;
pub use password::{Argon2Hasher, CredentialHasher, HashError};
pub use token::{generate_token, hash_token, is_valid_token_format, TOKEN_PLAINTEXT_LEN};
