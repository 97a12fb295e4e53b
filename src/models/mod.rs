//! Domain records and their wire representations.
//!
//! Records (`User`, `Post`, ...) mirror table rows. `*View` types are what
//! handlers serialize; `New*` types are what handlers hand to the store.

pub mod comment;
pub mod filters;
pub mod post;
pub mod token;
pub mod user;

pub use comment::{validate_comment, Comment, CommentView, NewComment};
pub use filters::{Filters, Metadata, SortColumn, SortKey};
pub use post::{validate_post, NewPost, Post, PostView, ReadTime};
pub use token::{IssuedToken, TokenRecord, TokenScope};
pub use user::{validate_email, validate_name, validate_password_plaintext, NewUser, User};

/// Result of a conditional write.
///
/// `NotApplied` means the row exists but its version no longer matched, or
/// the row is gone. Callers treat it as an edit conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    NotApplied,
}

impl WriteOutcome {
    pub fn from_rows_affected(rows: usize) -> Self {
        if rows == 0 {
            WriteOutcome::NotApplied
        } else {
            WriteOutcome::Applied
        }
    }
}
