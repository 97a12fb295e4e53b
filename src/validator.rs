//! Field-level input validation.
//!
//! Collects one message per field (first failure wins) so a client can fix
//! every problem in a single round trip.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ApiError;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Sanity check for email addresses.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is valid")
});

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error unless the field already has one.
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Convert into a 422 if anything failed.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

pub fn permitted(value: &str, list: &[&str]) -> bool {
    list.contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let mut v = Validator::new();
        v.check(false, "title", "must be provided");
        v.check(false, "title", "too long");
        assert_eq!(v.errors().get("title").unwrap(), "must be provided");
        assert!(!v.is_valid());
    }

    #[test]
    fn test_finish_ok_when_empty() {
        let mut v = Validator::new();
        v.check(true, "title", "must be provided");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_email_regex() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(!matches("alice", &EMAIL_RX));
        assert!(!matches("alice@", &EMAIL_RX));
    }

    #[test]
    fn test_permitted() {
        assert!(permitted("-id", &["id", "-id"]));
        assert!(!permitted("name", &["id", "-id"]));
    }
}
