//! The identity attached to every request.

use crate::models::User;

/// Who is making the request.
///
/// Inserted into request extensions by the authentication middleware before
/// routing, so every handler and gate can rely on it being present.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Anonymous,
    User(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn is_activated(&self) -> bool {
        match self {
            Identity::Anonymous => false,
            Identity::User(user) => user.activated,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }
}
