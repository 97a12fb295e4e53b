//! Bearer token records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Purpose of a token. A token of one scope never authorizes the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Activation,
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation" => Ok(TokenScope::Activation),
            "authentication" => Ok(TokenScope::Authentication),
            other => Err(format!("unknown token scope: {other}")),
        }
    }
}

/// What the store keeps. Never contains the plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

/// A freshly issued token, handed to the client exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: TokenScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_round_trip() {
        for scope in [TokenScope::Activation, TokenScope::Authentication] {
            assert_eq!(scope.as_str().parse::<TokenScope>().unwrap(), scope);
        }
        assert!("session".parse::<TokenScope>().is_err());
    }

    #[test]
    fn test_issued_token_wire_shape() {
        let token = IssuedToken {
            plaintext: "Y3QMGX3PJ3WLRL2YRTQGQ6KRHU".into(),
            user_id: 1,
            expiry: Utc::now(),
            scope: TokenScope::Authentication,
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "Y3QMGX3PJ3WLRL2YRTQGQ6KRHU");
        assert_eq!(json["userID"], 1);
        assert!(json.get("scope").is_none());
        assert!(json.get("expiry").is_some());
    }
}
