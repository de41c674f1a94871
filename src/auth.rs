//! Authenticated principal and role identifiers.
//!
//! tsu-wrap does not authenticate anyone. Some upstream middleware (a JWT
//! check, a session lookup) attaches a [`Principal`] with
//! [`Request::set_principal`](crate::Request::set_principal); the guards in
//! [`guard`](crate::guard) only read it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role identifiers used for membership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Seller,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin    => "ADMIN",
            Self::Seller   => "SELLER",
            Self::Customer => "CUSTOMER",
        }
    }
}

/// Parses an uppercase role name (e.g. `"ADMIN"`).
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN"    => Ok(Self::Admin),
            "SELLER"   => Ok(Self::Seller),
            "CUSTOMER" => Ok(Self::Customer),
            other      => Err(UnknownRole(other.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

/// The authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}
